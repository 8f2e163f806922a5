//! Switch-dispatch reconstruction for flattened method bodies.
//!
//! Control-flow flattening rewrites a method so every original transition is
//! routed through a central dispatcher: a block ending in a multi-way `switch`
//! whose case index is computed at runtime from a key. Each predecessor pushes
//! an obfuscated value, falls through into the dispatcher, and the dispatcher
//! reduces it to a case index. This module reverses that transform by
//! resolving each predecessor's key symbolically and rewriting the
//! predecessor to branch directly to the case target it would have selected.
//!
//! Two key schemes are recognized. The arithmetic scheme xors the pushed
//! value with an in-block constant and reduces it with `rem.un`. The native
//! scheme routes the pushed value through a call into an embedded machine
//! code helper first; helpers are replayed through the [`NativeKeyHelpers`]
//! contract rather than interpreted here.
//!
//! # Key Types
//!
//! - [`SwitchUnflattener`] - per-method driver: detects dispatchers and
//!   solves each one
//! - [`SwitchData`] - detected scheme parameters attached to a dispatcher
//!
//! Resolution is best-effort per predecessor: a predecessor that cannot be
//! resolved is recorded in the [`EventLog`] and skipped, and the rest of the
//! dispatcher still resolves.

pub(crate) mod detector;
mod propagate;
mod resolver;
mod rewrite;
mod solver;
mod switch_data;

pub use switch_data::SwitchData;

use crate::{
    deobfuscation::events::{EventKind, EventLog},
    disassembler::{BlockId, MethodBody},
    emulation::{InstructionEmulator, NativeKeyHelpers, StackValue},
    Error, Result,
};
use resolver::KeyResolver;
use rewrite::{checked_target, rewrite_hardcoded};
use solver::DispatchSolver;

/// Per-method switch-dispatch reconstruction driver.
///
/// Scans the block graph for dispatcher fingerprints, attaches the detected
/// [`SwitchData`] and solves each dispatcher in layout order. The emulator is
/// reinitialized before every dispatcher so stale locals from one solve never
/// leak into the next.
pub struct SwitchUnflattener<'a> {
    helpers: &'a dyn NativeKeyHelpers,
}

impl<'a> SwitchUnflattener<'a> {
    /// Creates a driver that resolves native helper calls through `helpers`.
    #[must_use]
    pub fn new(helpers: &'a dyn NativeKeyHelpers) -> Self {
        SwitchUnflattener { helpers }
    }

    /// Reconstructs every dispatcher in `body`.
    ///
    /// Returns `true` if at least one predecessor or dispatcher was
    /// rewritten. Per-dispatcher failures are recorded to `log` and do not
    /// fail the method.
    ///
    /// # Errors
    ///
    /// Currently infallible at the method level; the `Result` is part of the
    /// pass contract.
    pub fn run(&self, body: &mut MethodBody, log: &mut EventLog) -> Result<bool> {
        let dispatchers = self.find_dispatchers(body);
        let mut emulator = InstructionEmulator::new();
        let mut modifications = 0;

        for dispatcher in dispatchers {
            let Some(data) = body.block(dispatcher).switch_data else {
                continue;
            };

            if data.is_key_hardcoded() {
                match self.process_hardcoded(&mut emulator, body, dispatcher, &data) {
                    Ok(()) => {
                        log.record(EventKind::DispatcherRewritten {
                            dispatcher,
                            predecessors: 0,
                        });
                        modifications += 1;
                    }
                    Err(error) => {
                        log.record(EventKind::DispatcherStalled { dispatcher, error });
                    }
                }
                continue;
            }

            let Some(mut solver) =
                DispatchSolver::new(&mut emulator, self.helpers, body, dispatcher)
            else {
                continue;
            };
            let rewritten = solver.solve(body, log);
            if rewritten > 0 {
                log.record(EventKind::DispatcherRewritten {
                    dispatcher,
                    predecessors: rewritten,
                });
                modifications += 1;
            }
        }

        Ok(modifications > 0)
    }

    /// Detects all dispatchers and attaches their switch data.
    fn find_dispatchers(&self, body: &mut MethodBody) -> Vec<BlockId> {
        let ids: Vec<BlockId> = body.block_ids().collect();
        let mut dispatchers = Vec::new();
        for id in ids {
            if let Some(data) = detector::detect(body.block(id), self.helpers) {
                body.block_mut(id).switch_data = Some(data);
                dispatchers.push(id);
            }
        }
        dispatchers
    }

    /// Rewrites a single-case dispatcher whose input is an in-block constant.
    ///
    /// No predecessor is involved: the hardcoded input is pushed as the
    /// dispatch value, the key and case index resolve from it alone, and the
    /// dispatcher itself collapses into a direct branch.
    fn process_hardcoded(
        &self,
        emulator: &mut InstructionEmulator,
        body: &mut MethodBody,
        dispatcher: BlockId,
        data: &SwitchData,
    ) -> Result<()> {
        emulator.initialize(body.local_count, true);
        let input = data.key().ok_or(Error::UnresolvedValue)?;
        emulator.push(StackValue::Int32(input));

        let resolver = KeyResolver::new(self.helpers);
        let key = resolver.compute_key(emulator, data)?;
        let instructions = body.block(dispatcher).instructions.clone();
        let index = resolver.compute_case_index(emulator, &instructions, data, key)?;
        let target = checked_target(&body.block(dispatcher).targets, index)?;

        body.block_mut(target).switch_key = Some(key);
        rewrite_hardcoded(body, dispatcher, target);
        Ok(())
    }
}
