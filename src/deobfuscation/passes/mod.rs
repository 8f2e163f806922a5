//! Concrete deobfuscation passes.
//!
//! Each pass implements [`BlockPass`](crate::deobfuscation::BlockPass) and is
//! safe to run over many methods in parallel; shared state is limited to
//! concurrent registries such as the discovered-helper set.

pub mod unflattening;

use dashmap::DashSet;
use rayon::prelude::*;

use crate::{
    deobfuscation::{events::EventLog, pass::BlockPass},
    disassembler::{MethodBody, MethodToken},
    emulation::NativeKeyHelpers,
    Result,
};
use unflattening::{SwitchData, SwitchUnflattener};

/// Control-flow unflattening as a batch-capable block pass.
///
/// Wraps [`SwitchUnflattener`] with the shared state a whole-assembly run
/// needs: the native-helper oracle used to replay embedded key routines, and
/// a concurrent registry of every helper method seen in a dispatcher. The
/// registry lets the owning pipeline strip the now-dead helpers once all
/// methods are rewritten.
pub struct UnflatteningPass<H> {
    helpers: H,
    discovered: DashSet<MethodToken>,
}

impl<H: NativeKeyHelpers> UnflatteningPass<H> {
    /// Creates the pass around a native-helper oracle.
    #[must_use]
    pub fn new(helpers: H) -> Self {
        UnflatteningPass {
            helpers,
            discovered: DashSet::new(),
        }
    }

    /// Native helper methods referenced by at least one dispatcher so far.
    ///
    /// Deduplicated; order is unspecified.
    #[must_use]
    pub fn discovered_helpers(&self) -> Vec<MethodToken> {
        self.discovered.iter().map(|token| *token).collect()
    }

    /// Runs the pass over a batch of methods in parallel.
    ///
    /// Returns the number of modified methods and the merged event log. The
    /// merged log groups each method's events together, but the order of
    /// methods follows the input slice, not completion order.
    ///
    /// # Errors
    ///
    /// Fails if any single method fails; methods processed before the
    /// failure keep their rewrites.
    pub fn run_batch(&self, bodies: &mut [MethodBody]) -> Result<(usize, EventLog)> {
        let results: Vec<(bool, EventLog)> = bodies
            .par_iter_mut()
            .map(|body| {
                let mut log = EventLog::new();
                let modified = self.run_on_method(body, &mut log)?;
                Ok((modified, log))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut merged = EventLog::new();
        let mut modified = 0;
        for (method_modified, log) in results {
            if method_modified {
                modified += 1;
            }
            merged.merge(log);
        }
        Ok((modified, merged))
    }
}

impl<H: NativeKeyHelpers> BlockPass for UnflatteningPass<H> {
    fn name(&self) -> &'static str {
        "unflattening"
    }

    fn description(&self) -> &'static str {
        "Rewrites switch-dispatch flattened control flow into direct branches"
    }

    fn run_on_method(&self, body: &mut MethodBody, log: &mut EventLog) -> Result<bool> {
        let modified = SwitchUnflattener::new(&self.helpers).run(body, log)?;

        // harvest helper references so the pipeline can strip them later
        for block in body.blocks() {
            if let Some(SwitchData::Native { helper, .. }) = block.switch_data {
                self.discovered.insert(helper);
            }
        }

        Ok(modified)
    }
}
