use std::collections::HashSet;

use crate::{
    deobfuscation::{
        events::{EventKind, EventLog},
        passes::unflattening::{
            detector,
            propagate::propagate_key,
            resolver::KeyResolver,
            rewrite::{checked_target, rewrite_case},
            SwitchData,
        },
    },
    disassembler::{BlockId, Instruction, MethodBody, OpCode},
    emulation::{InstructionEmulator, NativeKeyHelpers, StackValue},
    Error, Result,
};

/// Fixpoint solver for one dispatcher's predecessor set.
///
/// Predecessors are visited round-robin. A predecessor that reads the
/// dispatcher's key local is deferred until a sibling's resolution has
/// propagated a key into it; everything else is emulated, resolved and
/// rewritten on first visit. The loop terminates when every predecessor is
/// processed or failed, or when a full pass changes no predecessor state,
/// which is reported as [`Error::StalledProgress`] with all rewrites made so
/// far kept in place.
pub(crate) struct DispatchSolver<'a> {
    emulator: &'a mut InstructionEmulator,
    resolver: KeyResolver<'a>,
    dispatcher: BlockId,
    /// Local variable holding the switch key at the dispatch point
    key_local: u16,
    data: SwitchData,
    /// Snapshot of the dispatcher's body, for native index re-emulation
    dispatcher_instrs: Vec<Instruction>,
    /// Snapshot of the dispatcher's case targets
    targets: Vec<BlockId>,
}

impl<'a> DispatchSolver<'a> {
    /// Creates a solver for a detected dispatcher.
    ///
    /// Returns `None` when the block carries no switch data; callers only
    /// construct solvers for blocks that passed detection.
    pub(crate) fn new(
        emulator: &'a mut InstructionEmulator,
        helpers: &'a dyn NativeKeyHelpers,
        body: &MethodBody,
        dispatcher: BlockId,
    ) -> Option<Self> {
        let block = body.block(dispatcher);
        let data = block.switch_data?;
        let key_local = detector::switch_key_local(block)?;
        Some(DispatchSolver {
            emulator,
            resolver: KeyResolver::new(helpers),
            dispatcher,
            key_local,
            data,
            dispatcher_instrs: block.instructions.clone(),
            targets: block.targets.clone(),
        })
    }

    /// Solves the dispatcher, returning how many predecessors were rewritten.
    pub(crate) fn solve(&mut self, body: &mut MethodBody, log: &mut EventLog) -> usize {
        let predecessors = body.fall_through_predecessors(self.dispatcher);
        self.emulator.initialize(body.local_count, true);

        let mut failed: HashSet<BlockId> = HashSet::new();
        let mut remaining = predecessors.len();
        let mut rewritten = 0;

        while remaining > 0 {
            let mut changed = false;

            for &predecessor in &predecessors {
                if body.block(predecessor).processed || failed.contains(&predecessor) {
                    continue;
                }

                if self.needs_switch_key(body, predecessor) {
                    match body.block(predecessor).switch_key {
                        // deferred until a sibling propagates a key
                        None => continue,
                        Some(key) => {
                            self.emulator
                                .set_local(self.key_local, StackValue::Int32(key));
                        }
                    }
                }

                let result = if self.is_ternary(body, predecessor) {
                    self.process_ternary(body, &predecessors, predecessor)
                } else {
                    self.process_block(body, &predecessors, predecessor)
                };

                match result {
                    Ok(()) => rewritten += 1,
                    Err(error) => {
                        log.record(EventKind::PredecessorFailed {
                            dispatcher: self.dispatcher,
                            predecessor,
                            error,
                        });
                        failed.insert(predecessor);
                    }
                }
                remaining -= 1;
                changed = true;
            }

            if remaining > 0 && !changed {
                log.record(EventKind::DispatcherStalled {
                    dispatcher: self.dispatcher,
                    error: Error::StalledProgress {
                        dispatcher: self.dispatcher,
                        remaining,
                    },
                });
                break;
            }
        }

        rewritten
    }

    /// Emulates one predecessor, resolves its key and rewrites it.
    fn process_block(
        &mut self,
        body: &mut MethodBody,
        predecessors: &[BlockId],
        predecessor: BlockId,
    ) -> Result<()> {
        let len = body.block(predecessor).instructions.len();
        self.emulator
            .emulate(&body.block(predecessor).instructions, 0, len);
        if self.emulator.peek().is_unknown() {
            return Err(Error::UnresolvedValue);
        }

        let key = self.resolver.compute_key(self.emulator, &self.data)?;
        let index = self.resolver.compute_case_index(
            self.emulator,
            &self.dispatcher_instrs,
            &self.data,
            key,
        )?;
        let target = checked_target(&self.targets, index)?;

        body.block_mut(target).switch_key = Some(key);
        rewrite_case(body, predecessor, target);
        propagate_key(body, predecessors, self.dispatcher, target, key);
        body.block_mut(predecessor).processed = true;
        Ok(())
    }

    /// Resolves a bifurcated predecessor: two source paths share one key
    /// assignment through a merge block.
    ///
    /// Both source paths are emulated and resolved in turn; each source's
    /// terminator is rewritten to its own target. Rewriting the first source
    /// unlinks it, so the second source becomes `sources[0]` on the next
    /// iteration. The shared merge block is patched with exactly one
    /// neutralizing `pop`, after both iterations.
    fn process_ternary(
        &mut self,
        body: &mut MethodBody,
        predecessors: &[BlockId],
        merge: BlockId,
    ) -> Result<()> {
        for _ in 0..2 {
            let source = *body
                .block(merge)
                .sources
                .first()
                .ok_or(Error::UnresolvedValue)?;

            // seed the same pre-resolved key for both iterations
            if let Some(key) = body.block(merge).switch_key {
                self.emulator
                    .set_local(self.key_local, StackValue::Int32(key));
            }

            let source_len = body.block(source).instructions.len();
            self.emulator
                .emulate(&body.block(source).instructions, 0, source_len);
            let merge_len = body.block(merge).instructions.len();
            self.emulator
                .emulate(&body.block(merge).instructions, 0, merge_len);
            if self.emulator.peek().is_unknown() {
                return Err(Error::UnresolvedValue);
            }

            let key = self.resolver.compute_key(self.emulator, &self.data)?;
            let index = self.resolver.compute_case_index(
                self.emulator,
                &self.dispatcher_instrs,
                &self.data,
                key,
            )?;
            let target = checked_target(&self.targets, index)?;

            body.block_mut(target).switch_key = Some(key);
            body.replace_last_instr(source, Instruction::new(OpCode::Pop));
            body.redirect_terminator(source, target);
            propagate_key(body, predecessors, self.dispatcher, target, key);
        }

        // one neutralizing pop for both paths, only after both resolved
        body.block_mut(merge)
            .instructions
            .push(Instruction::new(OpCode::Pop));
        body.block_mut(merge).processed = true;
        Ok(())
    }

    /// True if the block reads the dispatcher's key local.
    fn needs_switch_key(&self, body: &MethodBody, block: BlockId) -> bool {
        body.block(block).instructions.iter().any(|i| {
            i.opcode == OpCode::Ldloc && i.local_index() == Some(self.key_local)
        })
    }

    /// True for a predecessor fed by two merging source paths.
    ///
    /// The dispatcher itself reaching the block through a switch case does
    /// not make it ternary.
    fn is_ternary(&self, body: &MethodBody, block: BlockId) -> bool {
        let sources = &body.block(block).sources;
        sources.len() == 2 && !sources.contains(&self.dispatcher)
    }
}
