use crate::{
    disassembler::{BlockId, Instruction, MethodBody, OpCode},
    Error, Result,
};

/// Picks the target selected by a case index, bounds-checked.
///
/// The index must satisfy `0 <= index < targets.len()`; anything else is
/// [`Error::IndexOutOfRange`] and unrecoverable for the dispatcher.
pub(crate) fn checked_target(targets: &[BlockId], index: i32) -> Result<BlockId> {
    let in_range = usize::try_from(index)
        .ok()
        .filter(|&i| i < targets.len());
    match in_range {
        Some(i) => Ok(targets[i]),
        None => Err(Error::IndexOutOfRange {
            index,
            targets: targets.len(),
        }),
    }
}

/// Rewrites a resolved predecessor to branch directly to its target.
///
/// The key computation is neutralized with a single appended `pop` that
/// truncates its stack effect; the now-dead producers are left for a later
/// dead-code pass. The terminator is then replaced with an unconditional
/// branch to the target.
pub(crate) fn rewrite_case(body: &mut MethodBody, predecessor: BlockId, target: BlockId) {
    body.block_mut(predecessor)
        .instructions
        .push(Instruction::new(OpCode::Pop));
    body.redirect_terminator(predecessor, target);
}

/// Rewrites a single-case dispatcher into a direct branch.
///
/// The whole body is dispatch machinery, so the instructions are cleared and
/// the block becomes an unconditional branch to the sole computed target.
pub(crate) fn rewrite_hardcoded(body: &mut MethodBody, dispatcher: BlockId, target: BlockId) {
    body.clear_and_branch(dispatcher, target);
}
