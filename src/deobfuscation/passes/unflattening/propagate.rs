use std::collections::HashSet;

use crate::disassembler::{BlockId, MethodBody};

/// Pushes a freshly resolved key into sibling predecessors that cannot
/// compute it themselves.
///
/// A predecessor that reads the dispatcher's key local is only solvable once
/// some other path has determined what that local holds. After a target
/// resolves, this walks forward from it: every block on a fallthrough chain
/// toward the dispatcher that is itself a predecessor and has no key yet
/// receives the propagated key. Conditional branches that do not pass
/// through the dispatcher are followed too.
///
/// The visited set is scoped to this call; cyclic fallthrough or branch
/// graphs terminate because no block is entered twice.
pub(crate) fn propagate_key(
    body: &mut MethodBody,
    predecessors: &[BlockId],
    dispatcher: BlockId,
    target: BlockId,
    key: i32,
) {
    let mut visited = HashSet::new();
    propagate_into(body, predecessors, dispatcher, target, key, &mut visited);
}

fn propagate_into(
    body: &mut MethodBody,
    predecessors: &[BlockId],
    dispatcher: BlockId,
    current: BlockId,
    key: i32,
    visited: &mut HashSet<BlockId>,
) {
    if !visited.insert(current) {
        return;
    }

    if body.block(current).fall_through == Some(dispatcher)
        && predecessors.contains(&current)
        && body.block(current).switch_key.is_none()
    {
        body.block_mut(current).switch_key = Some(key);
    }

    let Some(fall_through) = body.block(current).fall_through else {
        return;
    };

    if !body.block(fall_through).ends_with_ret() && fall_through != dispatcher {
        propagate_into(body, predecessors, dispatcher, fall_through, key, visited);
    }

    if body.block(current).count_targets() > 1 {
        for target in body.block(current).targets.clone() {
            if target == dispatcher {
                return;
            }
            propagate_into(body, predecessors, dispatcher, target, key, visited);
        }
    }
}
