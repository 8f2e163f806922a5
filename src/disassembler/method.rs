use std::collections::HashSet;

use crate::disassembler::{Block, BlockId, Instruction, OpCode};

/// The block graph of one method body.
///
/// Owns all blocks of a method; the unflattening engine mutates blocks in
/// place (instructions, linkage, flags) but never adds or removes blocks.
/// `sources` lists are derived data and are rebuilt after every terminator
/// rewrite so predecessor queries stay accurate mid-solve.
#[derive(Debug, Clone)]
pub struct MethodBody {
    blocks: Vec<Block>,
    /// Number of local variable slots the method declares
    pub local_count: usize,
}

impl MethodBody {
    /// Creates a method body from pre-linked blocks.
    ///
    /// Source lists are recomputed from the fallthrough and target edges, so
    /// callers only need to fill in forward linkage.
    #[must_use]
    pub fn new(blocks: Vec<Block>, local_count: usize) -> Self {
        let mut body = MethodBody {
            blocks,
            local_count,
        };
        body.rebuild_sources();
        body
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the method has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Borrows a block.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a block of this method.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Mutably borrows a block.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a block of this method.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    /// Iterates over all block ids in layout order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Iterates over all blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Collects the blocks whose fallthrough is `dispatcher`.
    ///
    /// These are the dispatcher's switch-case predecessors, in layout order.
    #[must_use]
    pub fn fall_through_predecessors(&self, dispatcher: BlockId) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&id| self.blocks[id.0].fall_through == Some(dispatcher))
            .collect()
    }

    /// Replaces a block's terminator with an unconditional branch to `target`.
    ///
    /// Drops a trailing conditional branch, switch or return if present,
    /// clears the explicit target list and repoints the fallthrough edge.
    /// Source lists of every affected successor are rebuilt.
    pub fn redirect_terminator(&mut self, id: BlockId, target: BlockId) {
        let block = &mut self.blocks[id.0];
        if block
            .last_instr()
            .is_some_and(|i| i.opcode.is_terminator())
        {
            block.instructions.pop();
        }
        block.targets.clear();
        block.fall_through = Some(target);
        self.rebuild_sources();
    }

    /// Rewrites a block into a bare unconditional branch to `target`.
    ///
    /// Used for single-case dispatchers: the whole body is dispatch machinery
    /// and is dropped along with the switch.
    pub fn clear_and_branch(&mut self, id: BlockId, target: BlockId) {
        self.blocks[id.0].instructions.clear();
        self.redirect_terminator(id, target);
    }

    /// Replaces a block's trailing instruction with `instruction`.
    ///
    /// Appends instead when the block is empty.
    pub fn replace_last_instr(&mut self, id: BlockId, instruction: Instruction) {
        let block = &mut self.blocks[id.0];
        match block.instructions.last_mut() {
            Some(last) => *last = instruction,
            None => block.instructions.push(instruction),
        }
    }

    /// True if a block's terminator is a multi-way switch.
    #[must_use]
    pub fn ends_with_switch(&self, id: BlockId) -> bool {
        self.blocks[id.0]
            .last_instr()
            .is_some_and(|i| i.opcode == OpCode::Switch)
    }

    /// Recomputes every block's source list from forward edges.
    ///
    /// Each predecessor appears once even when it reaches the block through
    /// several switch cases.
    pub fn rebuild_sources(&mut self) {
        for block in &mut self.blocks {
            block.sources.clear();
        }

        for id in 0..self.blocks.len() {
            let mut successors: Vec<BlockId> = Vec::new();
            let mut seen = HashSet::new();
            if let Some(ft) = self.blocks[id].fall_through {
                if seen.insert(ft) {
                    successors.push(ft);
                }
            }
            for &t in &self.blocks[id].targets {
                if seen.insert(t) {
                    successors.push(t);
                }
            }
            for succ in successors {
                self.blocks[succ.0].sources.push(BlockId(id));
            }
        }
    }
}
