use crate::disassembler::{Block, BlockId, Instruction, MethodBody};

/// Fluent construction of method-body block graphs.
///
/// Blocks are declared first, then linked; [`MethodBuilder::finish`] computes
/// the source lists. Intended for tests, benchmarks and synthetic fixtures:
///
/// ```rust
/// use unswitch::disassembler::{Instruction, MethodBuilder, OpCode};
///
/// let mut b = MethodBuilder::new(1);
/// let entry = b.block(vec![Instruction::ldc_i4(7)]);
/// let exit = b.block(vec![Instruction::new(OpCode::Ret)]);
/// b.fall_through(entry, exit);
/// let body = b.finish();
/// assert_eq!(body.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MethodBuilder {
    blocks: Vec<Block>,
    local_count: usize,
}

impl MethodBuilder {
    /// Creates a builder for a method with `local_count` local slots.
    #[must_use]
    pub fn new(local_count: usize) -> Self {
        MethodBuilder {
            blocks: Vec::new(),
            local_count,
        }
    }

    /// Adds a block with the given instructions, returning its id.
    pub fn block(&mut self, instructions: Vec<Instruction>) -> BlockId {
        self.blocks.push(Block::new(instructions));
        BlockId(self.blocks.len() - 1)
    }

    /// Sets a block's fallthrough successor.
    pub fn fall_through(&mut self, from: BlockId, to: BlockId) -> &mut Self {
        self.blocks[from.0].fall_through = Some(to);
        self
    }

    /// Sets a block's explicit branch targets.
    ///
    /// One entry for a conditional branch, one per case for a switch.
    pub fn targets(&mut self, from: BlockId, targets: &[BlockId]) -> &mut Self {
        self.blocks[from.0].targets = targets.to_vec();
        self
    }

    /// Finalizes the graph, computing source lists.
    #[must_use]
    pub fn finish(self) -> MethodBody {
        MethodBody::new(self.blocks, self.local_count)
    }
}
