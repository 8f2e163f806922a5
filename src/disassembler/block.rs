use std::fmt;

use crate::{
    deobfuscation::SwitchData,
    disassembler::{Instruction, OpCode},
};

/// Index of a block inside its owning [`crate::disassembler::MethodBody`].
///
/// Blocks are identified by position; the engine never creates or destroys
/// blocks, so ids stay stable for the lifetime of a method solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}", self.0)
    }
}

/// A basic block of a method body.
///
/// Control flow lives in the linkage fields, not the instruction stream:
/// `fall_through` is where execution continues when no branch is taken (for a
/// block that ends in an unconditional branch, this is the branch target),
/// and `targets` holds the explicit destinations of a trailing conditional
/// branch (one entry) or switch (one entry per case).
#[derive(Debug, Clone)]
pub struct Block {
    /// Ordered instruction sequence
    pub instructions: Vec<Instruction>,
    /// Blocks that transfer control here, deduplicated
    pub sources: Vec<BlockId>,
    /// Implicit successor, `None` for return blocks
    pub fall_through: Option<BlockId>,
    /// Explicit branch destinations of the terminator
    pub targets: Vec<BlockId>,
    /// Set once the unflattener has rewritten this block
    pub processed: bool,
    /// Dispatcher annotation, attached by detection
    pub switch_data: Option<SwitchData>,
    /// Switch key propagated into this block, pending consumption
    pub switch_key: Option<i32>,
}

impl Block {
    /// Creates an empty, unlinked block.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Block {
            instructions,
            sources: Vec::new(),
            fall_through: None,
            targets: Vec::new(),
            processed: false,
            switch_data: None,
            switch_key: None,
        }
    }

    /// The last instruction, if any.
    #[must_use]
    pub fn last_instr(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// True if this block leaves the method.
    #[must_use]
    pub fn ends_with_ret(&self) -> bool {
        self.last_instr()
            .is_some_and(|i| i.opcode == OpCode::Ret)
    }

    /// Number of places control can transfer to from this block.
    ///
    /// Counts explicit targets plus the fallthrough edge.
    #[must_use]
    pub fn count_targets(&self) -> usize {
        self.targets.len() + usize::from(self.fall_through.is_some())
    }
}
