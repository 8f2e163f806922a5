//! CIL instruction and basic-block model for flattened method bodies.
//!
//! This module provides the structural side of the engine: a compact CIL
//! instruction set, basic blocks with explicit control-flow linkage, and a
//! fluent builder for assembling method bodies in tests and benchmarks.
//!
//! Branch structure follows the block graph rather than the instruction
//! stream: a block's implicit successor is its `fall_through` pointer, and
//! explicit branch destinations live in its `targets` list. Unconditional
//! branches therefore have no instruction representation at all; replacing a
//! terminator means dropping the trailing conditional branch or switch and
//! repointing `fall_through`.
//!
//! # Key Types
//! - [`Instruction`] - A decoded CIL instruction (opcode + operand)
//! - [`OpCode`] / [`FlowType`] - Opcode identity and control-flow effect
//! - [`Block`] - A basic block with sources, fallthrough and branch targets
//! - [`MethodBody`] - The block graph of one method, mutated in place
//! - [`MethodBuilder`] - Fluent construction of block graphs

mod block;
mod builder;
mod instruction;
mod method;

pub use block::{Block, BlockId};
pub use builder::MethodBuilder;
pub use instruction::{FlowType, Instruction, MethodToken, OpCode, Operand};
pub use method::MethodBody;
