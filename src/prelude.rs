//! Convenient re-exports of the most commonly used types and traits.
//!
//! # Example
//!
//! ```rust
//! use unswitch::prelude::*;
//!
//! let pass = UnflatteningPass::new(NoNativeHelpers);
//! assert_eq!(pass.name(), "unflattening");
//! ```

pub use crate::{
    deobfuscation::{
        passes::{unflattening::SwitchUnflattener, UnflatteningPass},
        BlockPass, EventKind, EventLog, SwitchData,
    },
    disassembler::{
        Block, BlockId, FlowType, Instruction, MethodBody, MethodBuilder, MethodToken, OpCode,
        Operand,
    },
    emulation::{InstructionEmulator, NativeKeyHelpers, NoNativeHelpers, StackValue},
    Error, Result,
};
