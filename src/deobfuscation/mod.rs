//! Deobfuscation passes over method block graphs.
//!
//! A pass takes a mutable [`MethodBody`](crate::disassembler::MethodBody)
//! and rewrites it toward the pre-obfuscation control flow. Passes report
//! whether they changed anything and record diagnostics in an [`EventLog`];
//! a method that only partially resolves is still a success, with the
//! unresolved pieces visible in the log.
//!
//! # Key Types
//!
//! - [`BlockPass`] - the pass contract
//! - [`UnflatteningPass`](passes::UnflatteningPass) - switch-dispatch
//!   reconstruction, the pass this crate exists for
//! - [`EventLog`] / [`EventKind`] - structured per-method diagnostics

mod events;
mod pass;
pub mod passes;

pub use events::{EventKind, EventLog};
pub use pass::BlockPass;
pub use passes::unflattening::SwitchData;
