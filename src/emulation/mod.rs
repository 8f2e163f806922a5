//! Abstract stack-machine emulation for key recovery.
//!
//! The unflattener does not execute methods; it runs an abstract interpreter
//! over short instruction ranges to learn which 32-bit value a predecessor
//! block leaves on the evaluation stack. Values are either fully known
//! ([`StackValue::Int32`]) or [`StackValue::Unknown`]; there is no partial
//! bit tracking, because only a value with all 32 bits determined may be
//! trusted as a switch key.
//!
//! Native key helpers (embedded x86 routines that transform the key) are not
//! interpreted here. They stay behind the [`NativeKeyHelpers`] contract and
//! are replayed by whatever execution engine the embedding tool provides.

mod emulator;
mod native;
mod value;

pub use emulator::InstructionEmulator;
pub use native::{NativeKeyHelpers, NoNativeHelpers};
pub use value::StackValue;
