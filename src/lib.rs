// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # unswitch
//!
//! A reconstruction engine for control-flow-flattened .NET methods.
//!
//! Protectors in the ConfuserEx family flatten a method by routing every
//! original transition through a central dispatcher: a block ending in a
//! multi-way `switch` whose case index is computed at runtime from an
//! obfuscated key. `unswitch` detects these dispatchers, recovers each
//! predecessor's key by abstract interpretation, and rewrites the
//! predecessors into the direct branches the method had before flattening.
//!
//! ## Features
//!
//! - **Dispatcher detection** - Instruction-level fingerprinting of the
//!   dispatch machinery, with zero false positives on ordinary `switch`es
//! - **Two key schemes** - Closed-form xor/remainder arithmetic and embedded
//!   native key helpers replayed through a pluggable contract
//! - **Dependency-ordered solving** - Predecessors whose key depends on
//!   another path are deferred and retried as keys propagate
//! - **Partial success** - Unresolvable predecessors are reported as
//!   structured events, never at the cost of the rest of the method
//! - **Parallel batches** - Whole-assembly runs process methods on all cores
//!
//! ## Quick Start
//!
//! ```rust
//! use unswitch::prelude::*;
//!
//! // pred pushes 10, falls into the dispatcher: key = 10 ^ 0x5A, index = key % 4
//! let mut b = MethodBuilder::new(1);
//! let pred = b.block(vec![Instruction::ldc_i4(10)]);
//! let dispatcher = b.block(vec![
//!     Instruction::ldc_i4(0x5A),
//!     Instruction::new(OpCode::Xor),
//!     Instruction::new(OpCode::Dup),
//!     Instruction::stloc(0),
//!     Instruction::ldc_i4(4),
//!     Instruction::new(OpCode::RemUn),
//!     Instruction::new(OpCode::Switch),
//! ]);
//! let targets: Vec<_> = (0..4)
//!     .map(|_| b.block(vec![Instruction::new(OpCode::Ret)]))
//!     .collect();
//! b.fall_through(pred, dispatcher);
//! b.targets(dispatcher, &targets);
//! let mut body = b.finish();
//!
//! let pass = UnflatteningPass::new(NoNativeHelpers);
//! let mut log = EventLog::new();
//! let modified = pass.run_on_method(&mut body, &mut log)?;
//!
//! assert!(modified);
//! // 10 ^ 0x5A = 80, 80 % 4 = 0: the predecessor now branches directly
//! assert_eq!(body.block(pred).fall_through, Some(targets[0]));
//! # Ok::<(), unswitch::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`disassembler`] - CIL instruction subset, basic blocks and the method
//!   block graph the engine rewrites in place
//! - [`emulation`] - Abstract stack-machine interpreter for key recovery and
//!   the [`emulation::NativeKeyHelpers`] contract for embedded routines
//! - [`deobfuscation`] - The pass contract, the unflattening pass and the
//!   structured event log
//! - [`Error`] and [`Result`] - Error handling scoped so one failing
//!   predecessor never aborts a method, and one failing method never aborts
//!   a batch

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use unswitch::prelude::*;
///
/// let pass = UnflatteningPass::new(NoNativeHelpers);
/// assert_eq!(pass.name(), "unflattening");
/// ```
pub mod prelude;

/// CIL instruction and basic-block model.
///
/// # Key Types
///
/// - [`disassembler::Instruction`] - A decoded CIL instruction
/// - [`disassembler::Block`] - A basic block with explicit linkage
/// - [`disassembler::MethodBody`] - The block graph of one method
/// - [`disassembler::MethodBuilder`] - Fluent graph construction
pub mod disassembler;

/// Abstract stack-machine emulation for key recovery.
///
/// # Key Types
///
/// - [`emulation::InstructionEmulator`] - The abstract interpreter
/// - [`emulation::StackValue`] - Fully known or unknown 32-bit values
/// - [`emulation::NativeKeyHelpers`] - Replay contract for embedded helpers
pub mod emulation;

/// Deobfuscation passes and diagnostics.
///
/// # Key Types
///
/// - [`deobfuscation::BlockPass`] - The pass contract
/// - [`deobfuscation::passes::UnflatteningPass`] - Switch-dispatch
///   reconstruction
/// - [`deobfuscation::EventLog`] - Structured per-method diagnostics
pub mod deobfuscation;

/// `unswitch` Result type, used throughout the crate.
///
/// ```rust
/// use unswitch::{disassembler::BlockId, Error, Result};
///
/// fn pick(targets: &[BlockId], index: i32) -> Result<BlockId> {
///     usize::try_from(index)
///         .ok()
///         .and_then(|i| targets.get(i).copied())
///         .ok_or(Error::IndexOutOfRange { index, targets: targets.len() })
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `unswitch` Error type.
///
/// Every variant is scoped to a single predecessor or dispatcher; see the
/// type documentation for the recovery semantics of each.
pub use error::Error;
