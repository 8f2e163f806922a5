use thiserror::Error;

use crate::disassembler::BlockId;

/// The generic Error type covering every failure this library can report.
///
/// All variants are scoped to a single predecessor block or a single
/// dispatcher: a failing dispatcher never aborts processing of its siblings,
/// and a failing method never aborts a batch. A block that simply does not
/// match the dispatcher fingerprint is not an error at all; detection reports
/// that as `None`.
///
/// # Error Categories
///
/// ## Key resolution
/// - [`Error::UnresolvedValue`] - Emulation produced an unknown value where a
///   concrete switch key was required
/// - [`Error::IndexOutOfRange`] - Computed case index does not select a target
///
/// ## Solver progress
/// - [`Error::StalledProgress`] - The dependency-ordered retry loop made a
///   full pass without resolving any predecessor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The emulator yielded an unknown top-of-stack or local value where a
    /// concrete switch key was required.
    ///
    /// Unrecoverable for the current predecessor or dispatcher. The solver
    /// records it as a diagnostic and keeps any rewrites already made.
    #[error("emulation produced an unknown value where a concrete switch key was required")]
    UnresolvedValue,

    /// The computed case index does not fall inside the dispatcher's target
    /// list.
    ///
    /// The upper boundary is checked strictly: `index` must satisfy
    /// `0 <= index < targets`.
    #[error("switch case index {index} is out of range for {targets} dispatcher targets")]
    IndexOutOfRange {
        /// The case index produced by key resolution
        index: i32,
        /// Number of targets the dispatcher actually has
        targets: usize,
    },

    /// The solver completed a full round-robin pass over a dispatcher's
    /// predecessors without any predecessor changing state.
    ///
    /// This indicates a circular key dependency or a malformed graph.
    /// Predecessors resolved before the stall keep their rewrites.
    #[error("dispatcher {dispatcher} stalled with {remaining} unprocessed predecessors")]
    StalledProgress {
        /// The dispatcher block whose solve stalled
        dispatcher: BlockId,
        /// Predecessors still unprocessed when progress stopped
        remaining: usize,
    },
}
