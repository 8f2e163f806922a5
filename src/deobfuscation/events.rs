use crate::{disassembler::BlockId, Error};

/// A single diagnostic event recorded during a method solve.
///
/// Events replace ad-hoc console output: the owning pipeline inspects the
/// log to decide whether to retry a method, rerun dependent passes or leave
/// it partially deobfuscated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A dispatcher was fully or partially rewritten.
    DispatcherRewritten {
        /// The dispatcher block
        dispatcher: BlockId,
        /// Number of predecessors rewritten to direct branches
        predecessors: usize,
    },
    /// A dispatcher solve stopped before resolving every predecessor.
    DispatcherStalled {
        /// The dispatcher block
        dispatcher: BlockId,
        /// The stall condition
        error: Error,
    },
    /// One predecessor hit an unrecoverable resolution error.
    PredecessorFailed {
        /// The dispatcher block being solved
        dispatcher: BlockId,
        /// The predecessor that failed
        predecessor: BlockId,
        /// What went wrong
        error: Error,
    },
}

/// Ordered collection of diagnostic events for one method (or a batch).
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EventKind>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        EventLog::default()
    }

    /// Appends an event.
    pub fn record(&mut self, event: EventKind) {
        self.events.push(event);
    }

    /// Appends every event of `other`, preserving order.
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Iterates over recorded events in order.
    pub fn iter(&self) -> impl Iterator<Item = &EventKind> {
        self.events.iter()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
