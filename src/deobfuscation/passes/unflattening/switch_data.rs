use crate::disassembler::MethodToken;

/// Key-derivation scheme of a recognized dispatcher block.
///
/// Attached to a block by detection; a block without one is not a dispatcher
/// for this pass. The two schemes are a closed set and are matched
/// exhaustively wherever keys or case indices are computed, so a third
/// scheme is a compile-time-checked addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchData {
    /// Key derivation replays an embedded native helper routine.
    Native {
        /// Token of the `i32 -> i32` helper the dispatcher calls
        helper: MethodToken,
        /// True when the dispatch input is a compile-time constant
        key_hardcoded: bool,
        /// The hardcoded dispatch input, when `key_hardcoded`
        key: Option<i32>,
    },
    /// Key derivation is the closed-form identity `input ^ xor_key`.
    Arithmetic {
        /// Constant the dispatch input is xored with
        xor_key: i32,
        /// Modulus mapping the raw key to a case index, never zero
        division_key: i32,
        /// True when the dispatch input is a compile-time constant
        key_hardcoded: bool,
        /// The hardcoded dispatch input, when `key_hardcoded`
        key: Option<i32>,
    },
}

impl SwitchData {
    /// True when the dispatch input is a compile-time constant.
    ///
    /// Hardcoded dispatchers have exactly one reachable case and are
    /// rewritten directly, without solving predecessors.
    #[must_use]
    pub fn is_key_hardcoded(&self) -> bool {
        match self {
            SwitchData::Native { key_hardcoded, .. }
            | SwitchData::Arithmetic { key_hardcoded, .. } => *key_hardcoded,
        }
    }

    /// The hardcoded dispatch input, if any.
    #[must_use]
    pub fn key(&self) -> Option<i32> {
        match self {
            SwitchData::Native { key, .. } | SwitchData::Arithmetic { key, .. } => *key,
        }
    }
}
