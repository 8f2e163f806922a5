use crate::disassembler::MethodToken;

/// Execution contract for embedded native key helpers.
///
/// Some protectors derive the switch key by calling into a small native
/// (x86) routine embedded in the assembly instead of using closed-form
/// arithmetic. This crate never interprets that machine code; the embedding
/// tool supplies an implementation that can recognize such helpers and
/// replay them against a concrete input.
///
/// Implementations must be thread-safe: a batch driver runs methods in
/// parallel, each sharing the same helper contract.
pub trait NativeKeyHelpers: Send + Sync {
    /// True if `token` refers to an embedded `i32 -> i32` key helper.
    fn is_key_helper(&self, token: MethodToken) -> bool;

    /// Replays the helper against `input`.
    ///
    /// Returns `None` when the helper cannot be executed (unsupported
    /// instruction, missing body); the caller treats that as an unresolved
    /// key.
    fn execute(&self, token: MethodToken, input: i32) -> Option<i32>;
}

/// Null implementation for assemblies without native key helpers.
///
/// Every dispatcher then classifies through the arithmetic scheme or is
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeHelpers;

impl NativeKeyHelpers for NoNativeHelpers {
    fn is_key_helper(&self, _token: MethodToken) -> bool {
        false
    }

    fn execute(&self, _token: MethodToken, _input: i32) -> Option<i32> {
        None
    }
}
