use crate::{
    deobfuscation::EventLog,
    disassembler::MethodBody,
    Result,
};

/// A deobfuscation pass over a method's block graph.
///
/// Passes must be thread-safe (`Send + Sync`) so a batch driver can run
/// methods in parallel; per-method working state therefore lives inside
/// `run_on_method`, never on the pass itself. Diagnostics go to the caller's
/// [`EventLog`] rather than to any global sink.
pub trait BlockPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Run the pass on a single method body.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    /// Diagnostics are recorded to `log`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the method. Per-block
    /// resolution failures are not errors at this level; they are recorded
    /// as events and the method reports partial success.
    fn run_on_method(&self, body: &mut MethodBody, log: &mut EventLog) -> Result<bool>;
}
