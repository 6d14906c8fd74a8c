//! Progress reporting for batch resolution.
//!
//! The engine reports one tick per finished item through
//! [`ProgressCallback`]; rendering (progress bars, log lines, nothing) is up
//! to the caller.

/// Receives batch progress updates.
///
/// Implementations must be `Send + Sync` so a single reporter can be
/// shared across concurrently resolving items.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of items in the batch.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` items.
    fn inc(&self, delta: u64);

    /// Mark the batch as complete with a final message.
    fn finish(&self, msg: String);
}
