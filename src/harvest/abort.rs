//! Cooperative cancellation for fetch jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller sets to stop a running job.
///
/// Fetchers check it between items and between pages. Calls already in
/// flight are allowed to finish, and the checkpoint is saved before the job
/// returns.
///
/// ```
/// use prharvest::harvest::AbortSignal;
///
/// let signal = AbortSignal::new();
/// let handle = signal.clone();
/// handle.abort();
/// assert!(signal.is_aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the job stop at the next checkpoint boundary.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
