//! Cancellation token for render jobs
//!
//! Rasterizers poll the token between units of work and stop early once the
//! owning session has superseded the request.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative render cancellation
///
/// Clones share the same underlying flag, so the owner keeps one clone and
/// hands another to the worker that runs the render.
///
/// # Example
///
/// ```
/// use annotator_scheduler::CancellationToken;
///
/// let owner = CancellationToken::new();
/// let worker = owner.clone();
///
/// owner.cancel();
/// assert!(worker.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state
    pub fn new() -> Self {
        Self { cancelled: Arc::default() }
    }

    /// Cancel this token and every clone of it
    ///
    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if `cancel()` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` if both tokens share the same flag
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
