//! Cooperative cancellation for listing operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{BackendError, Result};

/// Cancellation token handed to [`Backend::list`](crate::Backend::list).
///
/// All clones observe the same flag. A token fires either explicitly via
/// [`cancel`](Cancellation::cancel) or implicitly once its deadline passes;
/// once fired it never resets.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A token that never fires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancel the token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Fail with [`BackendError::Cancelled`] if the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BackendError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let cancel = Cancellation::new();
        assert!(!cancel.is_cancelled());
        assert!(cancel.check().is_ok());
    }

    #[test]
    fn cancel_is_observed_by_clones() {
        let cancel = Cancellation::new();
        let clone = cancel.clone();

        cancel.cancel();

        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(BackendError::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_fires() {
        let cancel = Cancellation::with_timeout(Duration::ZERO);
        assert!(cancel.is_cancelled());
        assert!(matches!(cancel.check(), Err(BackendError::Cancelled)));
    }

    #[test]
    fn pending_deadline_does_not_fire() {
        let cancel = Cancellation::with_timeout(Duration::from_secs(3600));
        assert!(cancel.check().is_ok());
    }
}
