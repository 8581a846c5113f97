//! Error taxonomy shared by all backend implementations.

use thiserror::Error;

/// Errors surfaced by [`Backend`](crate::Backend) operations.
///
/// Callers distinguish only these classes; anything store-specific is
/// carried opaquely in [`BackendError::Backend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// No entry exists for the requested import path.
    #[error("not found")]
    NotFound,

    /// The backend has been closed; only `close` remains callable.
    #[error("already closed")]
    AlreadyClosed,

    /// The operation is not supported by this backend (read-only stores).
    #[error("not supported")]
    NotSupported,

    /// The supplied cancellation token fired or its deadline passed.
    #[error("cancelled or deadline exceeded")]
    Cancelled,

    /// Opaque store-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Shorthand result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;
