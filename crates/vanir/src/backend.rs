//! The storage contract every backend implementation satisfies.

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::entry::Entry;
use crate::error::Result;

/// Callback invoked once per stored entry during [`Backend::list`].
///
/// Implementations may re-enter the backend from `on_entry`; backends must
/// not hold internal locks while the consumer runs.
#[async_trait]
pub trait Consumer: Send {
    async fn on_entry(&mut self, entry: &Entry);
}

/// Adapter lifting a plain closure into a [`Consumer`].
pub struct FnConsumer<F>(pub F);

#[async_trait]
impl<F> Consumer for FnConsumer<F>
where
    F: FnMut(&Entry) + Send,
{
    async fn on_entry(&mut self, entry: &Entry) {
        (self.0)(entry)
    }
}

/// Access to a vanity URL store.
///
/// Implementations are shared across request tasks and must be internally
/// synchronized. Every operation fails with
/// [`BackendError::AlreadyClosed`](crate::BackendError::AlreadyClosed) once
/// [`close`](Backend::close) has run; `close` itself is idempotent.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Look up the entry registered for `import_path`.
    async fn get(&self, import_path: &str) -> Result<Entry>;

    /// Create or replace the entry for `import_path`.
    ///
    /// Read-only backends fail with
    /// [`BackendError::NotSupported`](crate::BackendError::NotSupported).
    async fn add(&self, import_path: &str, vcs: &str, vcs_root: &str) -> Result<()>;

    /// Remove the entry for `import_path`.
    async fn remove(&self, import_path: &str) -> Result<()>;

    /// Deliver every stored entry to `consumer`, exactly once per entry, in
    /// backend-defined order.
    ///
    /// `cancel` is checked before each delivery; a fired token stops the
    /// enumeration with
    /// [`BackendError::Cancelled`](crate::BackendError::Cancelled), leaving
    /// already delivered entries in place. A `None` consumer performs the
    /// underlying round-trip without deliveries.
    async fn list(&self, cancel: &Cancellation, consumer: Option<&mut dyn Consumer>)
    -> Result<()>;

    /// Report whether the backend can currently service requests.
    ///
    /// Never mutates state.
    async fn healthz(&self) -> Result<()>;

    /// Release held resources and reject all further operations.
    async fn close(&self) -> Result<()>;
}
