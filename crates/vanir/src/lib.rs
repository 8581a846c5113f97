//! Vanir resolves vanity package import paths (e.g. `example.org/pkg`) to
//! version-control locations.
//!
//! This crate defines the storage-agnostic [`Backend`] contract together
//! with the listing [`Consumer`] protocol and its cooperative
//! [`Cancellation`] token, and ships [`MemoryBackend`], the reference
//! implementation every other backend is measured against.

pub mod backend;
pub mod cancel;
pub mod entry;
pub mod error;
pub mod memory;

// Re-export core types
pub use backend::{Backend, Consumer, FnConsumer};
pub use cancel::Cancellation;
pub use entry::Entry;
pub use error::{BackendError, Result};
pub use memory::MemoryBackend;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
