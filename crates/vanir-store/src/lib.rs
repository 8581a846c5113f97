//! Storage backends for the vanir service.
//!
//! [`FileBackend`] serves a fixed entry set loaded from a TOML document;
//! [`SqliteBackend`] (feature `sqlite`, on by default) persists entries in
//! a SQLite database.

pub mod file;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::FileBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
