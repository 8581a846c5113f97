//! Read-only backend loading entries from a TOML document.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use vanir::{Backend, BackendError, Cancellation, Consumer, Entry, Result};

/// Errors raised while loading the TOML document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("entry {index}: {field} not specified")]
    EmptyField { index: usize, field: &'static str },

    #[error("duplicate import path: {0}")]
    Duplicate(String),
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    entries: Vec<Entry>,
}

/// Read-only [`Backend`] over a TOML entry file.
///
/// The entry set never changes after load, so reads take no lock;
/// `add`/`remove` fail with
/// [`BackendError::NotSupported`](vanir::BackendError::NotSupported).
#[derive(Debug)]
pub struct FileBackend {
    entries: HashMap<String, Entry>,
    closed: AtomicBool,
}

impl FileBackend {
    /// Parse a TOML document of the form:
    ///
    /// ```toml
    /// [[entries]]
    /// import_path = "example.org/pkg"
    /// vcs = "git"
    /// vcs_root = "https://github.com/example/pkg"
    /// ```
    ///
    /// Every field must be present and non-empty, and import paths must be
    /// unique.
    pub fn from_str(document: &str) -> std::result::Result<Self, LoadError> {
        let document: Document = toml::from_str(document)?;

        let mut entries = HashMap::with_capacity(document.entries.len());
        for (index, entry) in document.entries.into_iter().enumerate() {
            for (field, value) in [
                ("import_path", &entry.import_path),
                ("vcs", &entry.vcs),
                ("vcs_root", &entry.vcs_root),
            ] {
                if value.is_empty() {
                    return Err(LoadError::EmptyField { index, field });
                }
            }

            let import_path = entry.import_path.clone();
            if entries.insert(import_path.clone(), entry).is_some() {
                return Err(LoadError::Duplicate(import_path));
            }
        }

        Ok(Self {
            entries,
            closed: AtomicBool::new(false),
        })
    }

    /// Load the TOML document at `path`.
    pub async fn from_path(path: impl AsRef<Path>) -> std::result::Result<Self, LoadError> {
        let document = tokio::fs::read_to_string(path).await?;
        Self::from_str(&document)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::AlreadyClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn get(&self, import_path: &str) -> Result<Entry> {
        self.check()?;

        self.entries
            .get(import_path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn add(&self, _import_path: &str, _vcs: &str, _vcs_root: &str) -> Result<()> {
        self.check()?;
        Err(BackendError::NotSupported)
    }

    async fn remove(&self, _import_path: &str) -> Result<()> {
        self.check()?;
        Err(BackendError::NotSupported)
    }

    async fn list(
        &self,
        cancel: &Cancellation,
        consumer: Option<&mut dyn Consumer>,
    ) -> Result<()> {
        self.check()?;

        let Some(consumer) = consumer else {
            cancel.check()?;
            return Ok(());
        };

        // the map is immutable, no snapshot needed
        for entry in self.entries.values() {
            cancel.check()?;
            consumer.on_entry(entry).await;
        }

        Ok(())
    }

    async fn healthz(&self) -> Result<()> {
        self.check()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanir::FnConsumer;

    const DOCUMENT: &str = r#"
        [[entries]]
        import_path = "a.com/b"
        vcs = "git"
        vcs_root = "https://git.example.com/b"

        [[entries]]
        import_path = "a.com/c"
        vcs = "hg"
        vcs_root = "https://hg.example.com/c"
    "#;

    #[tokio::test]
    async fn loads_and_serves_entries() {
        let backend = FileBackend::from_str(DOCUMENT).unwrap();
        assert_eq!(backend.len(), 2);

        let entry = backend.get("a.com/b").await.unwrap();
        assert_eq!(entry, Entry::new("a.com/b", "git", "https://git.example.com/b"));

        let err = backend.get("a.com/z").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn empty_document_is_valid() {
        let backend = FileBackend::from_str("").unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn mutation_is_not_supported() {
        let backend = FileBackend::from_str(DOCUMENT).unwrap();

        let err = backend.add("a.com/d", "git", "root").await.unwrap_err();
        assert!(matches!(err, BackendError::NotSupported));

        let err = backend.remove("a.com/b").await.unwrap_err();
        assert!(matches!(err, BackendError::NotSupported));
    }

    #[tokio::test]
    async fn list_delivers_every_entry() {
        let backend = FileBackend::from_str(DOCUMENT).unwrap();
        let cancel = Cancellation::new();

        let mut seen = Vec::new();
        let mut consumer = FnConsumer(|entry: &Entry| seen.push(entry.import_path.clone()));
        backend.list(&cancel, Some(&mut consumer)).await.unwrap();

        seen.sort();
        assert_eq!(seen, vec!["a.com/b", "a.com/c"]);
    }

    #[tokio::test]
    async fn list_stops_after_cancellation() {
        let backend = FileBackend::from_str(DOCUMENT).unwrap();
        let cancel = Cancellation::new();

        let mut delivered = 0usize;
        let err = {
            let token = cancel.clone();
            let mut consumer = FnConsumer(|_: &Entry| {
                delivered += 1;
                token.cancel();
            });
            backend
                .list(&cancel, Some(&mut consumer))
                .await
                .unwrap_err()
        };

        assert!(matches!(err, BackendError::Cancelled));
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn closed_backend_rejects_everything_but_close() {
        let backend = FileBackend::from_str(DOCUMENT).unwrap();
        backend.close().await.unwrap();

        let cancel = Cancellation::new();
        assert!(matches!(
            backend.get("a.com/b").await.unwrap_err(),
            BackendError::AlreadyClosed
        ));
        assert!(matches!(
            backend.add("a.com/d", "git", "root").await.unwrap_err(),
            BackendError::AlreadyClosed
        ));
        assert!(matches!(
            backend.list(&cancel, None).await.unwrap_err(),
            BackendError::AlreadyClosed
        ));
        assert!(matches!(
            backend.healthz().await.unwrap_err(),
            BackendError::AlreadyClosed
        ));

        backend.close().await.unwrap();
    }

    #[test]
    fn empty_field_is_rejected() {
        let document = r#"
            [[entries]]
            import_path = "a.com/b"
            vcs = ""
            vcs_root = "https://git.example.com/b"
        "#;

        let err = FileBackend::from_str(document).unwrap_err();
        assert!(matches!(
            err,
            LoadError::EmptyField { index: 0, field: "vcs" }
        ));
    }

    #[test]
    fn missing_field_is_rejected() {
        let document = r#"
            [[entries]]
            import_path = "a.com/b"
            vcs = "git"
        "#;

        assert!(matches!(
            FileBackend::from_str(document).unwrap_err(),
            LoadError::Parse(_)
        ));
    }

    #[test]
    fn duplicate_import_path_is_rejected() {
        let document = r#"
            [[entries]]
            import_path = "a.com/b"
            vcs = "git"
            vcs_root = "https://git.example.com/b"

            [[entries]]
            import_path = "a.com/b"
            vcs = "git"
            vcs_root = "https://git.example.com/other"
        "#;

        let err = FileBackend::from_str(document).unwrap_err();
        assert!(matches!(err, LoadError::Duplicate(path) if path == "a.com/b"));
    }

    #[tokio::test]
    async fn loads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.toml");
        std::fs::write(&path, DOCUMENT).unwrap();

        let backend = FileBackend::from_path(&path).await.unwrap();
        assert_eq!(backend.len(), 2);
    }
}
