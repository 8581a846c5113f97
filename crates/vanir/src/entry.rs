//! The vanity entry domain model.

use serde::{Deserialize, Serialize};

/// A single vanity URL registration.
///
/// The import path is the sole identity; no two entries share one. Entries
/// are immutable value records, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Import path of the package, e.g. `example.org/pkg`.
    pub import_path: String,
    /// Version control system kind, e.g. `git`.
    pub vcs: String,
    /// Base URL of the repository backing the import path.
    pub vcs_root: String,
}

impl Entry {
    pub fn new(
        import_path: impl Into<String>,
        vcs: impl Into<String>,
        vcs_root: impl Into<String>,
    ) -> Self {
        Self {
            import_path: import_path.into(),
            vcs: vcs.into(),
            vcs_root: vcs_root.into(),
        }
    }
}
