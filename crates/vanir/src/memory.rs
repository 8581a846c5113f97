//! Reference in-memory backend.
//!
//! This implementation doubles as the executable specification of the
//! [`Backend`] contract: other backends are tested against the same
//! operation sequences and expected outcomes.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::backend::{Backend, Consumer};
use crate::cancel::Cancellation;
use crate::entry::Entry;
use crate::error::{BackendError, Result};

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    closed: bool,
}

impl State {
    fn check(&self) -> Result<()> {
        if self.closed {
            return Err(BackendError::AlreadyClosed);
        }
        Ok(())
    }
}

/// In-memory [`Backend`] guarded by a reader/writer lock.
///
/// Point operations hold the lock only for the single map operation;
/// [`list`](Backend::list) copies a snapshot under the read lock and
/// iterates it with the lock released, so consumers may re-enter the
/// backend or run arbitrarily long.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

fn lock_poisoned() -> BackendError {
    BackendError::Backend("lock poisoned".into())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load constructor used for wiring and tests.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.import_path.clone(), entry))
            .collect();
        Self {
            state: RwLock::new(State {
                entries,
                closed: false,
            }),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, import_path: &str) -> Result<Entry> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        state.check()?;

        state
            .entries
            .get(import_path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn add(&self, import_path: &str, vcs: &str, vcs_root: &str) -> Result<()> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        state.check()?;

        state.entries.insert(
            import_path.to_string(),
            Entry::new(import_path, vcs, vcs_root),
        );
        Ok(())
    }

    async fn remove(&self, import_path: &str) -> Result<()> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        state.check()?;

        state
            .entries
            .remove(import_path)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn list(
        &self,
        cancel: &Cancellation,
        consumer: Option<&mut dyn Consumer>,
    ) -> Result<()> {
        let snapshot: Vec<Entry> = {
            let state = self.state.read().map_err(|_| lock_poisoned())?;
            state.check()?;
            state.entries.values().cloned().collect()
        };

        let Some(consumer) = consumer else {
            cancel.check()?;
            return Ok(());
        };

        for entry in &snapshot {
            cancel.check()?;
            consumer.on_entry(entry).await;
        }

        Ok(())
    }

    async fn healthz(&self) -> Result<()> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        state.check()
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        state.closed = true;
        state.entries.clear();
        Ok(())
    }
}
