//! SQLite-backed entry store.
//!
//! Persists entries in a single `entries` table via an sqlx connection
//! pool; the schema is created on connect.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use vanir::{Backend, BackendError, Cancellation, Consumer, Entry, Result};

/// [`Backend`] persisting entries in a SQLite database.
pub struct SqliteBackend {
    pool: SqlitePool,
    closed: AtomicBool,
}

fn store_err(err: sqlx::Error) -> BackendError {
    BackendError::Backend(err.to_string())
}

impl SqliteBackend {
    /// Connect to `database_url` (e.g. `sqlite:./vanir.db`), creating the
    /// database file and schema if missing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(store_err)?
            .create_if_missing(true);

        // one connection keeps in-memory databases coherent across calls
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let backend = Self {
            pool,
            closed: AtomicBool::new(false),
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                import_path TEXT PRIMARY KEY,
                vcs TEXT NOT NULL,
                vcs_root TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::AlreadyClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn get(&self, import_path: &str) -> Result<Entry> {
        self.check()?;

        let row = sqlx::query("SELECT vcs, vcs_root FROM entries WHERE import_path = ?")
            .bind(import_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        match row {
            Some(row) => {
                let vcs: String = row.get("vcs");
                let vcs_root: String = row.get("vcs_root");
                Ok(Entry::new(import_path, vcs, vcs_root))
            }
            None => Err(BackendError::NotFound),
        }
    }

    async fn add(&self, import_path: &str, vcs: &str, vcs_root: &str) -> Result<()> {
        self.check()?;

        sqlx::query("INSERT OR REPLACE INTO entries (import_path, vcs, vcs_root) VALUES (?, ?, ?)")
            .bind(import_path)
            .bind(vcs)
            .bind(vcs_root)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn remove(&self, import_path: &str) -> Result<()> {
        self.check()?;

        let result = sqlx::query("DELETE FROM entries WHERE import_path = ?")
            .bind(import_path)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        cancel: &Cancellation,
        consumer: Option<&mut dyn Consumer>,
    ) -> Result<()> {
        self.check()?;

        // snapshot the rows before any consumer runs
        let rows = sqlx::query("SELECT import_path, vcs, vcs_root FROM entries")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let Some(consumer) = consumer else {
            cancel.check()?;
            return Ok(());
        };

        for row in rows {
            cancel.check()?;
            let import_path: String = row.get("import_path");
            let vcs: String = row.get("vcs");
            let vcs_root: String = row.get("vcs_root");
            consumer.on_entry(&Entry::new(import_path, vcs, vcs_root)).await;
        }

        Ok(())
    }

    async fn healthz(&self) -> Result<()> {
        self.check()?;

        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanir::FnConsumer;

    async fn open() -> SqliteBackend {
        SqliteBackend::connect("sqlite::memory:").await.unwrap()
    }

    async fn seeded() -> SqliteBackend {
        let backend = open().await;
        backend
            .add("a.com/a", "git", "https://git.example.com/a")
            .await
            .unwrap();
        backend
            .add("a.com/b", "git", "https://git.example.com/b")
            .await
            .unwrap();
        backend
            .add("a.com/c", "hg", "https://hg.example.com/c")
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn add_then_get_returns_the_entry() {
        let backend = open().await;

        backend
            .add("a.com/b", "git", "https://git.example.com/b")
            .await
            .unwrap();

        let entry = backend.get("a.com/b").await.unwrap();
        assert_eq!(entry, Entry::new("a.com/b", "git", "https://git.example.com/b"));
    }

    #[tokio::test]
    async fn add_replaces_by_key() {
        let backend = seeded().await;

        backend
            .add("a.com/b", "svn", "https://svn.example.com/b")
            .await
            .unwrap();

        let entry = backend.get("a.com/b").await.unwrap();
        assert_eq!(entry.vcs, "svn");
    }

    #[tokio::test]
    async fn get_unknown_path_is_not_found() {
        let backend = seeded().await;
        let err = backend.get("a.com/z").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn remove_unknown_path_is_not_found() {
        let backend = seeded().await;
        let err = backend.remove("a.com/z").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn removed_entry_is_gone() {
        let backend = seeded().await;

        backend.remove("a.com/b").await.unwrap();

        let err = backend.get("a.com/b").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn list_delivers_every_entry_exactly_once() {
        let backend = seeded().await;
        let cancel = Cancellation::new();

        let mut seen = Vec::new();
        let mut consumer = FnConsumer(|entry: &Entry| seen.push(entry.import_path.clone()));
        backend.list(&cancel, Some(&mut consumer)).await.unwrap();

        seen.sort();
        assert_eq!(seen, vec!["a.com/a", "a.com/b", "a.com/c"]);
    }

    #[tokio::test]
    async fn list_stops_after_cancellation() {
        let backend = seeded().await;
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
    async fn list_without_consumer_is_a_noop() {
        let backend = seeded().await;
        let cancel = Cancellation::new();
        backend.list(&cancel, None).await.unwrap();
    }

    #[tokio::test]
    async fn healthz_round_trips() {
        let backend = open().await;
        backend.healthz().await.unwrap();
    }

    #[tokio::test]
    async fn closed_backend_rejects_everything_but_close() {
        let backend = seeded().await;
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
            backend.remove("a.com/b").await.unwrap_err(),
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
}
