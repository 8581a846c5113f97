//! CLI sub-command implementations.
//!
//! Each command receives the backend as an explicit dependency; there is
//! no ambient process-wide backend handle.

use tracing::debug;
use vanir::{Backend, Cancellation};

use crate::error::Result;
use crate::output::{JsonConsumer, PlainConsumer, plain_line};

pub async fn add(backend: &dyn Backend, import_path: &str, vcs: &str, vcs_root: &str) -> Result<()> {
    debug!("adding {import_path} {vcs} {vcs_root}");
    backend.add(import_path, vcs, vcs_root).await?;
    Ok(())
}

pub async fn get(backend: &dyn Backend, import_path: &str, json: bool) -> Result<()> {
    let entry = backend.get(import_path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("{}", plain_line(&entry));
    }
    Ok(())
}

pub async fn remove(backend: &dyn Backend, import_path: &str) -> Result<()> {
    debug!("removing {import_path}");
    backend.remove(import_path).await?;
    Ok(())
}

pub async fn list(backend: &dyn Backend, json: bool) -> Result<()> {
    let cancel = Cancellation::new();
    if json {
        let mut consumer = JsonConsumer::default();
        backend.list(&cancel, Some(&mut consumer)).await?;
        println!("{}", consumer.finish()?);
    } else {
        let mut consumer = PlainConsumer;
        backend.list(&cancel, Some(&mut consumer)).await?;
    }
    Ok(())
}
