//! List output consumers for the CLI sub-commands.

use async_trait::async_trait;
use vanir::{Consumer, Entry};

/// Prints one `import_path,vcs,vcs_root` line per entry.
#[derive(Debug, Default)]
pub struct PlainConsumer;

#[async_trait]
impl Consumer for PlainConsumer {
    async fn on_entry(&mut self, entry: &Entry) {
        println!("{}", plain_line(entry));
    }
}

pub fn plain_line(entry: &Entry) -> String {
    format!("{},{},{}", entry.import_path, entry.vcs, entry.vcs_root)
}

/// Collects entries and renders them as one JSON array.
#[derive(Debug, Default)]
pub struct JsonConsumer {
    entries: Vec<Entry>,
}

#[async_trait]
impl Consumer for JsonConsumer {
    async fn on_entry(&mut self, entry: &Entry) {
        self.entries.push(entry.clone());
    }
}

impl JsonConsumer {
    /// Render the collected entries; call once the list completes.
    pub fn finish(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
