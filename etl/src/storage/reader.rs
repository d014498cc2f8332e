use crate::storage::ObjectStorage;
use common::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

/// Reads raw records out of the storage backend: every `.json` object
/// under a prefix, one record per non-empty line. This covers both the
/// one-document-per-file catalog dumps and the newline-delimited activity
/// logs.
pub struct JsonDocumentReader {
    storage: Arc<dyn ObjectStorage>,
}

impl JsonDocumentReader {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Lines that fail to parse are skipped with a warning; an unreadable
    /// or empty source prefix is fatal.
    pub async fn read_documents<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let keys = self.storage.list_objects(prefix).await?;

        let mut records = Vec::new();
        let mut files = 0usize;

        for key in keys {
            if !key.ends_with(".json") {
                continue;
            }
            files += 1;

            let bytes = self.storage.get_object(&key).await?;
            let text = String::from_utf8(bytes)?;

            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<T>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(key = %key, error = %e, "Skipping unparseable JSON line"),
                }
            }
        }

        if files == 0 {
            return Err(Error::Storage(format!(
                "No .json documents found under '{}'",
                prefix
            )));
        }

        info!(prefix, files, records = records.len(), "Read raw documents");
        Ok(records)
    }
}
