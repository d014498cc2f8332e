use crate::storage::ObjectStorage;
use async_trait::async_trait;
use common::{Error, Result};
use std::path::{Path, PathBuf};

/// Filesystem-backed storage for local runs. Keys map to paths relative
/// to the root directory.
pub struct LocalStorage {
    root: PathBuf,
    root_display: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_display = root.to_string_lossy().into_owned();
        Self { root, root_display }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        // Iterative walk; recursion and async fns don't mix well.
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| Error::Storage(format!("Cannot read {}: {}", current.display(), e)))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::Storage(e.to_string()))?
            {
                let path = entry.path();
                if entry
                    .file_type()
                    .await
                    .map_err(|e| Error::Storage(e.to_string()))?
                    .is_dir()
                {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    keys.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Storage(format!("Cannot read {}: {}", path.display(), e)))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::Storage(format!(
                "Storage root {} does not exist",
                self.root.display()
            )));
        }

        // Walk the deepest existing directory implied by the prefix, then
        // filter, so a prefix that is itself a directory never scans
        // siblings.
        let start = self.resolve(prefix.trim_end_matches('/'));
        let walk_from = if start.is_dir() {
            start
        } else {
            self.root.clone()
        };

        let mut keys = Vec::new();
        self.collect_keys(&walk_from, &mut keys).await?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Cannot delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn root(&self) -> &str {
        &self.root_display
    }
}
