pub mod local;
pub mod reader;
pub mod s3;
pub mod writer;

use async_trait::async_trait;
use common::Result;
use common::config::{StorageConfig, StorageMode};
use local::LocalStorage;
use s3::{S3Manager, S3Storage};
use std::sync::Arc;

/// The storage backend the pipeline reads raw documents from and writes
/// the star schema to. Keys are `/`-separated paths relative to the
/// backend's root (a bucket or a local directory).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    /// Keys are returned sorted lexicographically. This fixes the record
    /// read order, which the dedup tie-break depends on.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    fn root(&self) -> &str;
}

/// Builds the backend selected by the configuration. Resolved once at
/// startup; everything downstream goes through the trait.
pub async fn from_settings(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    match config.mode {
        StorageMode::Local => Ok(Arc::new(LocalStorage::new(&config.local_root))),
        StorageMode::S3 => {
            let manager = Arc::new(S3Manager::new(config.clone()));
            manager.verify_bucket_exists(&config.bucket).await?;
            Ok(Arc::new(S3Storage::new(manager, &config.bucket).await?))
        }
    }
}
