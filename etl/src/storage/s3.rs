use crate::storage::ObjectStorage;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use bytes::Bytes;
use common::Result;
use common::config::StorageConfig;
use std::sync::Arc;

/// Builds and caches S3 clients from the static credentials in the
/// configuration. Endpoint override and path-style addressing keep this
/// working against MinIO-compatible stores.
#[derive(Clone)]
pub struct S3Manager {
    pub config: StorageConfig,
    client_cache: Arc<dashmap::DashMap<String, Arc<S3Client>>>,
}

impl S3Manager {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client_cache: Arc::new(dashmap::DashMap::new()),
        }
    }

    pub async fn get_client(&self, bucket: &str) -> Result<Arc<S3Client>> {
        if let Some(client) = self.client_cache.get(bucket) {
            return Ok(client.clone());
        }

        let credentials = Credentials::new(
            &self.config.access_key,
            &self.config.secret_key,
            None,
            None,
            "static",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&self.config.endpoint)
            .region(Region::new(self.config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Arc::new(aws_sdk_s3::Client::from_conf(s3_config));
        self.client_cache.insert(bucket.to_string(), client.clone());
        Ok(client)
    }

    /// Verifies that a bucket exists and is accessible
    pub async fn verify_bucket_exists(&self, bucket: &str) -> Result<()> {
        let client = self.get_client(bucket).await?;

        match client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => Err(common::Error::Storage(format!(
                "Cannot access bucket '{}': {}",
                bucket, e
            ))),
        }
    }
}

pub struct S3Storage {
    bucket: String,
    client: Arc<S3Client>,
}

impl S3Storage {
    pub async fn new(s3_manager: Arc<S3Manager>, bucket: &str) -> Result<Self> {
        let client = s3_manager.get_client(bucket).await?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let body = Bytes::copy_from_slice(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) if err.err().is_no_such_key() => {
                    common::Error::Storage(format!(
                        "Object {} not found in bucket {}",
                        key, self.bucket
                    ))
                }
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| common::Error::Storage(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

            if let Some(contents) = response.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        objects.push(key);
                    }
                }
            }

            continuation_token = response.next_continuation_token;
            if continuation_token.is_none() {
                break;
            }
        }

        objects.sort();
        Ok(objects)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    fn root(&self) -> &str {
        &self.bucket
    }
}
