use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub storage: StorageConfig,
    pub paths: PathsConfig,
}

/// Where the raw documents come from and where the star schema lands.
/// All three are key prefixes resolved against the storage backend.
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    pub catalog_root: String,
    pub activity_root: String,
    pub dest_root: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub mode: StorageMode,
    #[serde(default = "default_local_root")]
    pub local_root: String,
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub bucket: String,
}

fn default_local_root() -> String {
    "data".to_string()
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Build the configuration
        let config = builder.build()?;

        // Try to deserialize the entire configuration
        let settings: Settings = config.try_deserialize()?;

        debug!(
            mode = ?settings.storage.mode,
            dest_root = %settings.paths.dest_root,
            "Parsed pipeline settings"
        );

        Ok(settings)
    }
}
