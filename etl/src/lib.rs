pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;

use common::Result;
use common::config::Settings;
use pipeline::EtlPipeline;
use tracing::info;

/// Runs the complete star-schema build: load configuration, pick the
/// storage backend, and execute the three transform stages in dependency
/// order.
pub async fn run_etl_pipeline(config_path: &str) -> Result<()> {
    let config = Settings::new(config_path)?;

    let pipeline = EtlPipeline::new(&config).await?;
    pipeline.run().await?;

    info!("Job completed");
    Ok(())
}
