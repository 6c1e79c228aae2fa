use anyhow::{Context, Result};
use std::env;
use tracing::{info, warn};

use config::PipelineConfig;
use pipeline::{RunOptions, SalesPipeline};
use storage::LocalFileStore;

mod config;
mod error;
mod fetcher;
mod models;
mod pipeline;
mod processor;
mod storage;

const DEFAULT_CONFIG_PATH: &str = "pipeline.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let full_rebuild = args.iter().any(|a| a == "--full-rebuild" || a == "-f");
    let include_orders = !args.iter().any(|a| a == "--skip-orders");
    let config_path = args
        .iter()
        .position(|a| a == "--config" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);

    if full_rebuild {
        info!("🚀 Starting sales pipeline (full rebuild)");
    } else {
        info!("🚀 Starting sales pipeline (incremental run)");
    }

    let config = PipelineConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    if config.sources.horizon.is_none()
        && config.sources.psc.is_none()
        && config.sources.ollie.is_none()
        && config.shopify.shop_domain.is_none()
    {
        warn!(
            "No sources configured in {}; nothing to do. See pipeline.toml for an example.",
            config_path
        );
    }

    let mut pipeline = SalesPipeline::new(config, LocalFileStore)
        .context("Failed to initialize the sales pipeline")?;

    let summary = pipeline
        .run(RunOptions {
            full_rebuild,
            include_orders,
        })
        .await
        .context("Pipeline run failed")?;

    summary.log();
    Ok(())
}
