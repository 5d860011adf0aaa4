use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use serde_json::json;

use hivescan::catalog::{ClientPool, MemoryMetastore};
use hivescan::conf::Config;
use hivescan::core::{CliArgs, setup_logging};
use hivescan::provider::ConfiguredProvider;
use hivescan::scheduler::{ChangeScheduler, DatasetSelector};
use hivescan::watermark::WatermarkStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "Hivescan started.");

    let config = Config::load(args.config.as_deref())?;
    let catalog = MemoryMetastore::from_json_file(Path::new(&args.catalog))?;
    let prior = match &args.watermarks {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading watermarks from {}", path))?;
            WatermarkStore::from_json(&raw)?
        }
        None => WatermarkStore::new(),
    };
    let now = args.now
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let selector = DatasetSelector::from_config(&config.scan)?;
    let pool = Arc::new(ClientPool::new(Arc::new(catalog), &config.metastore));
    let provider = Arc::new(ConfiguredProvider::new(
        config.scan.update_time_provider_kind,
    ));
    let scheduler = ChangeScheduler::from_config(pool, provider, &config.scan);

    let result = scheduler.scan(&selector, &prior, now).await?;

    let work_units = result
        .descriptors
        .iter()
        .map(|d| d.to_properties())
        .collect::<Result<Vec<_>, _>>()?;
    let output = json!({
        "work_units": work_units,
        "watermarks": result.watermark_urns(),
        "failures": result.failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
