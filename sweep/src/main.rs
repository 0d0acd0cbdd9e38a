mod collector;
mod estimator;
mod policy;
mod progress;
mod runner;
mod server;
mod web;

use anyhow::{Context, Result};
use shared::SweepConfig;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sweep=info,sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Config path from the first argument, then from the environment
    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var_os("SWEEP_CONFIG").map(PathBuf::from));

    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => {
            tracing::info!("No sweep config given, using defaults");
            SweepConfig::default()
        }
    };

    tracing::info!("Starting parameter sweep");
    runner::run(config).await
}

fn load_config(path: &Path) -> Result<SweepConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sweep config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse sweep config {}", path.display()))?;
    tracing::info!("Loaded sweep config from {}", path.display());
    Ok(config)
}
