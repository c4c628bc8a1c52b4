//! One-shot cache commands

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::cache::{CacheFactory, ClearOutcome};
use crate::infrastructure::logging;

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Glob of persistent keys to delete (under the namespace); defaults to every key
    #[arg(long)]
    pub pattern: Option<String>,
}

/// Print the capability status of the configured cache
pub async fn status() -> anyhow::Result<()> {
    let config = load_config();
    let cache = CacheFactory::new()
        .create(&config.cache.to_cache_config())
        .await?;

    let status = cache.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(())
}

/// Clear the configured cache and print the outcome
pub async fn clear(args: ClearArgs) -> anyhow::Result<()> {
    let config = load_config();
    let cache = CacheFactory::new()
        .create(&config.cache.to_cache_config())
        .await?;

    let outcome = cache.clear(args.pattern.as_deref()).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let ClearOutcome::MemoryOnly { reason } = outcome {
        tracing::warn!(?reason, "Persistent cache was not cleared");
    }

    Ok(())
}

fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    logging::init_cli_logging(&config.logging);

    config
}
