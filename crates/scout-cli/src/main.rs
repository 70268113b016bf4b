mod cache;
mod discover;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use scout_core::AppConfig;
use scout_discovery::ResultCache;
use tracing_subscriber::EnvFilter;

use crate::cache::CacheCommands;

#[derive(Debug, Parser)]
#[command(name = "scout")]
#[command(about = "Location-constrained business discovery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find businesses matching a query within a radius of a location
    Discover {
        /// What to search for (e.g. "motorsport engineering")
        #[arg(long, short)]
        query: String,
        /// Free-text location (e.g. "Swindon, UK")
        #[arg(long, short)]
        location: String,
        /// Search radius in miles
        #[arg(long, short, default_value = "50")]
        radius: f64,
        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Continuation token printed by a previous search
        #[arg(long)]
        page_token: Option<String>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

fn open_cache(config: &AppConfig) -> Arc<ResultCache> {
    Arc::new(match &config.cache_dir {
        Some(dir) => ResultCache::with_dir(dir),
        None => ResultCache::in_memory(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = scout_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, providers = ?config.providers, "configuration loaded");

    let cache = open_cache(&config);
    match cli.command {
        Commands::Discover {
            query,
            location,
            radius,
            limit,
            page_token,
            json,
        } => {
            let args = discover::DiscoverArgs {
                query,
                location,
                radius_miles: radius,
                limit,
                page_token,
                json,
            };
            discover::run_discover(&config, cache, &args).await?;
        }
        Commands::Cache { command } => cache::run_cache_command(&cache, &command).await?,
    }

    Ok(())
}
