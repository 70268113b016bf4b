//! `scout cache`: result-cache maintenance.

use clap::Subcommand;
use scout_discovery::ResultCache;

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Remove every cached search result
    Clear,
}

/// # Errors
///
/// Returns an error if the cache directory cannot be read or an entry cannot
/// be removed.
pub(crate) async fn run_cache_command(
    cache: &ResultCache,
    command: &CacheCommands,
) -> anyhow::Result<()> {
    match command {
        CacheCommands::Clear => {
            let Some(dir) = cache.dir() else {
                println!("no cache directory configured (set SCOUT_CACHE_DIR); nothing to clear");
                return Ok(());
            };
            let removed = cache.clear().await?;
            tracing::info!(removed, dir = %dir.display(), "cache cleared");
            println!("removed {removed} cached result(s) from {}", dir.display());
        }
    }
    Ok(())
}
