//! `agentry cache` — manage the on-disk response cache.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use agentry_agent::ResponseCache;
use agentry_core::config::Config;

use crate::helpers;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove expired entries (or every entry with --all)
    Clear {
        /// Remove every entry, not only expired ones
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

pub fn dispatch(config: &Config, cmd: CacheCommands) -> Result<()> {
    match cmd {
        CacheCommands::Clear { all } => {
            let removed = clear(config, all)?;
            let what = if all { "entries" } else { "expired entries" };
            println!("  {} removed {removed} {what}", "✓".green());
            Ok(())
        }
    }
}

/// Clear the configured cache directory. Returns the count removed.
fn clear(config: &Config, all: bool) -> Result<usize> {
    let dir = helpers::expand_tilde(&config.cache.directory);
    let cache = ResponseCache::new(&dir, config.cache.expiry_days)
        .with_context(|| format!("failed to open cache at {}", dir.display()))?;

    let removed = if all {
        cache.clear_all()
    } else {
        cache.clear_expired()
    };
    removed.context("failed to clear cache")
}
