//! `agentry init` — write a default config and create data directories.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use agentry_core::config::{get_config_path, load_config, save_config};
use agentry_core::utils::get_data_path;

use crate::helpers;

/// Run the init command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "Agentry — Setup".cyan().bold());
    println!();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    // 1. Config file, never overwritten
    if path.exists() {
        println!("  {} config already exists at {}", "✓".green(), path.display());
    } else {
        let mut config = load_config(Some(&path));
        // Keys picked up from the environment stay out of the file
        config.providers.openai.api_key.clear();
        config.providers.claude.api_key.clear();
        save_config(&config, Some(&path))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("  {} created config at {}", "✓".green(), path.display());
    }

    // 2. Data directories named by the (possibly pre-existing) config
    let config = load_config(Some(&path));
    ensure_dir("cache", &helpers::expand_tilde(&config.cache.directory))?;
    if config.memory.long_term_enabled {
        ensure_dir("conversations", &helpers::expand_tilde(&config.memory.directory))?;
    }
    ensure_dir("history", &get_data_path().join("history"))?;

    println!();
    println!(
        "  Add an API key under {} (or set {} / {}),",
        "providers.<name>.apiKey".bold(),
        "OPENAI_API_KEY".bold(),
        "ANTHROPIC_API_KEY".bold()
    );
    println!(
        "{}",
        "  then run `agentry chat` to start chatting.".green()
    );
    println!();

    Ok(())
}

fn ensure_dir(label: &str, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {label} directory {}", dir.display()))?;
    println!("  {} {label} dir at {}", "✓".green(), dir.display());
    Ok(())
}
