//! `agentry status` — show configuration and provider status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use agentry_agent::ResponseCache;
use agentry_core::config::{get_config_path, load_config, Config};
use agentry_core::conversation::{ConversationStore, JsonlConversationStore};
use agentry_providers::PROVIDERS;

use crate::helpers;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", format!("{} Status", config.agent.name).cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        found_marker(path.exists())
    );
    println!("  {:<18} {}", "Provider:".bold(), config.agent.provider);
    println!("  {:<18} {}", "Model:".bold(), active_model(&config));
    if let Some(provider) = config.providers.get_by_name(&config.agent.provider) {
        println!(
            "  {:<18} {} | {} | {}",
            "Parameters:".bold(),
            format!("temp: {}", provider.temperature).dimmed(),
            format!("max_tokens: {}", provider.max_tokens).dimmed(),
            format!("timeout: {}s", provider.timeout_secs).dimmed(),
        );
    }
    println!(
        "  {:<18} {}",
        "Max iterations:".bold(),
        config.agent.max_iterations
    );

    // Providers
    println!();
    println!("  {}", "Providers:".bold());
    for spec in PROVIDERS {
        let status = match config.providers.get_by_name(spec.name) {
            Some(p) if p.is_configured() => format!("{} (key set)", "✓".green()),
            _ => format!("{}", "· not configured".dimmed()),
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    // Storage
    println!();
    println!("  {:<18} {}", "Cache:".bold(), cache_status(&config));
    println!("  {:<18} {}", "Memory:".bold(), memory_status(&config));
    println!();

    Ok(())
}

fn found_marker(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

/// The model the configured provider will be asked for.
fn active_model(config: &Config) -> String {
    let fallback = agentry_providers::find_by_name(&config.agent.provider)
        .map(|spec| spec.default_model)
        .unwrap_or("(unknown provider)");
    config
        .providers
        .get_by_name(&config.agent.provider)
        .map(|p| p.model_or(fallback).to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn cache_status(config: &Config) -> String {
    if !config.cache.enabled {
        return "disabled".dimmed().to_string();
    }
    let dir = helpers::expand_tilde(&config.cache.directory);
    let entries = if dir.exists() {
        ResponseCache::new(&dir, config.cache.expiry_days)
            .and_then(|cache| cache.len())
            .map(|n| format!("{n} entries"))
            .unwrap_or_else(|e| format!("unreadable: {e}"))
    } else {
        "empty".to_string()
    };
    let expiry = match config.cache.expiry_days {
        Some(days) => format!("expires after {days}d"),
        None => "never expires".to_string(),
    };
    format!("{} ({entries}, {expiry})", dir.display())
}

fn memory_status(config: &Config) -> String {
    let window = format!("window {}", config.memory.short_term_capacity);
    if !config.memory.long_term_enabled {
        return format!("{window}, {}", "long-term disabled".dimmed());
    }
    let dir = helpers::expand_tilde(&config.memory.directory);
    let stored = if dir.exists() {
        JsonlConversationStore::new(Some(dir.clone()))
            .and_then(|store| store.list())
            .map(|list| format!("{} conversations", list.len()))
            .unwrap_or_else(|e| format!("unreadable: {e}"))
    } else {
        "no conversations".to_string()
    };
    format!("{} ({window}, {stored})", dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_model_defaults_per_provider() {
        let mut config = Config::default();
        assert_eq!(active_model(&config), "gpt-4o");

        config.agent.provider = "claude".into();
        assert_eq!(active_model(&config), "claude-3-opus-20240229");

        config.providers.claude.model = "claude-3-haiku-20240307".into();
        assert_eq!(active_model(&config), "claude-3-haiku-20240307");
    }

    #[test]
    fn storage_status_lines() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.directory = dir.path().join("cache").to_string_lossy().into_owned();
        config.memory.directory = dir.path().join("conv").to_string_lossy().into_owned();

        assert!(cache_status(&config).contains("empty, expires after 7d"));
        assert!(memory_status(&config).contains("no conversations"));

        config.cache.enabled = false;
        config.memory.long_term_enabled = false;
        assert_eq!(cache_status(&config), "disabled");
        assert_eq!(memory_status(&config), "window 10, long-term disabled");
    }
}
