//! Config loader — reads `~/.agentry/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.agentry/config.json`
//! 3. Environment variables `AGENTRY_<SECTION>__<FIELD>` (override JSON)
//! 4. Vendor key variables (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`) fill in
//!    API keys that are still empty after steps 1–3.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    apply_env_overrides(read_config_file(path))
}

/// Read and parse the JSON file, without env overrides.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `AGENTRY_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `AGENTRY_AGENT__PROVIDER` → `agent.provider`
/// - `AGENTRY_AGENT__MAX_ITERATIONS` → `agent.max_iterations`
/// - `AGENTRY_PROVIDERS__<NAME>__API_KEY` / `__API_BASE` / `__MODEL`
/// - `AGENTRY_CACHE__ENABLED`, `AGENTRY_CACHE__DIRECTORY`, `AGENTRY_CACHE__EXPIRY_DAYS`
/// - `AGENTRY_MEMORY__SHORT_TERM_CAPACITY`, `AGENTRY_MEMORY__LONG_TERM_ENABLED`,
///   `AGENTRY_MEMORY__DIRECTORY`
/// - `AGENTRY_LOGGING__LEVEL`
fn apply_env_overrides(mut config: Config) -> Config {
    // Agent
    if let Ok(val) = std::env::var("AGENTRY_AGENT__PROVIDER") {
        config.agent.provider = val;
    }
    if let Some(n) = env_parse::<u32>("AGENTRY_AGENT__MAX_ITERATIONS") {
        config.agent.max_iterations = n;
    }

    // Providers
    apply_provider_env(&mut config.providers.openai, "OPENAI", "OPENAI_API_KEY");
    apply_provider_env(&mut config.providers.claude, "CLAUDE", "ANTHROPIC_API_KEY");

    // Cache
    if let Ok(val) = std::env::var("AGENTRY_CACHE__ENABLED") {
        config.cache.enabled = parse_bool(&val);
    }
    if let Ok(val) = std::env::var("AGENTRY_CACHE__DIRECTORY") {
        config.cache.directory = val;
    }
    if let Some(days) = env_parse::<u32>("AGENTRY_CACHE__EXPIRY_DAYS") {
        config.cache.expiry_days = Some(days);
    }

    // Memory
    if let Some(n) = env_parse::<usize>("AGENTRY_MEMORY__SHORT_TERM_CAPACITY") {
        config.memory.short_term_capacity = n;
    }
    if let Ok(val) = std::env::var("AGENTRY_MEMORY__LONG_TERM_ENABLED") {
        config.memory.long_term_enabled = parse_bool(&val);
    }
    if let Ok(val) = std::env::var("AGENTRY_MEMORY__DIRECTORY") {
        config.memory.directory = val;
    }

    // Logging
    if let Ok(val) = std::env::var("AGENTRY_LOGGING__LEVEL") {
        config.logging.level = val;
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str, vendor_key: &str) {
    if let Ok(val) = std::env::var(format!("AGENTRY_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("AGENTRY_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var(format!("AGENTRY_PROVIDERS__{name}__MODEL")) {
        provider.model = val;
    }
    if provider.api_key.is_empty() {
        if let Ok(val) = std::env::var(vendor_key) {
            debug!(provider = name, env = vendor_key, "using API key from vendor env var");
            provider.api_key = val;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env = key, value = %val, "ignoring unparsable env override");
            None
        }
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = read_config_file(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "agent": { "provider": "claude", "maxIterations": 4 },
            "providers": { "claude": { "model": "claude-3-haiku-20240307", "maxTokens": 512 } }
        }"#,
        );

        let config = read_config_file(file.path());
        assert_eq!(config.agent.provider, "claude");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.providers.claude.model, "claude-3-haiku-20240307");
        assert_eq!(config.providers.claude.max_tokens, 512);
        // Default preserved
        assert_eq!(config.providers.claude.temperature, 0.7);
        assert_eq!(config.memory.short_term_capacity, 10);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = read_config_file(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = read_config_file(file.path());
        assert_eq!(config.agent.name, "Agentry");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.agent.provider = "claude".to_string();
        config.providers.claude.api_key = "sk-ant-test".to_string();
        config.cache.expiry_days = None;

        save_config(&config, Some(&path)).unwrap();

        let reloaded = read_config_file(&path);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["cache"].get("expiryDays").is_some());
        assert!(raw["cache"].get("expiry_days").is_none());
    }

    // Env-var tests use distinct variables so they can run in parallel.

    #[test]
    fn test_env_override_provider_tag() {
        std::env::set_var("AGENTRY_AGENT__PROVIDER", "claude");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.agent.provider, "claude");
        std::env::remove_var("AGENTRY_AGENT__PROVIDER");
    }

    #[test]
    fn test_env_override_capacity_and_bad_value() {
        std::env::set_var("AGENTRY_MEMORY__SHORT_TERM_CAPACITY", "25");
        std::env::set_var("AGENTRY_AGENT__MAX_ITERATIONS", "many");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.memory.short_term_capacity, 25);
        assert_eq!(config.agent.max_iterations, 10);
        std::env::remove_var("AGENTRY_MEMORY__SHORT_TERM_CAPACITY");
        std::env::remove_var("AGENTRY_AGENT__MAX_ITERATIONS");
    }

    #[test]
    fn test_env_override_cache_flags() {
        std::env::set_var("AGENTRY_CACHE__ENABLED", "false");
        std::env::set_var("AGENTRY_CACHE__EXPIRY_DAYS", "3");
        let config = apply_env_overrides(Config::default());
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.expiry_days, Some(3));
        std::env::remove_var("AGENTRY_CACHE__ENABLED");
        std::env::remove_var("AGENTRY_CACHE__EXPIRY_DAYS");
    }

    #[test]
    fn test_provider_env_prefixed_key_wins() {
        std::env::set_var("AGENTRY_PROVIDERS__TESTVENDOR__API_KEY", "from-agentry");
        std::env::set_var("TESTVENDOR_API_KEY", "from-vendor");
        let mut provider = ProviderConfig::default();
        apply_provider_env(&mut provider, "TESTVENDOR", "TESTVENDOR_API_KEY");
        assert_eq!(provider.api_key, "from-agentry");
        std::env::remove_var("AGENTRY_PROVIDERS__TESTVENDOR__API_KEY");
        std::env::remove_var("TESTVENDOR_API_KEY");
    }

    #[test]
    fn test_provider_env_vendor_key_fills_empty() {
        std::env::set_var("OTHERVENDOR_API_KEY", "from-vendor");
        let mut empty = ProviderConfig::default();
        apply_provider_env(&mut empty, "OTHERVENDOR", "OTHERVENDOR_API_KEY");
        assert_eq!(empty.api_key, "from-vendor");

        let mut configured = ProviderConfig {
            api_key: "from-file".into(),
            ..Default::default()
        };
        apply_provider_env(&mut configured, "OTHERVENDOR", "OTHERVENDOR_API_KEY");
        assert_eq!(configured.api_key, "from-file");
        std::env::remove_var("OTHERVENDOR_API_KEY");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }
}
