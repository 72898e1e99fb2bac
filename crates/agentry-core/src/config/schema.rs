//! Configuration schema — typed settings with defaults.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProvidersConfig`, `CacheConfig`,
//! `MemoryConfig`, `LoggingConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.agentry/config.json` + env vars.
///
/// Read once at startup and passed down explicitly; nothing re-reads it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Orchestrator settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Display name, also used in the default system prompt.
    pub name: String,
    /// One-line description appended to the default system prompt.
    pub description: Option<String>,
    /// Replaces the generated system prompt entirely when set.
    pub system_prompt: Option<String>,
    /// Provider tag selecting the backend (`"openai"` or `"claude"`).
    pub provider: String,
    /// Maximum model ↔ tool round-trips per turn.
    pub max_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agentry".to_string(),
            description: None,
            system_prompt: None,
            provider: "openai".to_string(),
            max_iterations: 10,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Connection and sampling settings for one backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model identifier sent to the API. Empty means the provider's default.
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: String::new(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The configured model, or `fallback` when none is set.
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.model.is_empty() {
            fallback
        } else {
            &self.model
        }
    }
}

/// All provider configurations, one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub claude: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by tag. `"anthropic"` is accepted as an alias.
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "openai" => Some(&self.openai),
            "claude" | "anthropic" => Some(&self.claude),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────

/// Response cache settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Directory holding one JSON file per cached response.
    pub directory: String,
    /// Entries older than this many days are treated as misses.
    /// `None` means entries never expire.
    pub expiry_days: Option<u32>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "~/.agentry/cache".to_string(),
            expiry_days: Some(7),
        }
    }
}

// ─────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────

/// Conversation memory settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Number of non-system messages kept in the model context window.
    pub short_term_capacity: usize,
    /// Persist every message to disk.
    pub long_term_enabled: bool,
    /// Directory holding one `.jsonl` file per conversation.
    pub directory: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 10,
            long_term_enabled: true,
            directory: "~/.agentry/conversations".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `tracing` filter directive (e.g. `"info"`, `"agentry_agent=debug,warn"`).
    pub level: String,
    /// Write logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
