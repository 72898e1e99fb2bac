//! Provider registry — static specs for the supported LLM backends.
//!
//! Each `ProviderSpec` describes how to reach one backend: the config tag it
//! is selected by, keywords for model matching, the vendor env var for its
//! key, its default API base and default model.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use agentry_core::config::ProvidersConfig;

use crate::anthropic::AnthropicProvider;
use crate::error::ProviderError;
use crate::openai::OpenAiProvider;
use crate::traits::LlmProvider;

// ─────────────────────────────────────────────
// ProviderKind — the backend tag
// ─────────────────────────────────────────────

/// Which wire protocol a provider speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI chat-completions.
    OpenAi,
    /// Anthropic messages (Claude).
    Claude,
}

impl ProviderKind {
    /// The tag used in configuration (`agent.provider`).
    pub fn tag(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
        }
    }

    /// Static spec for this kind.
    pub fn spec(&self) -> &'static ProviderSpec {
        // PROVIDERS holds exactly one spec per kind
        match self {
            ProviderKind::OpenAi => &PROVIDERS[0],
            ProviderKind::Claude => &PROVIDERS[1],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find_by_name(s)
            .map(|spec| spec.kind)
            .ok_or_else(|| ProviderError::NotConfigured(s.to_string()))
    }
}

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// Static specification describing one LLM backend.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    /// Config tag (e.g. `"claude"`).
    pub name: &'static str,
    /// Other names accepted for this provider.
    pub aliases: &'static [&'static str],
    /// Keywords to match in model names (lowercase).
    pub keywords: &'static [&'static str],
    /// Vendor environment variable for the API key.
    pub env_key: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    /// API base used when the config does not set one.
    pub default_api_base: &'static str,
    /// Model used when the config does not set one.
    pub default_model: &'static str,
}

/// All supported providers. Index order matches [`ProviderKind::spec`].
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        kind: ProviderKind::OpenAi,
        name: "openai",
        aliases: &[],
        keywords: &["openai", "gpt"],
        env_key: "OPENAI_API_KEY",
        display_name: "OpenAI",
        default_api_base: "https://api.openai.com/v1",
        default_model: "gpt-4o",
    },
    ProviderSpec {
        kind: ProviderKind::Claude,
        name: "claude",
        aliases: &["anthropic"],
        keywords: &["claude", "anthropic"],
        env_key: "ANTHROPIC_API_KEY",
        display_name: "Anthropic",
        default_api_base: "https://api.anthropic.com/v1",
        default_model: "claude-3-opus-20240229",
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider by config tag or alias (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    let name = name.trim().to_lowercase();
    PROVIDERS
        .iter()
        .find(|spec| spec.name == name || spec.aliases.contains(&name.as_str()))
}

/// Find the provider whose keywords appear in a model name.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS
        .iter()
        .find(|spec| spec.keywords.iter().any(|kw| model_lower.contains(kw)))
}

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Build the provider selected by `name` from the providers config.
///
/// Fails with [`ProviderError::NotConfigured`] if the name is unknown or the
/// provider has no API key.
pub fn create_provider(
    name: &str,
    providers: &ProvidersConfig,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let spec = find_by_name(name).ok_or_else(|| ProviderError::NotConfigured(name.to_string()))?;
    let config = providers
        .get_by_name(spec.name)
        .filter(|c| c.is_configured())
        .ok_or_else(|| ProviderError::NotConfigured(spec.name.to_string()))?;

    debug!(
        provider = spec.display_name,
        model = config.model_or(spec.default_model),
        api_base = config.api_base.as_deref().unwrap_or(spec.default_api_base),
        "Creating LLM provider"
    );

    let provider: Arc<dyn LlmProvider> = match spec.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config, spec)?),
        ProviderKind::Claude => Arc::new(AnthropicProvider::new(config, spec)?),
    };
    Ok(provider)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
