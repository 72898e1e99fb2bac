//! LLM Provider trait — the boundary between the agent and a hosted model API.
//!
//! Every backend (OpenAI, Anthropic) implements this trait and translates the
//! provider-neutral [`ChatRequest`] / [`LlmResponse`] to and from its own wire
//! format.

use async_trait::async_trait;
use serde_json::Value;

use agentry_core::types::{ChatRequest, LlmResponse, ToolDefinition};

use crate::error::ProviderError;
use crate::registry::ProviderKind;

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// `request.model` is already resolved; adapters send it as-is.
    /// Transport, status and parse failures are returned as [`ProviderError`].
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse, ProviderError>;

    /// Which backend this is.
    fn kind(&self) -> ProviderKind;

    /// The model used when the configuration does not name one.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Render tool definitions in this backend's function-calling shape.
    ///
    /// Output order matches input order.
    fn tool_specs(&self, tools: &[ToolDefinition]) -> Vec<Value>;
}
