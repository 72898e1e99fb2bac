//! Anthropic messages adapter (Claude).
//!
//! The messages API differs from chat-completions in a few ways this module
//! hides from the rest of the crate:
//! - the system prompt is a top-level field, not a message
//! - assistant tool calls are `tool_use` content blocks with an object `input`
//! - tool results are `tool_result` blocks inside a **user** message
//! - roles must alternate, so consecutive same-role messages are merged

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use agentry_core::config::ProviderConfig;
use agentry_core::types::{ChatRequest, LlmResponse, Message, ToolCall, ToolDefinition, UsageInfo};

use crate::error::ProviderError;
use crate::registry::{ProviderKind, ProviderSpec};
use crate::traits::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Block types this adapter does not consume (e.g. `thinking`).
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<WireUsage> for UsageInfo {
    fn from(usage: WireUsage) -> Self {
        UsageInfo {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        }
    }
}

// ─────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────

/// Split neutral messages into the top-level system prompt and the
/// alternating user/assistant message list.
fn to_wire_messages(messages: &[Message]) -> (Option<String>, Vec<WireMessage>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut wire: Vec<WireMessage> = Vec::new();

    for message in messages {
        let (role, blocks) = match message {
            Message::System { content } => {
                system_parts.push(content);
                continue;
            }
            Message::User { content } => ("user", vec![ContentBlock::Text {
                text: content.clone(),
            }]),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks = Vec::new();
                if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                    blocks.push(ContentBlock::Text {
                        text: text.to_string(),
                    });
                }
                blocks.extend(tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    // `input` must be an object on this wire
                    input: if call.arguments.is_object() {
                        call.arguments.clone()
                    } else {
                        json!({})
                    },
                }));
                ("assistant", blocks)
            }
            Message::Tool {
                content,
                tool_call_id,
            } => ("user", vec![ContentBlock::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: content.clone(),
            }]),
        };

        if blocks.is_empty() {
            continue;
        }
        match wire.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => wire.push(WireMessage {
                role,
                content: blocks,
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, wire)
}

/// Render one tool definition as an Anthropic tool.
fn anthropic_tool(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

// ─────────────────────────────────────────────
// AnthropicProvider
// ─────────────────────────────────────────────

/// LLM provider for the Anthropic messages API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    default_model: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl AnthropicProvider {
    /// Create a provider from the user's config and the static spec.
    pub fn new(config: &ProviderConfig, spec: &'static ProviderSpec) -> Result<Self, ProviderError> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| spec.default_api_base.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::Client)?;

        Ok(AnthropicProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: config.model_or(spec.default_model).to_string(),
            spec,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_base.trim_end_matches('/'))
    }

    fn build_body(&self, request: &ChatRequest) -> MessagesRequest {
        let (system, messages) = to_wire_messages(&request.messages);
        MessagesRequest {
            model: request.model.clone(),
            system,
            messages,
            tools: self.tool_specs(&request.tools),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_response(&self, body: &str) -> Result<LlmResponse, ProviderError> {
        let provider = self.spec.display_name;
        let resp: MessagesResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
                provider: provider.to_string(),
                reason: e.to_string(),
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in resp.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input))
                }
                ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
            }
        }

        if text.is_empty() && tool_calls.is_empty() {
            return Err(ProviderError::EmptyResponse(provider.to_string()));
        }

        Ok(LlmResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            finish_reason: resp.stop_reason,
            usage: resp.usage.map(UsageInfo::from),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse, ProviderError> {
        let provider = self.spec.display_name;
        debug!(
            provider,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling LLM"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|source| {
                error!(provider, error = %source, "HTTP request failed");
                ProviderError::Http {
                    provider: provider.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ProviderError::Http {
            provider: provider.to_string(),
            source,
        })?;

        if !status.is_success() {
            error!(provider, status = %status, body = %body, "API error");
            return Err(ProviderError::Status {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let llm_resp = self.parse_response(&body)?;
        debug!(
            provider,
            has_content = llm_resp.content.is_some(),
            tool_calls = llm_resp.tool_calls.len(),
            stop_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(llm_resp)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }

    fn tool_specs(&self, tools: &[ToolDefinition]) -> Vec<Value> {
        tools.iter().map(anthropic_tool).collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
