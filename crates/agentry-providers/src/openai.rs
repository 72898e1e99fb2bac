//! OpenAI chat-completions adapter.
//!
//! Talks to any `/chat/completions` endpoint with Bearer authentication.
//! Tool-call arguments travel as a JSON-encoded string on this wire; they are
//! parsed into a structured value on the way in and re-encoded on the way out.

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

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f64,
}

/// One message in OpenAI format.
#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments string.
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// Raw chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

// ─────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::System { content } => WireMessage {
                role: "system",
                content: Some(content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            Message::User { content } => WireMessage {
                role: "user",
                content: Some(content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            Message::Assistant {
                content,
                tool_calls,
            } => WireMessage {
                role: "assistant",
                content: content.clone(),
                tool_calls: tool_calls.iter().map(WireToolCall::from).collect(),
                tool_call_id: None,
            },
            Message::Tool {
                content,
                tool_call_id,
            } => WireMessage {
                role: "tool",
                content: Some(content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: Some(tool_call_id.clone()),
            },
        }
    }
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        // Unparseable arguments go back exactly as the model sent them
        let arguments = call
            .raw_arguments
            .clone()
            .unwrap_or_else(|| call.arguments.to_string());
        WireToolCall {
            id: call.id.clone(),
            call_type: function_type(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let raw = call.function.arguments;
        if raw.trim().is_empty() {
            return ToolCall::new(call.id, call.function.name, json!({}));
        }
        match serde_json::from_str(&raw) {
            Ok(arguments) => ToolCall::new(call.id, call.function.name, arguments),
            Err(_) => ToolCall::unparsed(call.id, call.function.name, raw),
        }
    }
}

/// Render one tool definition as an OpenAI function tool.
fn function_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ─────────────────────────────────────────────
// OpenAiProvider
// ─────────────────────────────────────────────

/// LLM provider for the OpenAI chat-completions API.
pub struct OpenAiProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Model used when the request does not override it.
    default_model: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenAiProvider {
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

        Ok(OpenAiProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: config.model_or(spec.default_model).to_string(),
            spec,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_body(&self, request: &ChatRequest) -> ChatCompletionRequest {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(self.tool_specs(&request.tools))
        };
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tool_choice: tools.as_ref().map(|_| "auto"),
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_response(&self, body: &str) -> Result<LlmResponse, ProviderError> {
        let provider = self.spec.display_name;
        let resp: ChatCompletionResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
                provider: provider.to_string(),
                reason: e.to_string(),
            })?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse(provider.to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(ToolCall::from)
            .collect();
        let content = choice.message.content.filter(|c| !c.is_empty());

        if content.is_none() && tool_calls.is_empty() {
            return Err(ProviderError::EmptyResponse(provider.to_string()));
        }

        Ok(LlmResponse {
            content,
            tool_calls,
            finish_reason: choice.finish_reason,
            usage: resp.usage,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
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
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
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
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(llm_resp)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }

    fn tool_specs(&self, tools: &[ToolDefinition]) -> Vec<Value> {
        tools.iter().map(function_tool).collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
