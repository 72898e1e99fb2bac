//! Core types for Agentry — the provider-neutral conversation model.
//!
//! Every provider adapter translates these types to and from its own wire
//! format. Messages are a tagged enum so that role-specific fields (tool calls
//! on assistant turns, the back-reference on tool results) are enforced by the
//! type system instead of by convention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// One turn in a conversation.
///
/// Serialized with a `role` tag, which is also the on-disk format used by the
/// conversation store and the response cache.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },

    User {
        content: String,
    },

    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },

    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message requesting tool calls, with optional text.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content,
            tool_calls,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// The role tag as it appears on the wire.
    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if the message carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => Some(content),
            Message::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls requested by an assistant message (empty for other roles).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Message::Tool { .. })
    }
}

/// Message role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────

/// A tool call from the assistant, requesting execution of a local tool.
///
/// `arguments` is the structured argument record. Adapters whose wire format
/// carries arguments as a JSON string parse it on the way in. Text that does
/// not parse is kept in `raw_arguments` (with `arguments` left null) so it
/// can be reported back to the model and re-sent unchanged.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique ID for this call (used to match the tool result).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Structured arguments.
    #[serde(default)]
    pub arguments: Value,
    /// Argument text the model sent that was not valid JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_arguments: Option<String>,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
            raw_arguments: None,
        }
    }

    /// A call whose argument text could not be parsed.
    pub fn unparsed(
        id: impl Into<String>,
        name: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: Value::Null,
            raw_arguments: Some(raw.into()),
        }
    }
}

// ─────────────────────────────────────────────
// Tool definitions
// ─────────────────────────────────────────────

/// Provider-neutral description of a tool, sent to the model so it knows what
/// it may call. Each adapter renders it into its own function-calling shape.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

// ─────────────────────────────────────────────
// Requests and responses
// ─────────────────────────────────────────────

/// Everything a provider needs for one chat completion call.
///
/// This is also the input of the cache fingerprint, so every field here must
/// be semantically relevant to the model's answer.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Response from a provider after a successful chat completion call.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LlmResponse {
    /// Text content from the assistant (None if only tool calls).
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls requested by the assistant, in emitted order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped generating.
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Token usage statistics.
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

impl LlmResponse {
    /// A plain text response.
    pub fn text(content: impl Into<String>) -> Self {
        LlmResponse {
            content: Some(content.into()),
            finish_reason: Some("stop".to_string()),
            ..Default::default()
        }
    }

    /// A response that only requests tool calls.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        LlmResponse {
            tool_calls,
            finish_reason: Some("tool_calls".to_string()),
            ..Default::default()
        }
    }

    /// Whether the response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Convert into the assistant message stored in memory.
    pub fn into_message(self) -> Message {
        Message::Assistant {
            content: self.content,
            tool_calls: self.tool_calls,
        }
    }
}

/// Token usage statistics from the provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Conversation types
// ─────────────────────────────────────────────

/// A persisted conversation with its full message log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Conversation {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Summary of a conversation for listing purposes.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub message_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_message_serialization() {
        let msg = Message::system("You are a helpful assistant.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "You are a helpful assistant.");
    }

    #[test]
    fn test_assistant_text_omits_tool_calls() {
        let msg = Message::assistant("The answer is 42.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "The answer is 42.");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let msg = Message::assistant_tool_calls(
            None,
            vec![ToolCall::new("call_1", "calculator", json!({"expression": "2+2"}))],
        );
        let json = serde_json::to_value(&msg).unwrap();

        assert!(json.get("content").is_none());
        let calls = json["tool_calls"].as_array().unwrap();
        assert_eq!(calls[0]["id"], "call_1");
        assert_eq!(calls[0]["name"], "calculator");
        assert_eq!(calls[0]["arguments"]["expression"], "2+2");
    }

    #[test]
    fn test_tool_result_deserialization() {
        let json = json!({"role": "tool", "content": "4", "tool_call_id": "call_1"});
        let msg: Message = serde_json::from_value(json).unwrap();

        assert_eq!(msg, Message::tool_result("call_1", "4"));
        assert_eq!(msg.role(), Role::Tool);
    }

    #[test]
    fn test_assistant_without_tool_calls_field_deserializes() {
        let json = json!({"role": "assistant", "content": "hi"});
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(msg.tool_calls().is_empty());
        assert_eq!(msg.text(), Some("hi"));
    }

    #[test]
    fn test_message_accessors() {
        let call = ToolCall::new("c", "t", json!({}));
        let msg = Message::assistant_tool_calls(Some("thinking".into()), vec![call.clone()]);
        assert_eq!(msg.tool_calls(), &[call]);
        assert_eq!(msg.text(), Some("thinking"));
        assert!(Message::system("s").is_system());
        assert!(Message::tool_result("c", "r").is_tool());
        assert!(Message::user("u").tool_calls().is_empty());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Message::user("x").role().to_string(), "user");
    }

    #[test]
    fn test_chat_request_omits_empty_tools() {
        let request = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![Message::user("hi")],
            tools: vec![],
            temperature: 0.7,
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["max_tokens"], 2000);
    }

    #[test]
    fn test_llm_response_into_message() {
        let resp = LlmResponse::tool_calls(vec![ToolCall::new("c1", "calculator", json!({}))]);
        assert!(resp.has_tool_calls());

        let msg = resp.into_message();
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.tool_calls().len(), 1);
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn test_conversation_creation() {
        let conversation = Conversation::new("abc");
        assert_eq!(conversation.id, "abc");
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.created_at, conversation.updated_at);
    }

    #[test]
    fn test_llm_response_serde_round_trip() {
        let resp = LlmResponse {
            content: Some("ok".into()),
            tool_calls: vec![],
            finish_reason: Some("stop".into()),
            usage: Some(UsageInfo {
                prompt_tokens: 3,
                completion_tokens: 1,
                total_tokens: 4,
            }),
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: LlmResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }
}
