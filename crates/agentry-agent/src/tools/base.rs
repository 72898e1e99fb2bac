//! Tool trait — the abstract interface every agent tool must implement.
//!
//! Also provides [`FunctionTool`], which turns a plain closure plus a schema
//! into a tool, and small helpers for pulling typed params out of the
//! argument map.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use agentry_core::types::ToolDefinition;

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The orchestrator discovers tools via `name()`, sends their schemas to the
/// model via `to_definition()`, checks incoming arguments with `validate()`,
/// and dispatches calls via `execute()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the model to call this tool (e.g. `"calculator"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing the parameters (as a `serde_json::Value`).
    ///
    /// Should be `{"type": "object", "properties": {...}, "required": [...]}`.
    fn parameters(&self) -> Value;

    /// Check arguments before `execute` runs.
    ///
    /// The default checks the shape against [`Tool::parameters`]: the value
    /// must be an object, every `required` key must be present, and keys with
    /// a primitive `type` must match it. Returns a reason on failure.
    fn validate(&self, args: &Value) -> Result<(), String> {
        validate_against_schema(&self.parameters(), args)
    }

    /// Execute the tool with validated arguments.
    ///
    /// Returns the tool output as a string (the model reads this).
    /// On failure, return an `Err`; the registry reports it back to the model.
    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String>;

    /// Build the provider-neutral `ToolDefinition` sent to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Schema validation
// ─────────────────────────────────────────────

/// Validate `args` against an object schema.
///
/// Only the subset the model-facing schemas actually use is checked: object
/// shape, `required` keys, and primitive `type` per property. Properties not
/// mentioned in the schema are passed through untouched.
pub fn validate_against_schema(schema: &Value, args: &Value) -> Result<(), String> {
    let obj = match args {
        Value::Object(obj) => obj,
        other => {
            return Err(format!("arguments must be a JSON object, got {}", json_type(other)));
        }
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !obj.contains_key(key) {
                return Err(format!("missing required parameter '{key}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in obj {
            let expected = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(|t| t.as_str());
            if let Some(expected) = expected {
                if !type_matches(expected, value) {
                    return Err(format!(
                        "parameter '{key}' should be {expected}, got {}",
                        json_type(value)
                    ));
                }
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown or compound types are not checked
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────
// FunctionTool
// ─────────────────────────────────────────────

type ToolFn = dyn Fn(HashMap<String, Value>) -> anyhow::Result<String> + Send + Sync;

/// A tool backed by a synchronous closure.
///
/// ```
/// use agentry_agent::tools::{FunctionTool, require_string};
/// use serde_json::json;
///
/// let shout = FunctionTool::new(
///     "shout",
///     "Upper-case the given text",
///     json!({
///         "type": "object",
///         "properties": {"text": {"type": "string"}},
///         "required": ["text"]
///     }),
///     |params| Ok(require_string(&params, "text")?.to_uppercase()),
/// );
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
    func: Arc<ToolFn>,
}

impl FunctionTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: F,
    ) -> Self
    where
        F: Fn(HashMap<String, Value>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Arc::new(func),
        }
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        (self.func)(params)
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required `String` param, returning a user-friendly error.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract an optional `String` param.
pub fn optional_string(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
