//! Tool Registry — name → tool lookup and dispatch.
//!
//! The orchestrator registers tools here at construction time and dispatches
//! model tool-call requests by name. Registration order is preserved so the
//! function specs sent to the model are deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use agentry_core::types::{ToolCall, ToolDefinition};
use agentry_providers::LlmProvider;

use super::base::Tool;
use super::error::ToolError;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools in registration order and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across tasks.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        info!(tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Provider-neutral definitions for all registered tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Function-calling specs in the given provider's wire shape.
    pub fn spec_for_provider(&self, provider: &dyn LlmProvider) -> Vec<Value> {
        provider.tool_specs(&self.definitions())
    }

    /// Resolve, validate and run a tool.
    ///
    /// The tool body runs on its own task so that a panic inside it is
    /// reported as [`ToolError::Execution`] instead of unwinding the caller.
    pub async fn execute(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let tool = self.resolve(name).inspect_err(|_| {
            warn!(tool = name, "tool not found");
        })?;

        tool.validate(args).map_err(|reason| {
            warn!(tool = name, %reason, "invalid tool arguments");
            ToolError::InvalidArguments {
                tool: name.to_string(),
                reason,
            }
        })?;

        let params: HashMap<String, Value> = match args {
            Value::Object(map) => map.clone().into_iter().collect(),
            _ => HashMap::new(),
        };

        debug!(tool = name, "executing tool");
        let task_tool = Arc::clone(tool);
        let joined = tokio::spawn(async move { task_tool.execute(params).await }).await;

        match joined {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "tool execution failed");
                Err(ToolError::Execution {
                    tool: name.to_string(),
                    reason: format!("{e:#}"),
                })
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    format!("panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    "task was cancelled".to_string()
                };
                warn!(tool = name, %reason, "tool task aborted");
                Err(ToolError::Execution {
                    tool: name.to_string(),
                    reason,
                })
            }
        }
    }

    /// Run a tool call as the model sent it.
    ///
    /// Argument text that never parsed is rejected before the tool is run.
    pub async fn execute_call(&self, call: &ToolCall) -> Result<String, ToolError> {
        if let Some(raw) = &call.raw_arguments {
            self.resolve(&call.name)?;
            warn!(tool = %call.name, "tool arguments are not valid JSON");
            return Err(ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: format!("arguments are not valid JSON: {raw}"),
            });
        }
        self.execute(&call.name, &call.arguments).await
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
