//! Tool dispatch errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// A tool with this name is already registered.
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool ran and failed, or panicked.
    #[error("tool '{tool}' failed: {reason}")]
    Execution { tool: String, reason: String },
}
