//! Tool modules for the Agentry agent.

pub mod base;
pub mod calculator;
pub mod clock;
pub mod error;
pub mod registry;

use std::sync::Arc;

pub use base::{optional_string, require_string, validate_against_schema, FunctionTool, Tool};
pub use calculator::CalculatorTool;
pub use clock::CurrentTimeTool;
pub use error::ToolError;
pub use registry::ToolRegistry;

/// The tools every agent starts with.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(CalculatorTool), Arc::new(CurrentTimeTool)]
}
