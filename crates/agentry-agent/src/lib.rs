//! Agentry Agent — orchestrator, tools, memory, and response cache.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and built-in tools (calculator, current_time)
//! - **memory**: Short-term windows mirrored to a long-term conversation store
//! - **cache**: Request fingerprint → model response, one file per entry
//! - **context**: System prompt construction
//! - **orchestrator**: The LLM ↔ tool-calling turn loop

pub mod cache;
pub mod context;
pub mod memory;
pub mod orchestrator;
pub mod tools;

pub use cache::{fingerprint, CacheError, ResponseCache};
pub use memory::{MemoryManager, ShortTermMemory};
pub use orchestrator::{Agent, AgentError, AgentOptions};
pub use tools::{Tool, ToolError, ToolRegistry};
