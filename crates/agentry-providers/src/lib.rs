//! LLM provider layer for Agentry.
//!
//! Direct HTTP adapters for the hosted model APIs, behind one trait.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait that all providers implement
//! - [`registry`] — static specs for the supported providers + builder
//! - [`openai::OpenAiProvider`] — OpenAI chat-completions
//! - [`anthropic::AnthropicProvider`] — Anthropic messages (Claude)

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use openai::OpenAiProvider;
pub use registry::{create_provider, find_by_name, ProviderKind, ProviderSpec, PROVIDERS};
pub use traits::LlmProvider;
