//! Agentry Core — shared types, configuration, and conversation storage.
//!
//! This crate contains:
//! - **types**: provider-neutral messages, tool calls, requests and responses
//! - **config**: JSON config schema, loader, and env var overrides
//! - **conversation**: the long-term conversation store (JSONL and in-memory)
//! - **error**: errors shared by the memory layers

pub mod config;
pub mod conversation;
pub mod error;
pub mod types;
pub mod utils;

pub use conversation::{ConversationStore, InMemoryConversationStore, JsonlConversationStore};
pub use error::MemoryError;
