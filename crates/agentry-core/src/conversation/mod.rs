//! Long-term conversation storage.
//!
//! The [`ConversationStore`] trait is the persistence boundary of the memory
//! manager. Every message is appended together with its ordinal (0-based
//! position in the conversation); a store that already holds an ordinal
//! ignores the repeated append, so a caller may retry a failed append without
//! creating duplicates.
//!
//! # Disk format (JSONL)
//!
//! Each conversation is a `.jsonl` file under `~/.agentry/conversations/`.
//! - Line 1: metadata `{"_type": "metadata", "id": "...", "created_at": "..."}`
//! - Lines 2+: records `{"ordinal": 0, "timestamp": "...", "message": {"role": "system", ...}}`

pub mod jsonl;
pub mod store;

pub use jsonl::JsonlConversationStore;
pub use store::{ConversationStore, InMemoryConversationStore};
