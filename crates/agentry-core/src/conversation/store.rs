//! `ConversationStore` trait and the in-process implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::MemoryError;
use crate::types::{Conversation, ConversationSummary, Message};

/// Durable (or at least process-lifetime) storage for conversation logs.
///
/// Implementations must be safe to share across tasks: independent
/// conversations may be appended to concurrently.
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation record. No-op if it already exists.
    fn create(&self, id: &str) -> Result<(), MemoryError>;

    /// Append `message` at position `ordinal`.
    ///
    /// Creates the conversation if it does not exist yet. Returns once the
    /// record is durable. An ordinal that is already stored is ignored.
    fn append(&self, id: &str, ordinal: u64, message: &Message) -> Result<(), MemoryError>;

    /// Load the full log, ordered by ordinal.
    fn load(&self, id: &str) -> Result<Conversation, MemoryError>;

    /// One past the highest stored ordinal, or 0 for an empty log.
    ///
    /// Differs from the loaded message count when records were lost, so
    /// callers must continue from here rather than from `load().len()`.
    fn next_ordinal(&self, id: &str) -> Result<u64, MemoryError>;

    /// Summaries of all stored conversations, most recently updated first.
    fn list(&self) -> Result<Vec<ConversationSummary>, MemoryError>;

    /// Delete a conversation. Returns `true` if it existed.
    fn delete(&self, id: &str) -> Result<bool, MemoryError>;

    /// Whether a conversation with this id exists.
    fn exists(&self, id: &str) -> bool {
        self.load(id).is_ok()
    }
}

// ─────────────────────────────────────────────
// InMemoryConversationStore
// ─────────────────────────────────────────────

struct StoredConversation {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: BTreeMap<u64, Message>,
}

impl StoredConversation {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            messages: BTreeMap::new(),
        }
    }
}

/// Conversation store that lives only as long as the process.
///
/// Used when long-term memory is disabled, so conversations can still be
/// created, switched between and reloaded within one session.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, StoredConversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn create(&self, id: &str) -> Result<(), MemoryError> {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        conversations
            .entry(id.to_string())
            .or_insert_with(StoredConversation::new);
        Ok(())
    }

    fn append(&self, id: &str, ordinal: u64, message: &Message) -> Result<(), MemoryError> {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        let stored = conversations
            .entry(id.to_string())
            .or_insert_with(StoredConversation::new);

        if stored.messages.contains_key(&ordinal) {
            debug!(conversation = id, ordinal, "ordinal already stored, skipping");
            return Ok(());
        }
        stored.messages.insert(ordinal, message.clone());
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Conversation, MemoryError> {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        let stored = conversations
            .get(id)
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

        Ok(Conversation {
            id: id.to_string(),
            messages: stored.messages.values().cloned().collect(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn next_ordinal(&self, id: &str) -> Result<u64, MemoryError> {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        let stored = conversations
            .get(id)
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
        Ok(stored.messages.keys().next_back().map_or(0, |last| last + 1))
    }

    fn list(&self) -> Result<Vec<ConversationSummary>, MemoryError> {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .map(|(id, stored)| ConversationSummary {
                id: id.clone(),
                message_count: stored.messages.len(),
                created_at: stored.created_at,
                updated_at: stored.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        Ok(conversations.remove(id).is_some())
    }

    fn exists(&self, id: &str) -> bool {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        conversations.contains_key(id)
    }
}
