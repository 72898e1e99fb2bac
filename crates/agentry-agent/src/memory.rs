//! Conversation memory — a bounded short-term window per conversation,
//! mirrored to a long-term [`ConversationStore`].
//!
//! The short-term window is what the model sees. The long-term log is the
//! complete history and survives restarts when the JSONL store is used.
//! Every append reaches the store before it reaches the window, so the
//! window never holds a message the log does not.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use agentry_core::conversation::ConversationStore;
use agentry_core::error::MemoryError;
use agentry_core::types::{ConversationSummary, Message};

// ─────────────────────────────────────────────
// ShortTermMemory
// ─────────────────────────────────────────────

/// Bounded message window.
///
/// The system message lives outside the window and is always emitted first,
/// so it is never evicted. `capacity` bounds the remaining messages.
///
/// An assistant message carrying tool calls and the tool results after it
/// are evicted together. While a tool round is still open (the newest
/// message is a call or a result) nothing from the latest user message on
/// is evicted, so the window may exceed `capacity` until the model answers.
#[derive(Clone, Debug)]
pub struct ShortTermMemory {
    capacity: usize,
    system: Option<Message>,
    window: VecDeque<Message>,
}

impl ShortTermMemory {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            system: None,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild a window from a full log, keeping only the newest messages.
    pub fn from_log(capacity: usize, log: impl IntoIterator<Item = Message>) -> Self {
        let mut memory = Self::new(capacity);
        for message in log {
            memory.push(message);
        }
        memory
    }

    /// Add a message. A system message replaces the current one.
    pub fn push(&mut self, message: Message) {
        if message.is_system() {
            self.system = Some(message);
            return;
        }

        self.window.push_back(message);

        let mut evictable = self.protected_start();
        while self.window.len() > self.capacity && evictable > 0 {
            let unit = self.front_unit_len().min(evictable);
            self.window.drain(..unit);
            evictable -= unit;
        }
        // A tool result whose assistant call is gone cannot be sent alone
        while self.window.front().is_some_and(Message::is_tool) {
            self.window.pop_front();
        }
    }

    /// Index of the first message that must not be evicted.
    fn protected_start(&self) -> usize {
        let Some(newest) = self.window.back() else {
            return 0;
        };
        let newest_unit = self
            .window
            .iter()
            .rposition(|m| !m.is_tool())
            .unwrap_or(0);

        let round_open = newest.is_tool() || !newest.tool_calls().is_empty();
        if !round_open {
            return newest_unit;
        }
        self.window
            .iter()
            .rposition(|m| matches!(m, Message::User { .. }))
            .map_or(newest_unit, |turn_start| turn_start.min(newest_unit))
    }

    /// Length of the eviction unit at the front: one message plus the tool
    /// results that follow it.
    fn front_unit_len(&self) -> usize {
        let results = self
            .window
            .iter()
            .skip(1)
            .take_while(|m| m.is_tool())
            .count();
        usize::from(!self.window.is_empty()) + results
    }

    /// System message first, then the window oldest to newest.
    pub fn messages(&self) -> Vec<Message> {
        self.system
            .iter()
            .chain(self.window.iter())
            .cloned()
            .collect()
    }

    /// Drop the window, keeping the system message.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn system(&self) -> Option<&Message> {
        self.system.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages including the system message.
    pub fn len(&self) -> usize {
        self.window.len() + usize::from(self.system.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────
// MemoryManager
// ─────────────────────────────────────────────

struct ConversationState {
    window: ShortTermMemory,
    /// Ordinal the next appended message is stored under.
    next_ordinal: u64,
}

/// Short-term windows for every active conversation plus the long-term store.
pub struct MemoryManager {
    capacity: usize,
    store: Arc<dyn ConversationStore>,
    conversations: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryManager {
    pub fn new(capacity: usize, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            capacity: capacity.max(1),
            store,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Allocate a fresh conversation id and create its empty record.
    ///
    /// Prior conversations are left untouched.
    pub fn new_conversation(&self) -> Result<String, MemoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.store.create(&id)?;

        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        conversations.insert(
            id.clone(),
            ConversationState {
                window: ShortTermMemory::new(self.capacity),
                next_ordinal: 0,
            },
        );

        info!(conversation = %id, "started new conversation");
        Ok(id)
    }

    /// Append a message to a conversation.
    ///
    /// The message is written to the long-term store first. The window only
    /// advances once the store has accepted it, so a failed append can be
    /// retried without duplicating anything.
    pub fn append(&self, conversation_id: &str, message: Message) -> Result<(), MemoryError> {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());

        if !conversations.contains_key(conversation_id) {
            let state = self.hydrate(conversation_id)?;
            conversations.insert(conversation_id.to_string(), state);
        }
        let Some(state) = conversations.get_mut(conversation_id) else {
            return Err(MemoryError::NotFound(conversation_id.to_string()));
        };

        self.store
            .append(conversation_id, state.next_ordinal, &message)?;
        debug!(
            conversation = conversation_id,
            ordinal = state.next_ordinal,
            role = %message.role(),
            "appended message"
        );
        state.next_ordinal += 1;
        state.window.push(message);
        Ok(())
    }

    /// Ordered window for building model context. Empty for an unknown id.
    pub fn get_messages(&self, conversation_id: &str) -> Vec<Message> {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        conversations
            .get(conversation_id)
            .map(|state| state.window.messages())
            .unwrap_or_default()
    }

    /// Rebuild the short-term window from the persisted log.
    pub fn load_conversation(&self, conversation_id: &str) -> Result<Vec<Message>, MemoryError> {
        let state = self.hydrate(conversation_id)?;
        let messages = state.window.messages();

        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        conversations.insert(conversation_id.to_string(), state);

        info!(
            conversation = conversation_id,
            window = messages.len(),
            "loaded conversation"
        );
        Ok(messages)
    }

    /// Drop the short-term window, keeping the system message.
    /// The long-term log is not touched.
    pub fn clear_short_term(&self, conversation_id: &str) {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = conversations.get_mut(conversation_id) {
            state.window.clear();
            debug!(conversation = conversation_id, "cleared short-term memory");
        }
    }

    /// Drop the short-term state of a conversation, keeping its log.
    /// Returns `true` if it was active.
    pub fn unload(&self, conversation_id: &str) -> bool {
        let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
        conversations.remove(conversation_id).is_some()
    }

    /// Full persisted log of a conversation.
    pub fn history(&self, conversation_id: &str) -> Result<Vec<Message>, MemoryError> {
        Ok(self.store.load(conversation_id)?.messages)
    }

    /// Summaries of every stored conversation, newest first.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>, MemoryError> {
        self.store.list()
    }

    /// Delete a conversation from both memory layers. Returns `true` if it existed.
    pub fn delete_conversation(&self, conversation_id: &str) -> Result<bool, MemoryError> {
        let was_active = {
            let mut conversations = self.conversations.write().unwrap_or_else(|e| e.into_inner());
            conversations.remove(conversation_id).is_some()
        };
        let was_stored = self.store.delete(conversation_id)?;
        if was_stored {
            info!(conversation = conversation_id, "deleted conversation");
        }
        Ok(was_stored || was_active)
    }

    fn hydrate(&self, conversation_id: &str) -> Result<ConversationState, MemoryError> {
        match self.store.load(conversation_id) {
            Ok(conversation) => {
                let next_ordinal = self.store.next_ordinal(conversation_id)?;
                Ok(ConversationState {
                    window: ShortTermMemory::from_log(self.capacity, conversation.messages),
                    next_ordinal,
                })
            }
            Err(MemoryError::NotFound(_)) => Ok(ConversationState {
                window: ShortTermMemory::new(self.capacity),
                next_ordinal: 0,
            }),
            Err(e) => Err(e),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
