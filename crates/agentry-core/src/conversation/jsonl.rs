//! Append-only JSONL conversation store.
//!
//! File format: `{conversations_dir}/{encoded_id}.jsonl`
//! - Line 1: `{"_type":"metadata","id":"...","created_at":"..."}`
//! - Line 2+: `{"ordinal":0,"timestamp":"...","message":{"role":"user","content":"hello"}}`
//!
//! Records are only ever appended. A record whose ordinal is already on disk
//! is skipped on write, and on load the first record for each ordinal wins.
//! A torn last line left by a crash is closed off before the next append so
//! it cannot swallow the new record.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::ConversationStore;
use crate::error::MemoryError;
use crate::types::{Conversation, ConversationSummary, Message};
use crate::utils;

// ─────────────────────────────────────────────
// On-disk records
// ─────────────────────────────────────────────

/// Metadata header written as the first line of each conversation file.
#[derive(Debug, Serialize, Deserialize)]
struct ConversationHeader {
    #[serde(rename = "_type")]
    record_type: String,
    id: String,
    created_at: DateTime<Utc>,
}

/// One persisted message.
#[derive(Debug, Serialize, Deserialize)]
struct MessageRecord {
    ordinal: u64,
    timestamp: DateTime<Utc>,
    message: Message,
}

/// Everything parsed out of one conversation file.
struct ParsedFile {
    header: Option<ConversationHeader>,
    messages: BTreeMap<u64, Message>,
    last_timestamp: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────
// JsonlConversationStore
// ─────────────────────────────────────────────

/// Conversation store backed by one append-only `.jsonl` file per conversation.
///
/// Appends are serialized through a single mutex, which also guards the
/// per-conversation index of ordinals already on disk.
pub struct JsonlConversationStore {
    /// Directory where `.jsonl` files are stored.
    dir: PathBuf,
    /// Ordinals known to be on disk, loaded lazily per conversation.
    ordinals: Mutex<HashMap<String, BTreeSet<u64>>>,
}

impl JsonlConversationStore {
    /// Create a store rooted at `dir`.
    ///
    /// `dir` defaults to `~/.agentry/conversations/` if `None`.
    /// The directory is created if it doesn't exist.
    pub fn new(dir: Option<PathBuf>) -> Result<Self, MemoryError> {
        let dir = dir.unwrap_or_else(utils::get_conversations_path);
        std::fs::create_dir_all(&dir)?;

        Ok(JsonlConversationStore {
            dir,
            ordinals: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the conversation files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the JSONL file path for a conversation id.
    fn conversation_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", utils::encode_filename(id)))
    }

    /// Start a fresh line if the file does not end in a newline.
    fn terminate_torn_line(file: &mut File) -> Result<(), MemoryError> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            warn!("Conversation file ends in a partial line, starting a new one");
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write the header line if the file does not exist yet.
    fn ensure_file(&self, id: &str) -> Result<(), MemoryError> {
        let path = self.conversation_path(id);
        if path.exists() {
            return Ok(());
        }

        let header = ConversationHeader {
            record_type: "metadata".to_string(),
            id: id.to_string(),
            created_at: Utc::now(),
        };
        let mut file = File::create(&path)?;
        writeln!(file, "{}", serde_json::to_string(&header)?)?;
        file.sync_data()?;

        debug!("Created conversation file: {}", path.display());
        Ok(())
    }

    /// Parse a conversation file, skipping lines that fail to decode.
    fn parse_file(path: &Path) -> Result<ParsedFile, MemoryError> {
        let reader = BufReader::new(File::open(path)?);
        let mut parsed = ParsedFile {
            header: None,
            messages: BTreeMap::new(),
            last_timestamp: None,
        };

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            if index == 0 {
                if let Ok(header) = serde_json::from_str::<ConversationHeader>(&line) {
                    if header.record_type == "metadata" {
                        parsed.header = Some(header);
                        continue;
                    }
                }
            }

            match serde_json::from_str::<MessageRecord>(&line) {
                Ok(record) => {
                    parsed.last_timestamp = Some(record.timestamp);
                    parsed.messages.entry(record.ordinal).or_insert(record.message);
                }
                Err(e) => {
                    warn!(
                        "Skipping unreadable line {} in {}: {}",
                        index + 1,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(parsed)
    }

    /// Ordinals already on disk for `id`, read from the file on first use.
    fn known_ordinals<'a>(
        &self,
        index: &'a mut HashMap<String, BTreeSet<u64>>,
        id: &str,
    ) -> Result<&'a mut BTreeSet<u64>, MemoryError> {
        if !index.contains_key(id) {
            let path = self.conversation_path(id);
            let known = if path.exists() {
                Self::parse_file(&path)?.messages.into_keys().collect()
            } else {
                BTreeSet::new()
            };
            index.insert(id.to_string(), known);
        }
        Ok(index.entry(id.to_string()).or_default())
    }
}

impl ConversationStore for JsonlConversationStore {
    fn create(&self, id: &str) -> Result<(), MemoryError> {
        let _guard = self.ordinals.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_file(id)
    }

    fn append(&self, id: &str, ordinal: u64, message: &Message) -> Result<(), MemoryError> {
        let mut index = self.ordinals.lock().unwrap_or_else(|e| e.into_inner());
        let known = self.known_ordinals(&mut index, id)?;
        if known.contains(&ordinal) {
            debug!(conversation = id, ordinal, "ordinal already on disk, skipping");
            return Ok(());
        }

        self.ensure_file(id)?;

        let record = MessageRecord {
            ordinal,
            timestamp: Utc::now(),
            message: message.clone(),
        };
        let line = serde_json::to_string(&record)?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(self.conversation_path(id))?;
        Self::terminate_torn_line(&mut file)?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;

        known.insert(ordinal);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Conversation, MemoryError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Err(MemoryError::NotFound(id.to_string()));
        }

        let parsed = Self::parse_file(&path)?;
        if parsed.header.as_ref().is_some_and(|h| h.id != id) {
            warn!("{} belongs to another conversation", path.display());
            return Err(MemoryError::NotFound(id.to_string()));
        }
        let created_at = parsed
            .header
            .as_ref()
            .map(|h| h.created_at)
            .unwrap_or_else(Utc::now);
        let updated_at = parsed.last_timestamp.unwrap_or(created_at);

        debug!(
            "Loaded conversation '{}' with {} messages from disk",
            id,
            parsed.messages.len()
        );

        Ok(Conversation {
            id: id.to_string(),
            messages: parsed.messages.into_values().collect(),
            created_at,
            updated_at,
        })
    }

    fn next_ordinal(&self, id: &str) -> Result<u64, MemoryError> {
        if !self.conversation_path(id).exists() {
            return Err(MemoryError::NotFound(id.to_string()));
        }
        let mut index = self.ordinals.lock().unwrap_or_else(|e| e.into_inner());
        let known = self.known_ordinals(&mut index, id)?;
        Ok(known.last().map_or(0, |last| last + 1))
    }

    fn list(&self) -> Result<Vec<ConversationSummary>, MemoryError> {
        let mut summaries = Vec::new();

        for entry in std::fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "jsonl") {
                continue;
            }

            let parsed = match Self::parse_file(&path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Failed to read conversation {}: {}", path.display(), e);
                    continue;
                }
            };
            let Some(header) = parsed.header else {
                warn!("Conversation file without header: {}", path.display());
                continue;
            };

            summaries.push(ConversationSummary {
                id: header.id,
                message_count: parsed.messages.len(),
                created_at: header.created_at,
                updated_at: parsed.last_timestamp.unwrap_or(header.created_at),
            });
        }

        // Sort by updated_at descending
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let mut index = self.ordinals.lock().unwrap_or_else(|e| e.into_inner());
        index.remove(id);

        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        debug!("Deleted conversation file: {}", path.display());
        Ok(true)
    }

    fn exists(&self, id: &str) -> bool {
        self.conversation_path(id).exists()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
