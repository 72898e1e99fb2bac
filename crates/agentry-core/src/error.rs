//! Error types shared by the memory layers.

use thiserror::Error;

/// Errors from conversation memory and its persistent store.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// No conversation with this id exists.
    #[error("conversation '{0}' not found")]
    NotFound(String),

    #[error("conversation storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("conversation record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    /// Whether this error is a missing-conversation miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemoryError::NotFound(_))
    }
}
