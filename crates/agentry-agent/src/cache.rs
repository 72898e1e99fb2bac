//! Response cache — request fingerprint → previously received model response.
//!
//! File format: `{cache_dir}/{fingerprint}.json`
//! `{"created_at": "...", "response": {"content": ..., "tool_calls": [...], ...}}`
//!
//! Entries are immutable once written. Expiry is checked lazily on read; an
//! expired entry is a miss and its file is removed on that read.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use agentry_core::types::{ChatRequest, LlmResponse};

const ENTRY_EXT: &str = "json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable hex SHA-256 over the request's semantic fields.
///
/// `ChatRequest` serializes its fields in declaration order and JSON object
/// keys inside messages and schemas are emitted sorted, so equal requests
/// always produce the same bytes.
pub fn fingerprint(request: &ChatRequest) -> Result<String, CacheError> {
    let mut sha = Sha256::new();
    sha.update(b"agentry-cache-v1");
    sha.update(serde_json::to_vec(request)?);
    Ok(hex::encode(sha.finalize()))
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    response: LlmResponse,
}

// ─────────────────────────────────────────────
// ResponseCache
// ─────────────────────────────────────────────

/// On-disk response cache, one JSON file per entry.
///
/// Safe to share between tasks: writes go to a unique temp file that is
/// renamed into place, so readers see either the old entry or the new one.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    expiry: Option<Duration>,
}

impl ResponseCache {
    /// Open (and create if needed) a cache directory.
    ///
    /// `expiry_days = None` keeps entries forever.
    pub fn new(dir: impl Into<PathBuf>, expiry_days: Option<u32>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            expiry: expiry_days.map(|d| Duration::days(i64::from(d))),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.{ENTRY_EXT}"))
    }

    fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|ttl| now - created_at >= ttl)
    }

    /// Look up a cached response.
    pub fn get(&self, fingerprint: &str) -> Option<LlmResponse> {
        self.get_at(fingerprint, Utc::now())
    }

    /// Look up a cached response as of `now`.
    pub fn get_at(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<LlmResponse> {
        let path = self.entry_path(fingerprint);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry");
                return None;
            }
        };

        if self.is_expired(entry.created_at, now) {
            debug!(fingerprint, "cache entry expired");
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove expired entry");
                }
            }
            return None;
        }

        debug!(fingerprint, "cache hit");
        Some(entry.response)
    }

    /// Store a response, replacing any existing entry (last write wins).
    pub fn put(&self, fingerprint: &str, response: &LlmResponse) -> Result<(), CacheError> {
        let entry = CacheEntry {
            created_at: Utc::now(),
            response: response.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;

        let tmp = self
            .dir
            .join(format!(".{fingerprint}.{}.tmp", uuid::Uuid::new_v4().simple()));
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_data()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, self.entry_path(fingerprint))) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(fingerprint, "cached response");
        Ok(())
    }

    /// Remove every entry past the expiry window. Returns the count removed.
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;

        for path in self.entry_paths()? {
            let expired = fs::read(&path)
                .ok()
                .and_then(|raw| serde_json::from_slice::<CacheEntry>(&raw).ok())
                .is_some_and(|entry| self.is_expired(entry.created_at, now));
            if expired {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        info!(removed, "cleared expired cache entries");
        Ok(removed)
    }

    /// Remove every entry. Returns the count removed.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        info!(removed, "cleared all cache entries");
        Ok(removed)
    }

    /// Number of entries on disk, expired ones included.
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entry_paths()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            let is_entry = path.extension().is_some_and(|ext| ext == ENTRY_EXT)
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if is_entry {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
