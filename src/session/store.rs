//! Key-value storage for session history
//!
//! The chat flow only needs a get/put interface with a time-to-live on write.
//! Two backends are provided: an in-process map and a directory of JSON files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors raised by a key-value backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO errors with path context
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// TTL could not be represented as an expiry timestamp
    #[error("Invalid TTL for key {key}: {message}")]
    InvalidTtl { key: String, message: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Minimal key-value interface with expiring writes.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the raw value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value. The entry
    /// expires `ttl` after this write.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Drops expired entries and returns how many were removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Backend name used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Computes the absolute expiry for a write made now.
pub(crate) fn expiry_from_now(key: &str, ttl: Duration) -> Result<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| StoreError::InvalidTtl {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    Ok(Utc::now() + ttl)
}

/// A stored value with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.read().await;
        Ok(guard
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let expires_at = expiry_from_now(key, ttl)?;
        let mut guard = self.entries.write().await;
        guard.insert(
            key.to_string(),
            StoredEntry {
                key: key.to_string(),
                value,
                expires_at,
            },
        );
        debug!(key = %key, %expires_at, "Stored entry in memory");
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired());
        Ok(before - guard.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
