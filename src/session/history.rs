//! Per-session history persistence
//!
//! Wraps an optional [`KvStore`] with JSON encoding and a fixed TTL. Store
//! failures never reach the caller: reads degrade to the client's copy of
//! the history and failed writes are only logged.

use crate::session::store::KvStore;
use crate::session::types::{History, Message, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// History expires 24 hours after the last write.
pub const HISTORY_TTL: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Clone)]
pub struct HistoryStore {
    store: Option<Arc<dyn KvStore>>,
    ttl: Duration,
}

impl HistoryStore {
    pub fn new(store: Option<Arc<dyn KvStore>>) -> Self {
        Self {
            store,
            ttl: HISTORY_TTL,
        }
    }

    /// History store with no backing store; client history is trusted.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the prior messages for `session_id`.
    ///
    /// Without a store, or when the read fails, `client_history` is used.
    /// A missing or non-array record means an empty history.
    pub async fn load(&self, session_id: &SessionId, client_history: Vec<Message>) -> Vec<Message> {
        let Some(store) = &self.store else {
            return client_history;
        };

        let key = session_id.storage_key();
        let raw = match store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "No stored history");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Unable to read history from store");
                return client_history;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => Message::parse_list(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored history is not valid JSON");
                client_history
            }
        }
    }

    /// Persists `history` for `session_id`; no-op without a store.
    pub async fn save(&self, session_id: &SessionId, history: &History) {
        let Some(store) = &self.store else {
            return;
        };

        let key = session_id.storage_key();
        let json = match serde_json::to_string(history) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Unable to encode history");
                return;
            }
        };

        if let Err(e) = store.put(&key, json, self.ttl).await {
            warn!(key = %key, error = %e, "Unable to persist history to store");
        } else {
            debug!(key = %key, messages = history.len(), "Persisted history");
        }
    }
}
