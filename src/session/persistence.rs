//! File-backed key-value store
//!
//! Each key lives in its own `<escaped-key>.json` file holding a
//! [`StoredEntry`] envelope, so the expiry travels with the value.

use crate::session::store::{KvStore, Result, StoreError, StoredEntry, expiry_from_now};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

pub struct FileKvStore {
    pub store_dir: PathBuf,
}

impl FileKvStore {
    pub fn new(store_dir: PathBuf) -> Self {
        Self { store_dir }
    }

    /// Creates the store directory if it does not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        if !self.store_dir.exists() {
            fs::create_dir_all(&self.store_dir)
                .await
                .map_err(|e| StoreError::io(&self.store_dir, e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let permissions = std::fs::Permissions::from_mode(0o700);
                fs::set_permissions(&self.store_dir, permissions)
                    .await
                    .map_err(|e| StoreError::io(&self.store_dir, e))?;
            }

            info!("Created store directory: {:?}", self.store_dir);
        }
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.store_dir.join(format!("{}.json", file_stem(key)))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>> {
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        match serde_json::from_str::<StoredEntry>(&json) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                error!("Failed to parse store entry {:?}: {}", path, e);
                self.quarantine(path).await?;
                Ok(None)
            }
        }
    }

    /// Moves an unreadable file aside so the key behaves as missing.
    async fn quarantine(&self, path: &Path) -> Result<()> {
        let corrupted_path = path.with_extension("json.corrupted");
        fs::rename(path, &corrupted_path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        error!(
            "Corrupted store entry detected. Moved {:?} to {:?}",
            path, corrupted_path
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        let Some(entry) = self.read_entry(&path).await? else {
            return Ok(None);
        };

        if entry.key != key {
            warn!(key = %key, stored_key = %entry.key, "Store entry key mismatch, ignoring");
            return Ok(None);
        }
        if entry.is_expired() {
            debug!(key = %key, expires_at = %entry.expires_at, "Store entry expired");
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            key: key.to_string(),
            value,
            expires_at: expiry_from_now(key, ttl)?,
        };
        let path = self.entry_path(key);
        let json = serde_json::to_string(&entry)?;

        fs::write(&path, json)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, permissions)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
        }

        debug!(key = %key, path = ?path, "Stored entry on disk");
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.store_dir)
            .await
            .map_err(|e| StoreError::io(&self.store_dir, e))?;

        while let Some(dir_entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.store_dir, e))?
        {
            let path = dir_entry.path();

            // Only .json files; quarantined files are left for inspection
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match self.read_entry(&path).await {
                Ok(Some(entry)) if entry.is_expired() => {
                    match fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => warn!("Failed to remove expired entry {:?}: {}", path, e),
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to inspect store entry {:?}: {}", path, e),
            }
        }

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Longest escaped stem used as-is; leaves room for the extension and the
/// `.corrupted` suffix under the usual 255-byte file name limit.
const MAX_ESCAPED_STEM_BYTES: usize = 200;

/// File stem for `key`: the escaped key, or `~sha256-<hex digest>` when the
/// escaped form is too long. `~` never survives escaping, so the two forms
/// cannot collide.
fn file_stem(key: &str) -> String {
    let escaped = escape_key(key);
    if escaped.len() <= MAX_ESCAPED_STEM_BYTES {
        return escaped;
    }

    use sha2::Digest as _;
    let mut hasher = sha2::Sha256::new();
    hasher.update(key.as_bytes());
    format!("~sha256-{:x}", hasher.finalize())
}

/// Maps a key onto a file stem. Bytes outside `[A-Za-z0-9_-]` are
/// percent-encoded so distinct keys never share a file.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}
