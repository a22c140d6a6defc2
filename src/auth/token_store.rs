//! # Token Store
//!
//! Persists the access/refresh token pair (plus optional expiry) under
//! namespaced keys in local key-value storage.
//!
//! Reads never fail: a storage error is logged and degrades to `None`, so a
//! broken disk looks like "logged out" rather than crashing the request
//! path. Writes propagate their error, because losing a freshly minted
//! token pair must be visible to the caller.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStorage, StorageError};

/// Storage keys, prefixed to avoid collisions with unrelated entries.
const KEY_ACCESS_TOKEN: &str = "portico.auth.access_token";
const KEY_REFRESH_TOKEN: &str = "portico.auth.refresh_token";
const KEY_EXPIRES_AT: &str = "portico.auth.expires_at";

/// A session's credential pair. `expires_at` is epoch millis; backends that
/// never report an expiry leave it `None`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Sole owner of the persisted token pair; all mutation goes through here.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_key(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_key(KEY_REFRESH_TOKEN)
    }

    /// Persists both tokens and the optional expiry back-to-back. A stale
    /// expiry from a previous session is removed when the new pair has none.
    pub fn set_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.storage.set(KEY_ACCESS_TOKEN, &pair.access_token)?;
        self.storage.set(KEY_REFRESH_TOKEN, &pair.refresh_token)?;
        match pair.expires_at {
            Some(expires_at) => self.storage.set(KEY_EXPIRES_AT, &expires_at.to_string())?,
            None => self.storage.remove(KEY_EXPIRES_AT)?,
        }
        debug!("token pair stored");
        Ok(())
    }

    /// Removes all three keys. Best-effort: failures are logged, not surfaced.
    pub fn clear(&self) {
        for key in [KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_EXPIRES_AT] {
            if let Err(e) = self.storage.remove(key) {
                warn!("failed to remove {key}: {e}");
            }
        }
        debug!("token pair cleared");
    }

    /// Whether the stored expiry has passed. Fail-open: with no recorded
    /// expiry (or an unparseable one) the token is assumed valid; the
    /// server's 401 is the authoritative signal either way.
    pub fn is_expired(&self) -> bool {
        let Some(raw) = self.read_key(KEY_EXPIRES_AT) else {
            return false;
        };
        match raw.parse::<i64>() {
            Ok(expires_at) => expires_at < Utc::now().timestamp_millis(),
            Err(_) => {
                warn!("unparseable token expiry '{raw}', assuming not expired");
                false
            }
        }
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("storage read failed for {key}: {e}");
                None
            }
        }
    }
}
