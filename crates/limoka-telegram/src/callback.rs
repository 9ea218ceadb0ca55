//! Callback data indirection.
//!
//! Telegram caps `callback_data` at 64 bytes. Control payloads that fit are
//! sent as-is; longer ones are kept here for a limited time and the button
//! carries a short key instead. An expired key resolves to `None`, which
//! the navigation layer reports as an expired session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use limoka_crypto::ContentDigest;
use tokio::sync::RwLock;

/// Telegram's `callback_data` limit in bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Marks a stored key. Control payloads start with their version tag and
/// never with this character.
const KEY_PREFIX: char = '@';

/// Hex characters of the payload digest used as key.
const KEY_HEX_LEN: usize = 24;

struct StoredPayload {
    payload: String,
    stored_at: Instant,
}

/// TTL-bounded store of oversized control payloads.
#[derive(Clone)]
pub struct PayloadStore {
    entries: Arc<RwLock<HashMap<String, StoredPayload>>>,
    ttl: Duration,
}

impl PayloadStore {
    /// Create a store keeping payloads for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Callback data for `payload`: the payload itself when it fits,
    /// otherwise a stored key. Storing the same payload again renews it.
    pub async fn encode(&self, payload: &str) -> String {
        if payload.len() <= CALLBACK_DATA_LIMIT && !payload.starts_with(KEY_PREFIX) {
            return payload.to_owned();
        }

        let key = format!(
            "{KEY_PREFIX}{}",
            ContentDigest::sha256(payload.as_bytes()).short_hex(KEY_HEX_LEN)
        );
        let mut guard = self.entries.write().await;
        let ttl = self.ttl;
        guard.retain(|_, v| v.stored_at.elapsed() < ttl);
        guard.insert(
            key.clone(),
            StoredPayload {
                payload: payload.to_owned(),
                stored_at: Instant::now(),
            },
        );
        key
    }

    /// The payload behind callback `data`, `None` when the key is unknown or
    /// expired.
    pub async fn resolve(&self, data: &str) -> Option<String> {
        if !data.starts_with(KEY_PREFIX) {
            return Some(data.to_owned());
        }
        let guard = self.entries.read().await;
        let entry = guard.get(data)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.payload.clone())
    }

    /// Number of stored payloads, expired ones included until reaped.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
