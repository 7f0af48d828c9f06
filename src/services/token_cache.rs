use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Bearer,
    Jwt,
}

#[derive(Debug, Clone)]
pub struct TokenCacheEntry {
    pub token: String,
    pub token_type: TokenType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_id: String,
}

impl TokenCacheEntry {
    pub fn is_valid(&self, skew_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(skew_seconds) < expires_at,
            None => true,
        }
    }
}

/// Process-lifetime cache of minted tokens, keyed by a hash of the mint
/// configuration. Guarded by a mutex: the pipeline may resolve auth for
/// many descriptors concurrently.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, TokenCacheEntry>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable key for a mint configuration: endpoint + canonical body +
    /// credential reference, hashed so tokens never appear in keys.
    pub fn mint_key(endpoint: &str, body: &serde_json::Value, owner_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(body.to_string().as_bytes());
        hasher.update(owner_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str, skew_seconds: i64) -> Option<TokenCacheEntry> {
        let guard = self.entries.lock().ok()?;
        let entry = guard.get(key)?;
        if entry.is_valid(skew_seconds) {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, entry: TokenCacheEntry) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.insert(key.to_string(), entry);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
