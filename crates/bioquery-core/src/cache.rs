//! TTL response cache for upstream API payloads.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::http_client::HttpMethod;

/// Expiry policy for one pipeline call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Do not read or write the cache for this call.
    Bypass,
    /// Cache without expiry.
    Forever,
    Seconds(u64),
}

impl CacheTtl {
    /// Integer convention used by callers: negative never expires, zero
    /// bypasses, anything else is a lifetime in seconds.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s < 0 => Self::Forever,
            0 => Self::Bypass,
            s => Self::Seconds(s as u64),
        }
    }

    pub const fn is_bypass(self) -> bool {
        matches!(self, Self::Bypass)
    }

    fn expires_at(self, now: Instant) -> Option<Instant> {
        match self {
            Self::Bypass | Self::Forever => None,
            Self::Seconds(secs) => Some(now + Duration::from_secs(secs)),
        }
    }
}

/// Deterministic cache key: sha-256 over the canonical request string
/// (method, URL, parameters in sorted key order).
pub fn cache_key(method: HttpMethod, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    for (name, value) in params {
        hasher.update(b"&");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    let digest = hasher.finalize();
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest {
        key.push_str(&format!("{byte:02x}"));
    }
    key
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    /// `None` means the entry never expires.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
}

/// Thread-safe in-memory response cache shared by the whole process.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached body if present and not expired. Expired entries
    /// are evicted lazily on read.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let store = self.inner.read().await;
            match store.map.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.body.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Entry was expired; re-check under the write lock and evict.
        let mut store = self.inner.write().await;
        if store.map.get(key).is_some_and(|entry| entry.is_expired(now)) {
            store.map.remove(key);
        }
        None
    }

    /// Stores a body under the given policy. `Bypass` is a no-op.
    pub async fn put(&self, key: String, body: String, ttl: CacheTtl) {
        if ttl.is_bypass() {
            return;
        }

        let entry = CacheEntry {
            body,
            expires_at: ttl.expires_at(Instant::now()),
        };
        let mut store = self.inner.write().await;
        store.map.insert(key, entry);
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        let mut store = self.inner.write().await;
        store.map.retain(|_, entry| !entry.is_expired(now));
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
