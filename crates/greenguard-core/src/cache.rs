//! Time-bounded response cache.
//!
//! A small keyed store that remembers REST responses for a fixed five
//! minutes. Entries expire lazily: nothing is swept in the background, a
//! stale entry is deleted the next time it is read.
//!
//! The cache is an ordinary value. Construct one, wrap it in an [`Arc`] and
//! hand it to whoever needs it; tests build isolated instances.
//!
//! ```
//! use std::sync::Arc;
//! use greenguard_core::ResponseCache;
//!
//! let cache: Arc<ResponseCache<String>> = Arc::new(ResponseCache::new());
//! cache.set("current-aqi-40.7128--74.006", "87".to_string());
//! assert_eq!(cache.get("current-aqi-40.7128--74.006").as_deref(), Some("87"));
//! ```
//!
//! [`Arc`]: std::sync::Arc

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// How long an entry stays valid after it is stored.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A stored value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached payload.
    pub data: V,
    /// When the payload was stored.
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

/// Keyed cache with a fixed time-to-live.
///
/// All methods take `&self`; the map is guarded by an internal mutex so a
/// single instance can be shared between tasks.
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Create an empty cache with the five-minute TTL.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: DEFAULT_TTL,
        }
    }

    /// The time-to-live applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a key.
    ///
    /// Returns `None` when the key is absent or its entry is older than the
    /// TTL; an expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now, self.ttl) => {
                debug!("Cache entry '{}' expired", key);
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    /// Store a value, replacing any previous entry and restarting its TTL.
    pub fn set(&self, key: impl Into<String>, data: V) {
        let entry = CacheEntry {
            data,
            stored_at: Instant::now(),
        };
        self.lock().insert(key.into(), entry);
    }

    /// Remove a single key, returning its value if it was still fresh.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.data)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop all expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
