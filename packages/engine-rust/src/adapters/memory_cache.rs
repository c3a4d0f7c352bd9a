//! In-memory [`CacheStore`] backed by [`DashMap`].
//!
//! Entries carry an absolute deadline on the tokio clock and are dropped
//! lazily when a lookup finds them expired, or in bulk by
//! [`MemoryCacheStore::purge_expired`].

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use weave_core::Value;

use crate::traits::CacheStore;

struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Concurrent TTL cache. Readers and writers never block each other beyond
/// `DashMap`'s per-shard locking.
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl CacheStore for MemoryCacheStore {
    fn set(&self, key: &str, value: Value, ttl_minutes: u32) {
        let ttl = Duration::from_secs(u64::from(ttl_minutes) * 60);
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // Re-check under the write lock: a concurrent `set` may have
        // refreshed the entry since the read guard was dropped.
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        let live = match self.entries.get(key) {
            Some(entry) => entry.is_live(now),
            None => return false,
        };
        if !live {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        live
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
