//! In-process cache tiers.
//!
//! Memory: process-lifetime LRU map from identifier to resolved URL.
//! Network: request-cache stand-in whose entries go stale after a max-age,
//! the way an HTTP cache stops serving responses past their freshness.

use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::config::CacheConfig;
use super::lock::{mutex_lock, rw_read, rw_write};
use super::tier::{CacheEntry, CacheTier, CacheTierError, TierKind};

const MEMORY: &str = "cache::memory";
const NETWORK: &str = "cache::network";

// ============================================================================
// Memory tier
// ============================================================================

pub struct MemoryTier {
    entries: RwLock<LruCache<String, CacheEntry>>,
}

impl MemoryTier {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.memory_limit_non_zero())),
        }
    }
}

impl CacheTier for MemoryTier {
    fn kind(&self) -> TierKind {
        TierKind::Memory
    }

    fn get(&self, key: &str) -> Option<CacheEntry> {
        rw_write(&self.entries, MEMORY, "get").get(key).cloned()
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheTierError> {
        let entry = entry.for_tier(TierKind::Memory);
        rw_write(&self.entries, MEMORY, "put").put(entry.key.clone(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) {
        rw_write(&self.entries, MEMORY, "remove").pop(key);
    }

    fn clear(&self) -> Result<(), CacheTierError> {
        rw_write(&self.entries, MEMORY, "clear").clear();
        Ok(())
    }

    fn len(&self) -> usize {
        rw_read(&self.entries, MEMORY, "len").len()
    }
}

// ============================================================================
// Network (request-cache) tier
// ============================================================================

struct Fresh {
    entry: CacheEntry,
    stored_at: Instant,
}

pub struct NetworkTier {
    entries: Mutex<LruCache<String, Fresh>>,
    max_age: Duration,
}

impl NetworkTier {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.network_limit_non_zero())),
            max_age: config.network_max_age(),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl CacheTier for NetworkTier {
    fn kind(&self) -> TierKind {
        TierKind::Network
    }

    fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = mutex_lock(&self.entries, NETWORK, "get");
        let stale = entries
            .peek(key)
            .is_some_and(|fresh| fresh.stored_at.elapsed() > self.max_age);
        if stale {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|fresh| fresh.entry.clone())
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheTierError> {
        if self.max_age.is_zero() {
            return Err(CacheTierError::Rejected {
                tier: TierKind::Network,
                reason: "max-age of zero disables storage".to_string(),
            });
        }
        let entry = entry.for_tier(TierKind::Network);
        mutex_lock(&self.entries, NETWORK, "put").put(
            entry.key.clone(),
            Fresh {
                entry,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) {
        mutex_lock(&self.entries, NETWORK, "remove").pop(key);
    }

    fn clear(&self) -> Result<(), CacheTierError> {
        mutex_lock(&self.entries, NETWORK, "clear").clear();
        Ok(())
    }

    fn len(&self) -> usize {
        mutex_lock(&self.entries, NETWORK, "len").len()
    }
}
