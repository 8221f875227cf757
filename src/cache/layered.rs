//! Memory → persistent → network lookup with read-through promotion.
//!
//! Writes fan out to every tier; a tier that fails is logged and skipped.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::persistent::PersistentTier;
use super::store::{MemoryTier, NetworkTier};
use super::tier::{CacheEntry, CacheTier, CacheTierError, TierKind};

const SOURCE: &str = "mediaward::cache";
const METRIC_HIT: &str = "mediaward_cache_hit_total";
const METRIC_MISS: &str = "mediaward_cache_miss_total";
const METRIC_WRITE_ERROR: &str = "mediaward_cache_write_error_total";

pub struct LayeredCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    persistent: Option<Arc<PersistentTier>>,
}

impl LayeredCache {
    /// Build the tiers enabled in `config`. A persistent tier that cannot be
    /// opened is left out rather than failing startup.
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut tiers: Vec<Arc<dyn CacheTier>> = Vec::new();
        let mut persistent = None;

        if config.enable_memory_tier {
            tiers.push(Arc::new(MemoryTier::new(config)));
        }
        if config.enable_persistent_tier {
            match PersistentTier::open(
                config.persistent_path.clone(),
                config.persistent_max_entries_non_zero(),
            ) {
                Ok(tier) => {
                    let tier = Arc::new(tier);
                    tiers.push(tier.clone());
                    persistent = Some(tier);
                }
                Err(err) => warn!(
                    target = SOURCE,
                    path = %config.persistent_path.display(),
                    error = %err,
                    "persistent cache tier unavailable"
                ),
            }
        }
        if config.enable_network_tier {
            tiers.push(Arc::new(NetworkTier::new(config)));
        }

        Self { tiers, persistent }
    }

    /// Assemble a cache from explicit tiers, consulted in the given order.
    pub fn with_tiers(
        tiers: Vec<Arc<dyn CacheTier>>,
        persistent: Option<Arc<PersistentTier>>,
    ) -> Self {
        Self { tiers, persistent }
    }

    pub fn tier_kinds(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|tier| tier.kind()).collect()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        for (index, tier) in self.tiers.iter().enumerate() {
            let Some(entry) = tier.get(key) else {
                continue;
            };

            counter!(METRIC_HIT, "tier" => tier.kind().as_str()).increment(1);
            for upper in &self.tiers[..index] {
                if let Err(err) = upper.put(entry.for_tier(upper.kind())) {
                    report_write_error(upper.kind(), key, &err);
                }
            }
            if index > 0 {
                debug!(
                    target = SOURCE,
                    key,
                    from = %tier.kind(),
                    "promoted cache entry"
                );
            }
            return Some(entry);
        }

        counter!(METRIC_MISS).increment(1);
        None
    }

    pub fn get_url(&self, key: &str) -> Option<String> {
        self.get(key).map(|entry| entry.url)
    }

    /// Lookup in a single tier without promotion.
    pub fn get_from(&self, kind: TierKind, key: &str) -> Option<CacheEntry> {
        self.tiers
            .iter()
            .find(|tier| tier.kind() == kind)
            .and_then(|tier| tier.get(key))
    }

    pub fn set(&self, key: &str, url: &str) {
        let entry = CacheEntry::new(key, url, TierKind::Memory);
        for tier in &self.tiers {
            if let Err(err) = tier.put(entry.for_tier(tier.kind())) {
                report_write_error(tier.kind(), key, &err);
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.tiers.iter().any(|tier| tier.get(key).is_some())
    }

    pub fn remove(&self, key: &str) {
        for tier in &self.tiers {
            tier.remove(key);
        }
    }

    pub fn clear(&self) {
        for tier in &self.tiers {
            if let Err(err) = tier.clear() {
                report_write_error(tier.kind(), "*", &err);
            }
        }
    }

    pub fn persistent(&self) -> Option<&Arc<PersistentTier>> {
        self.persistent.as_ref()
    }

    /// Compact and flush the persistent tier, if there is one.
    pub async fn maintain(&self) {
        let Some(persistent) = &self.persistent else {
            return;
        };
        if let Err(err) = persistent.flush().await {
            report_write_error(TierKind::Persistent, "*", &err);
        }
    }
}

fn report_write_error(tier: TierKind, key: &str, err: &CacheTierError) {
    counter!(METRIC_WRITE_ERROR, "tier" => tier.as_str()).increment(1);
    warn!(
        target = SOURCE,
        tier = %tier,
        key,
        error = %err,
        "cache tier write failed"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct BrokenTier {
        writes: AtomicUsize,
    }

    impl CacheTier for BrokenTier {
        fn kind(&self) -> TierKind {
            TierKind::Network
        }

        fn get(&self, _key: &str) -> Option<CacheEntry> {
            None
        }

        fn put(&self, _entry: CacheEntry) -> Result<(), CacheTierError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CacheTierError::Rejected {
                tier: TierKind::Network,
                reason: "offline".to_string(),
            })
        }

        fn remove(&self, _key: &str) {}

        fn clear(&self) -> Result<(), CacheTierError> {
            Ok(())
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn memory() -> Arc<MemoryTier> {
        Arc::new(MemoryTier::new(&CacheConfig::default()))
    }

    #[test]
    fn lower_tier_hits_are_promoted() {
        let upper = memory();
        let lower = memory();
        lower
            .put(CacheEntry::new("a", "https://x/a.png", TierKind::Memory))
            .expect("seed lower tier");

        let cache = LayeredCache::with_tiers(
            vec![
                upper.clone() as Arc<dyn CacheTier>,
                lower as Arc<dyn CacheTier>,
            ],
            None,
        );
        assert!(upper.get("a").is_none());

        let hit = cache.get("a").expect("layered hit");
        assert_eq!(hit.url, "https://x/a.png");
        assert_eq!(
            upper.get("a").map(|entry| entry.url),
            Some("https://x/a.png".to_string())
        );
    }

    #[test]
    fn failing_tier_does_not_block_the_others() {
        let broken = Arc::new(BrokenTier {
            writes: AtomicUsize::new(0),
        });
        let healthy = memory();
        let cache = LayeredCache::with_tiers(
            vec![
                broken.clone() as Arc<dyn CacheTier>,
                healthy.clone() as Arc<dyn CacheTier>,
            ],
            None,
        );

        cache.set("a", "https://x/a.png");
        assert_eq!(broken.writes.load(Ordering::SeqCst), 1);
        assert!(healthy.get("a").is_some());
        assert!(cache.has("a"));
    }

    #[test]
    fn clear_empties_every_tier() {
        let cache = LayeredCache::from_config(&CacheConfig {
            enable_network_tier: true,
            ..CacheConfig::memory_only()
        });
        assert_eq!(cache.tier_kinds(), vec![TierKind::Memory, TierKind::Network]);

        cache.set("a", "u");
        assert!(cache.get_from(TierKind::Network, "a").is_some());
        cache.clear();
        assert!(!cache.has("a"));
        assert!(cache.get("a").is_none());
    }

    #[tokio::test]
    async fn maintain_flushes_the_persistent_tier() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("media-cache.json");
        let cache = LayeredCache::from_config(&CacheConfig {
            enable_persistent_tier: true,
            persistent_path: path.clone(),
            ..CacheConfig::memory_only()
        });

        cache.set("covers/a.jpg", "https://x/a.jpg");
        cache.maintain().await;
        assert!(path.exists());
    }
}
