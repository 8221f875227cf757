//! Cache configuration.
//!
//! Controls which tiers the layered cache builds and how large they grow.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_MEMORY_LIMIT: usize = 500;
const DEFAULT_PERSISTENT_MAX_ENTRIES: usize = 100;
const DEFAULT_PERSISTENT_PATH: &str = "mediaward-cache.json";
const DEFAULT_NETWORK_LIMIT: usize = 200;
const DEFAULT_NETWORK_MAX_AGE_MS: u64 = 60 * 60 * 1000;
const DEFAULT_MAINTENANCE_INTERVAL_MS: u64 = 60_000;

/// Layered cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the process-lifetime memory tier.
    pub enable_memory_tier: bool,
    /// Maximum identifiers held in memory (LRU).
    pub memory_limit: usize,
    /// Enable the file-backed persistent tier.
    pub enable_persistent_tier: bool,
    /// File holding persisted entries.
    pub persistent_path: PathBuf,
    /// Entries kept by compaction, newest first.
    pub persistent_max_entries: usize,
    /// Enable the request-cache tier.
    pub enable_network_tier: bool,
    /// Maximum entries in the request-cache tier.
    pub network_limit: usize,
    /// Freshness lifetime of request-cache entries (ms).
    pub network_max_age_ms: u64,
    /// Interval (ms) between persistent-tier compaction and flush.
    pub maintenance_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_memory_tier: true,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            enable_persistent_tier: true,
            persistent_path: PathBuf::from(DEFAULT_PERSISTENT_PATH),
            persistent_max_entries: DEFAULT_PERSISTENT_MAX_ENTRIES,
            enable_network_tier: true,
            network_limit: DEFAULT_NETWORK_LIMIT,
            network_max_age_ms: DEFAULT_NETWORK_MAX_AGE_MS,
            maintenance_interval_ms: DEFAULT_MAINTENANCE_INTERVAL_MS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_memory_tier: settings.enable_memory_tier,
            memory_limit: settings.memory_limit,
            enable_persistent_tier: settings.enable_persistent_tier,
            persistent_path: settings.persistent_path.clone(),
            persistent_max_entries: settings.persistent_max_entries,
            enable_network_tier: settings.enable_network_tier,
            network_limit: settings.network_limit,
            network_max_age_ms: settings.network_max_age_ms,
            maintenance_interval_ms: settings.maintenance_interval_ms,
        }
    }
}

impl CacheConfig {
    /// Memory-only configuration, handy where nothing may touch the disk.
    pub fn memory_only() -> Self {
        Self {
            enable_persistent_tier: false,
            enable_network_tier: false,
            ..Self::default()
        }
    }

    /// Returns true if any tier is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enable_memory_tier || self.enable_persistent_tier || self.enable_network_tier
    }

    pub fn memory_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn persistent_max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.persistent_max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn network_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.network_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn network_max_age(&self) -> Duration {
        Duration::from_millis(self.network_max_age_ms)
    }

    /// Maintenance interval, never shorter than one second.
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms.max(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enable_memory_tier);
        assert!(config.enable_persistent_tier);
        assert!(config.enable_network_tier);
        assert_eq!(config.memory_limit, 500);
        assert_eq!(config.persistent_max_entries, 100);
        assert_eq!(config.network_max_age(), Duration::from_secs(3600));
    }

    #[test]
    fn memory_only_disables_other_tiers() {
        let config = CacheConfig::memory_only();
        assert!(config.is_enabled());
        assert!(!config.enable_persistent_tier);
        assert!(!config.enable_network_tier);
    }

    #[test]
    fn is_disabled_when_all_off() {
        let config = CacheConfig {
            enable_memory_tier: false,
            ..CacheConfig::memory_only()
        };
        assert!(!config.is_enabled());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            persistent_max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.persistent_max_entries_non_zero().get(), 1);
    }

    #[test]
    fn maintenance_interval_has_a_floor() {
        let config = CacheConfig {
            maintenance_interval_ms: 5,
            ..Default::default()
        };
        assert_eq!(config.maintenance_interval(), Duration::from_secs(1));
    }
}
