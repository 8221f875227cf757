//! Layered cache for resolved media URLs.
//!
//! Three tiers, consulted in order and written through on success:
//!
//! - **Memory**: LRU map for the lifetime of the process
//! - **Persistent**: JSON file, compacted to the newest N entries
//! - **Network**: request-cache stand-in with max-age freshness
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enable_memory_tier = true
//! enable_persistent_tier = true
//! persistent_path = "mediaward-cache.json"
//! persistent_max_entries = 100
//! # ... see config.rs for all options
//! ```

mod config;
mod layered;
mod lock;
mod persistent;
mod store;
mod tier;

pub use config::CacheConfig;
pub use layered::LayeredCache;
pub use persistent::PersistentTier;
pub use store::{MemoryTier, NetworkTier};
pub use tier::{CacheEntry, CacheTier, CacheTierError, TierKind};

pub(crate) use lock::mutex_lock;
