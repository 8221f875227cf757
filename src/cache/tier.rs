//! Shared contract of the cache tiers.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Cache tiers, listed in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Memory,
    Persistent,
    Network,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TierKind::Memory => "memory",
            TierKind::Persistent => "persistent",
            TierKind::Network => "network",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved URL for one identifier, as held by one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub url: String,
    pub timestamp: OffsetDateTime,
    pub tier: TierKind,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, url: impl Into<String>, tier: TierKind) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            timestamp: OffsetDateTime::now_utc(),
            tier,
        }
    }

    /// Same entry re-labelled for another tier, keeping its timestamp.
    pub fn for_tier(&self, tier: TierKind) -> Self {
        Self {
            tier,
            ..self.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheTierError {
    #[error("failed to read cache file `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cache file `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cache file: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("background flush task failed: {0}")]
    Join(String),
    #[error("{tier} tier rejected the write: {reason}")]
    Rejected { tier: TierKind, reason: String },
}

/// One storage layer of the layered cache.
///
/// Each tier holds at most one entry per key; `put` overwrites.
pub trait CacheTier: Send + Sync {
    fn kind(&self) -> TierKind;

    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn put(&self, entry: CacheEntry) -> Result<(), CacheTierError>;

    fn remove(&self, key: &str);

    fn clear(&self) -> Result<(), CacheTierError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
