//! File-backed cache tier that survives restarts.
//!
//! Entries live in memory and are written to a JSON document on flush. The
//! file is replaced atomically (temp file in the same directory, then
//! rename), so a crash mid-write leaves the previous generation intact.
//! Compaction keeps the `max_entries` newest records by timestamp.

use std::collections::{BTreeMap, HashMap};
use std::io::{ErrorKind, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::lock::{rw_read, rw_write};
use super::tier::{CacheEntry, CacheTier, CacheTierError, TierKind};

const SOURCE: &str = "mediaward::cache::persistent";
const FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRecord {
    value: String,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedFile {
    version: u32,
    entries: BTreeMap<String, PersistedRecord>,
}

pub struct PersistentTier {
    path: PathBuf,
    max_entries: NonZeroUsize,
    records: RwLock<HashMap<String, PersistedRecord>>,
    dirty: AtomicBool,
}

impl PersistentTier {
    /// Load the tier from `path`. A missing file starts empty; an unreadable
    /// or corrupt one is logged and replaced on the next flush.
    pub fn open(
        path: impl Into<PathBuf>,
        max_entries: NonZeroUsize,
    ) -> Result<Self, CacheTierError> {
        let path = path.into();
        let records = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<PersistedFile>(&bytes) {
                Ok(file) if file.version == FILE_VERSION => file.entries.into_iter().collect(),
                Ok(file) => {
                    warn!(
                        target = SOURCE,
                        path = %path.display(),
                        version = file.version,
                        "ignoring cache file with unknown version"
                    );
                    HashMap::new()
                }
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        path = %path.display(),
                        error = %err,
                        "ignoring corrupt cache file"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(CacheTierError::Read { path, source }),
        };

        let tier = Self {
            path,
            max_entries,
            records: RwLock::new(records),
            dirty: AtomicBool::new(false),
        };
        if tier.compact() > 0 {
            tier.dirty.store(true, Ordering::Release);
        }
        Ok(tier)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Evict the oldest records beyond capacity. Returns how many were dropped.
    pub fn compact(&self) -> usize {
        let mut records = rw_write(&self.records, SOURCE, "compact");
        let limit = self.max_entries.get();
        if records.len() <= limit {
            return 0;
        }

        let mut by_age: Vec<(OffsetDateTime, String)> = records
            .iter()
            .map(|(key, record)| (record.timestamp, key.clone()))
            .collect();
        by_age.sort();

        let excess = records.len() - limit;
        for (_, key) in by_age.into_iter().take(excess) {
            records.remove(&key);
        }
        self.dirty.store(true, Ordering::Release);
        debug!(target = SOURCE, evicted = excess, "compacted persistent cache");
        excess
    }

    /// Compact, then write the current records to disk if anything changed.
    pub async fn flush(&self) -> Result<(), CacheTierError> {
        self.compact();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let document = {
            let records = rw_read(&self.records, SOURCE, "flush");
            PersistedFile {
                version: FILE_VERSION,
                entries: records
                    .iter()
                    .map(|(key, record)| (key.clone(), record.clone()))
                    .collect(),
            }
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|err| CacheTierError::Join(err.to_string()))
            .and_then(|inner| inner);

        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }
}

impl CacheTier for PersistentTier {
    fn kind(&self) -> TierKind {
        TierKind::Persistent
    }

    fn get(&self, key: &str) -> Option<CacheEntry> {
        rw_read(&self.records, SOURCE, "get")
            .get(key)
            .map(|record| CacheEntry {
                key: key.to_string(),
                url: record.value.clone(),
                timestamp: record.timestamp,
                tier: TierKind::Persistent,
            })
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheTierError> {
        rw_write(&self.records, SOURCE, "put").insert(
            entry.key,
            PersistedRecord {
                value: entry.url,
                timestamp: entry.timestamp,
            },
        );
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn remove(&self, key: &str) {
        if rw_write(&self.records, SOURCE, "remove").remove(key).is_some() {
            self.dirty.store(true, Ordering::Release);
        }
    }

    fn clear(&self) -> Result<(), CacheTierError> {
        rw_write(&self.records, SOURCE, "clear").clear();
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn len(&self) -> usize {
        rw_read(&self.records, SOURCE, "len").len()
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CacheTierError> {
    let write_error = |source: std::io::Error| CacheTierError::Write {
        path: path.to_path_buf(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(write_error)?;

    let mut file = NamedTempFile::new_in(&directory).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;

    use super::*;

    fn limit(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero limit")
    }

    fn entry_at(key: &str, seconds: i64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            url: format!("https://media.example.org/{key}"),
            timestamp: OffsetDateTime::UNIX_EPOCH + TimeDuration::seconds(seconds),
            tier: TierKind::Persistent,
        }
    }

    #[tokio::test]
    async fn entries_survive_a_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache.json");

        let tier = PersistentTier::open(&path, limit(10)).expect("open tier");
        tier.put(entry_at("covers/a.jpg", 10)).expect("put");
        tier.flush().await.expect("flush");

        let reopened = PersistentTier::open(&path, limit(10)).expect("reopen tier");
        let cached = reopened.get("covers/a.jpg").expect("persisted entry");
        assert_eq!(cached.url, "https://media.example.org/covers/a.jpg");
        assert_eq!(cached.timestamp, entry_at("x", 10).timestamp);
    }

    #[test]
    fn compaction_drops_the_oldest_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tier = PersistentTier::open(dir.path().join("c.json"), limit(2)).expect("open tier");

        tier.put(entry_at("old", 1)).expect("put");
        tier.put(entry_at("newest", 30)).expect("put");
        tier.put(entry_at("middle", 20)).expect("put");

        assert_eq!(tier.compact(), 1);
        assert!(tier.get("old").is_none());
        assert!(tier.get("middle").is_some());
        assert!(tier.get("newest").is_some());
    }

    #[test]
    fn corrupt_files_start_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ not json").expect("write garbage");

        let tier = PersistentTier::open(&path, limit(5)).expect("open tier");
        assert!(tier.is_empty());
    }

    #[tokio::test]
    async fn flush_without_changes_does_not_create_a_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache.json");
        let tier = PersistentTier::open(&path, limit(5)).expect("open tier");

        tier.flush().await.expect("flush");
        assert!(!path.exists());
    }
}
