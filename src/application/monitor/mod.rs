//! Periodic health checks and self-healing for registered identifiers.
//!
//! Each cycle probes every non-terminal entry in bounded groups, feeds the
//! outcome through the [`MonitoredEntry`] state machine, and notifies
//! subscribers. Entries that hit the error ceiling go to the healing queue,
//! which tries, in order, the persistent cache tier, candidates not tried
//! before, and finally a synthetic image. Unless a real URL wins, the broken
//! one is evicted from every cache tier.
//!
//! The scheduler holds only a weak reference to the monitor, so dropping the
//! last handle ends the loop at its next wake-up.

mod healing;
mod subscribers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use metrics::counter;
use time::OffsetDateTime;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{LayeredCache, TierKind, mutex_lock};
use crate::domain::health::{HealingOutcome, HealthPolicy, MonitoredEntry};
use crate::domain::{EntryMetadata, HealthSnapshot, HealthStats, HealthStatus};

use super::candidates::CandidateGenerator;
use super::fallback::SyntheticFallback;
use super::probe::StrategyProber;

pub use healing::HealingQueue;
pub use subscribers::{SnapshotListener, SubscriberRegistry, Subscription};

const SOURCE: &str = "mediaward::monitor";
const METRIC_CHECK: &str = "mediaward_health_check_total";
const METRIC_HEAL: &str = "mediaward_heal_total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub check_timeout: Duration,
    pub policy: HealthPolicy,
    /// Queue entries healed per cycle.
    pub healing_batch: usize,
    /// Substitute a generated image once real URLs are exhausted.
    pub synthetic_healing: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch_size: 5,
            batch_delay: Duration::from_millis(100),
            check_timeout: Duration::from_secs(5),
            policy: HealthPolicy::default(),
            healing_batch: 3,
            synthetic_healing: true,
        }
    }
}

pub struct HealthMonitor {
    config: MonitorConfig,
    entries: DashMap<String, MonitoredEntry>,
    queue: HealingQueue,
    subscribers: Arc<SubscriberRegistry>,
    prober: Arc<StrategyProber>,
    candidates: Arc<CandidateGenerator>,
    cache: Arc<LayeredCache>,
    fallback: Arc<SyntheticFallback>,
    visible: AtomicBool,
    wake: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    pub fn new(
        config: MonitorConfig,
        prober: Arc<StrategyProber>,
        candidates: Arc<CandidateGenerator>,
        cache: Arc<LayeredCache>,
        fallback: Arc<SyntheticFallback>,
    ) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            queue: HealingQueue::new(),
            subscribers: Arc::new(SubscriberRegistry::new()),
            prober,
            candidates,
            cache,
            fallback,
            visible: AtomicBool::new(true),
            wake: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // ====================================================================
    // Registry
    // ====================================================================

    /// Start tracking `identifier`. The URL defaults to the cached one, then
    /// to the first candidate. Re-registering only refreshes metadata.
    pub fn register(
        &self,
        identifier: &str,
        url: Option<String>,
        metadata: EntryMetadata,
    ) -> bool {
        let key = identifier.trim();
        if key.is_empty() {
            return false;
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut existing) => {
                let existing = existing.get_mut();
                if metadata != EntryMetadata::default() {
                    existing.metadata = metadata;
                }
                if let Some(url) = url {
                    existing.url = Some(url);
                }
                false
            }
            Entry::Vacant(slot) => {
                let url = url
                    .or_else(|| self.cache.get_url(key))
                    .or_else(|| self.candidates.generate(key).into_iter().next());
                slot.insert(MonitoredEntry::new(key, url, metadata));
                debug!(target = SOURCE, identifier = key, "registered");
                true
            }
        }
    }

    pub fn unregister(&self, identifier: &str) -> bool {
        let key = identifier.trim();
        self.queue.remove(key);
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!(target = SOURCE, identifier = key, "unregistered");
        }
        removed
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier.trim())
    }

    pub fn snapshot(&self, identifier: &str) -> Option<HealthSnapshot> {
        self.entries
            .get(identifier.trim())
            .map(|entry| entry.snapshot())
    }

    pub fn snapshots(&self) -> Vec<HealthSnapshot> {
        let mut all: Vec<HealthSnapshot> =
            self.entries.iter().map(|entry| entry.snapshot()).collect();
        all.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        all
    }

    /// Listen for snapshots of `identifier`. A registered identifier delivers
    /// its current snapshot right away.
    pub fn subscribe(&self, identifier: &str, listener: SnapshotListener) -> Subscription {
        let key = identifier.trim();
        let subscription = self.subscribers.subscribe(key, listener.clone());
        if let Some(snapshot) = self.snapshot(key) {
            listener(snapshot);
        }
        subscription
    }

    pub fn stats(&self) -> HealthStats {
        let mut stats = HealthStats {
            healing_queue_size: self.queue.len(),
            ..HealthStats::default()
        };
        for entry in self.entries.iter() {
            stats.total += 1;
            match entry.status {
                HealthStatus::Healthy => stats.healthy += 1,
                HealthStatus::Warning => stats.warning += 1,
                HealthStatus::Critical => stats.critical += 1,
                HealthStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn healing_queue(&self) -> &HealingQueue {
        &self.queue
    }

    // ====================================================================
    // Checks
    // ====================================================================

    /// One scheduler tick: probe everything, then work the healing queue.
    /// Does nothing while the host is hidden.
    pub async fn run_cycle(&self) {
        if !self.is_visible() {
            return;
        }
        self.check_all().await;
        self.heal_pending().await;
    }

    /// Probe every non-terminal entry in groups of `batch_size`. Returns how
    /// many entries were checked.
    pub async fn check_all(&self) -> usize {
        let mut identifiers: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_terminal())
            .map(|entry| entry.key().clone())
            .collect();
        identifiers.sort();

        let batch_size = self.config.batch_size.max(1);
        let batches = identifiers.len().div_ceil(batch_size);
        let mut checked = 0;
        for (index, batch) in identifiers.chunks(batch_size).enumerate() {
            let outcomes = join_all(batch.iter().map(|id| self.check_one(id))).await;
            checked += outcomes.iter().filter(|status| status.is_some()).count();

            if index + 1 < batches && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }
        checked
    }

    /// Probe one entry and apply the result. `None` when the identifier is not
    /// registered or is already terminal.
    pub async fn check_one(&self, identifier: &str) -> Option<HealthStatus> {
        let url = {
            let entry = self.entries.get(identifier)?;
            if entry.is_terminal() {
                return None;
            }
            entry.url.clone()
        };

        let started = Instant::now();
        let reachable = match &url {
            Some(url) => self.prober.test(url, self.config.check_timeout).await,
            None => false,
        };
        let elapsed = started.elapsed();
        let now = OffsetDateTime::now_utc();

        let (snapshot, needs_healing) = {
            let mut entry = self.entries.get_mut(identifier)?;
            let needs_healing = if reachable {
                entry.record_success(elapsed, now);
                false
            } else {
                entry.record_failure(&self.config.policy, now)
            };
            (entry.snapshot(), needs_healing)
        };

        let outcome = if reachable { "success" } else { "failure" };
        counter!(METRIC_CHECK, "outcome" => outcome).increment(1);
        if needs_healing && self.queue.enqueue(identifier) {
            info!(
                target = SOURCE,
                identifier,
                errors = snapshot.error_count,
                "scheduled healing"
            );
        }

        let status = snapshot.status;
        self.subscribers.publish(&snapshot);
        Some(status)
    }

    // ====================================================================
    // Healing
    // ====================================================================

    /// Heal up to `healing_batch` queued entries, one at a time.
    pub async fn heal_pending(&self) -> usize {
        let batch = self.queue.drain(self.config.healing_batch.max(1));
        let mut processed = 0;
        for identifier in batch {
            if self.heal(&identifier).await.is_some() {
                processed += 1;
            }
        }
        processed
    }

    /// Run one healing attempt. `None` when the entry is gone or terminal.
    pub async fn heal(&self, identifier: &str) -> Option<HealingOutcome> {
        let policy = self.config.policy;
        let (current, metadata, started) = {
            let mut entry = self.entries.get_mut(identifier)?;
            if entry.is_terminal() {
                return None;
            }
            entry.begin_healing(&policy);
            (entry.url.clone(), entry.metadata.clone(), entry.snapshot())
        };
        self.subscribers.publish(&started);

        if !started.is_healing {
            self.cache.remove(identifier);
            counter!(METRIC_HEAL, "outcome" => "failed").increment(1);
            warn!(
                target = SOURCE,
                identifier,
                attempts = started.healing_attempts,
                "healing budget spent; entry failed"
            );
            return Some(HealingOutcome::Exhausted);
        }

        let mut tried = Vec::new();
        let mut outcome = self
            .heal_from_persistent(identifier, current.as_deref())
            .await;

        if outcome.is_none() {
            let untried: Vec<String> = {
                let entry = self.entries.get(identifier)?;
                self.candidates
                    .generate(identifier)
                    .into_iter()
                    .filter(|url| Some(url.as_str()) != current.as_deref())
                    .filter(|url| !entry.has_tried(url))
                    .collect()
            };
            for url in untried {
                tried.push(url.clone());
                if self.prober.test(&url, self.config.check_timeout).await {
                    outcome = Some(HealingOutcome::Healed {
                        url,
                        synthetic: false,
                    });
                    break;
                }
            }
        }

        if outcome.is_none() && self.config.synthetic_healing {
            let title = metadata.title.as_deref().unwrap_or(identifier);
            outcome = Some(HealingOutcome::Healed {
                url: self.fallback.data_uri(title, metadata.category.as_deref()),
                synthetic: true,
            });
        }

        let outcome = outcome.unwrap_or(HealingOutcome::Exhausted);
        let label = match &outcome {
            HealingOutcome::Healed {
                synthetic: false,
                url,
            } => {
                self.cache.set(identifier, url);
                "healed"
            }
            // the cached URL just failed its checks; never serve it again
            HealingOutcome::Healed {
                synthetic: true, ..
            } => {
                self.cache.remove(identifier);
                "synthetic"
            }
            HealingOutcome::Exhausted => {
                self.cache.remove(identifier);
                "exhausted"
            }
        };

        let finished = {
            let mut entry = self.entries.get_mut(identifier)?;
            entry.mark_tried(tried);
            entry.finish_healing(outcome.clone(), &policy);
            entry.snapshot()
        };

        counter!(METRIC_HEAL, "outcome" => label).increment(1);
        info!(
            target = SOURCE,
            identifier,
            outcome = label,
            attempts = finished.healing_attempts,
            status = %finished.status,
            "healing finished"
        );
        self.subscribers.publish(&finished);
        Some(outcome)
    }

    async fn heal_from_persistent(
        &self,
        identifier: &str,
        current: Option<&str>,
    ) -> Option<HealingOutcome> {
        let cached = self.cache.get_from(TierKind::Persistent, identifier)?;
        if Some(cached.url.as_str()) == current {
            return None;
        }
        if !self
            .prober
            .test(&cached.url, self.config.check_timeout)
            .await
        {
            return None;
        }
        Some(HealingOutcome::Healed {
            url: cached.url,
            synthetic: false,
        })
    }

    // ====================================================================
    // Scheduler
    // ====================================================================

    /// Spawn the periodic loop. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut task = mutex_lock(&self.task, "monitor", "start");
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let monitor = Arc::downgrade(self);
        let wake = self.wake.clone();
        let period = self.config.interval.max(Duration::from_millis(1));
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.run_cycle().await;
            }
        }));
        info!(
            target = SOURCE,
            interval_ms = period.as_millis() as u64,
            "health monitor started"
        );
    }

    pub fn stop(&self) {
        if let Some(handle) = mutex_lock(&self.task, "monitor", "stop").take() {
            handle.abort();
            info!(target = SOURCE, "health monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        mutex_lock(&self.task, "monitor", "is_running")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Pause checks while hidden; becoming visible runs a cycle right away.
    pub fn set_visible(&self, visible: bool) {
        let was_visible = self.visible.swap(visible, Ordering::AcqRel);
        if visible && !was_visible {
            debug!(target = SOURCE, "host visible; resuming checks");
            self.wake.notify_one();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}
