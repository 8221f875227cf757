//! Health state machine for monitored identifiers.
//!
//! Successes decrement the error counter instead of resetting it, so an entry
//! that went `critical` has to pass through `warning` on its way back.

use std::collections::HashSet;
use std::time::Duration;

use time::OffsetDateTime;

use mediaward_types::{EntryMetadata, HealthSnapshot, HealthStatus};

/// Thresholds driving status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Error count at which an entry becomes `critical`.
    pub critical_threshold: u32,
    /// Ceiling for the error count; reaching it schedules healing.
    pub max_errors: u32,
    /// Healing attempts allowed before the entry is `failed` for good.
    pub max_healing_attempts: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            critical_threshold: 3,
            max_errors: 5,
            max_healing_attempts: 3,
        }
    }
}

/// Result of one healing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealingOutcome {
    Healed { url: String, synthetic: bool },
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct MonitoredEntry {
    pub identifier: String,
    pub url: Option<String>,
    pub status: HealthStatus,
    pub last_checked: Option<OffsetDateTime>,
    pub response_time: Option<Duration>,
    pub error_count: u32,
    pub success_count: u64,
    pub healing_attempts: u32,
    pub is_healing: bool,
    pub synthetic: bool,
    pub metadata: EntryMetadata,
    tried_urls: HashSet<String>,
}

impl MonitoredEntry {
    pub fn new(
        identifier: impl Into<String>,
        url: Option<String>,
        metadata: EntryMetadata,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            url,
            status: HealthStatus::Healthy,
            last_checked: None,
            response_time: None,
            error_count: 0,
            success_count: 0,
            healing_attempts: 0,
            is_healing: false,
            synthetic: false,
            metadata,
            tried_urls: HashSet::new(),
        }
    }

    /// Terminal entries are never probed or healed again.
    pub fn is_terminal(&self) -> bool {
        self.status == HealthStatus::Failed
    }

    pub fn record_success(&mut self, response_time: Duration, now: OffsetDateTime) {
        self.last_checked = Some(now);
        self.response_time = Some(response_time);
        self.success_count = self.success_count.saturating_add(1);
        self.error_count = self.error_count.saturating_sub(1);

        self.status = match self.status {
            HealthStatus::Healthy => HealthStatus::Healthy,
            HealthStatus::Warning if self.error_count == 0 => HealthStatus::Healthy,
            HealthStatus::Warning => HealthStatus::Warning,
            HealthStatus::Critical => HealthStatus::Warning,
            HealthStatus::Failed => HealthStatus::Failed,
        };
    }

    /// Returns `true` when the entry should be queued for healing.
    pub fn record_failure(&mut self, policy: &HealthPolicy, now: OffsetDateTime) -> bool {
        self.last_checked = Some(now);
        self.response_time = None;
        if let Some(url) = self.url.clone() {
            self.tried_urls.insert(url);
        }
        if self.is_terminal() {
            return false;
        }

        self.error_count = self.error_count.saturating_add(1).min(policy.max_errors);
        self.status = if self.error_count >= policy.critical_threshold {
            HealthStatus::Critical
        } else {
            HealthStatus::Warning
        };

        self.status == HealthStatus::Critical && self.error_count >= policy.max_errors
    }

    /// Claim one healing attempt. Returns `false` once the budget is spent, in
    /// which case the entry has been moved to `failed`.
    pub fn begin_healing(&mut self, policy: &HealthPolicy) -> bool {
        if self.is_terminal() {
            return false;
        }
        if self.healing_attempts >= policy.max_healing_attempts {
            self.status = HealthStatus::Failed;
            self.is_healing = false;
            return false;
        }
        self.healing_attempts += 1;
        self.is_healing = true;
        true
    }

    pub fn finish_healing(&mut self, outcome: HealingOutcome, policy: &HealthPolicy) {
        self.is_healing = false;
        match outcome {
            HealingOutcome::Healed { url, synthetic } => {
                self.url = Some(url);
                self.synthetic = synthetic;
                self.error_count = 1;
                self.status = HealthStatus::Warning;
            }
            HealingOutcome::Exhausted => {
                if self.healing_attempts >= policy.max_healing_attempts {
                    self.status = HealthStatus::Failed;
                }
            }
        }
    }

    pub fn has_tried(&self, url: &str) -> bool {
        self.tried_urls.contains(url)
    }

    pub fn mark_tried<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.tried_urls.extend(urls);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            identifier: self.identifier.clone(),
            url: self.url.clone(),
            status: self.status,
            last_checked: self.last_checked,
            response_time_ms: self
                .response_time
                .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
            error_count: self.error_count,
            success_count: self.success_count,
            healing_attempts: self.healing_attempts,
            is_healing: self.is_healing,
            synthetic: self.synthetic,
            metadata: self.metadata.clone(),
        }
    }
}
