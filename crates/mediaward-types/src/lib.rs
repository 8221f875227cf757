//! Result and diagnostics types shared with the pages that render stored images.
//!
//! Everything here is plain data: the resolution layer produces these values and
//! consumers only read them. Snapshots are owned copies, so holding on to one never
//! pins or mutates the monitor's internal state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Reachability technique that confirmed a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Full image fetch carrying an `Origin` header with credentials.
    ImageCors,
    /// Full image fetch without cross-origin checks.
    ImagePlain,
    /// HEAD-style existence probe delegated to the object store.
    Existence,
    /// Linear-backoff retries of the credentialed image fetch.
    ImageRetry,
    /// Inline `data:` URI, reachable by construction.
    Inline,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 4] = [
        StrategyKind::ImageCors,
        StrategyKind::ImagePlain,
        StrategyKind::Existence,
        StrategyKind::ImageRetry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::ImageCors => "image_cors",
            StrategyKind::ImagePlain => "image_plain",
            StrategyKind::Existence => "existence",
            StrategyKind::ImageRetry => "image_retry",
            StrategyKind::Inline => "inline",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image_cors" => Ok(StrategyKind::ImageCors),
            "image_plain" => Ok(StrategyKind::ImagePlain),
            "existence" => Ok(StrategyKind::Existence),
            "image_retry" => Ok(StrategyKind::ImageRetry),
            "inline" => Ok(StrategyKind::Inline),
            other => Err(format!("unknown strategy `{other}`")),
        }
    }
}

/// Why a probe did not confirm a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Cors,
    Timeout,
    NotFoundOrExpired,
    Exhausted,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Cors => "cors",
            FailureKind::Timeout => "timeout",
            FailureKind::NotFoundOrExpired => "not_found_or_expired",
            FailureKind::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the URL of a [`ResolutionResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Served from one of the cache tiers without probing.
    Cache,
    /// A candidate URL passed a reachability strategy.
    Probe,
    /// Static default asset used after exhaustion.
    Placeholder,
    /// Generated image used after exhaustion.
    Synthetic,
    /// Nothing to resolve (empty identifier).
    Unresolvable,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cache",
            ResolutionSource::Probe => "probe",
            ResolutionSource::Placeholder => "placeholder",
            ResolutionSource::Synthetic => "synthetic",
            ResolutionSource::Unresolvable => "unresolvable",
        }
    }
}

/// Outcome of one `resolve` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub identifier: String,
    pub url: String,
    pub succeeded_strategy: Option<StrategyKind>,
    pub attempt_count: u32,
    /// True whenever `url` is safe to render, including placeholder and synthetic images.
    pub success: bool,
    pub source: ResolutionSource,
}

impl ResolutionResult {
    /// True when `url` points at the real resource rather than a stand-in.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self.source,
            ResolutionSource::Cache | ResolutionSource::Probe
        )
    }
}

/// Aggregated outcome of a batched preload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadSummary {
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Failed,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied context attached to a monitored identifier.
///
/// `title` and `category` feed the synthetic fallback when healing runs out of
/// real URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl EntryMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Read-only copy of a monitored entry, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub identifier: String,
    pub url: Option<String>,
    pub status: HealthStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checked: Option<OffsetDateTime>,
    pub response_time_ms: Option<u64>,
    pub error_count: u32,
    pub success_count: u64,
    pub healing_attempts: u32,
    pub is_healing: bool,
    /// Set once healing substituted a generated image for the real resource.
    pub synthetic: bool,
    pub metadata: EntryMetadata,
}

/// Aggregate diagnostics over every monitored entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStats {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub failed: usize,
    pub healing_queue_size: usize,
}
