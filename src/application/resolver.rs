//! Identifier → displayable URL, with cache, retries, and a guaranteed answer.
//!
//! `resolve` never fails. It returns the cached URL, the first candidate a
//! strategy confirms, or, once every attempt is spent, a placeholder or a
//! synthetic image. Concurrent calls for one identifier share a single
//! in-flight resolution.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::cache::LayeredCache;
use crate::domain::{PreloadSummary, ResolutionResult, ResolutionSource, StrategyKind};

use super::candidates::CandidateGenerator;
use super::fallback::SyntheticFallback;
use super::probe::StrategyProber;

const SOURCE: &str = "mediaward::resolver";
const METRIC_RESOLVE: &str = "mediaward_resolve_total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub max_attempts: u32,
    pub timeout: Duration,
    /// Pause after attempt `n` is `backoff_step * n`.
    pub backoff_step: Duration,
    pub placeholder_url: String,
    pub preload_batch_size: usize,
    pub preload_batch_delay: Duration,
    pub preload_max_attempts: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(5),
            backoff_step: Duration::from_millis(500),
            placeholder_url: "/static/images/placeholder.svg".to_string(),
            preload_batch_size: 5,
            preload_batch_delay: Duration::from_millis(100),
            preload_max_attempts: 1,
        }
    }
}

/// Per-call overrides. Unset fields fall back to [`ResolverConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub bypass_cache: bool,
}

impl ResolveOptions {
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

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

type InFlight = Shared<BoxFuture<'static, ResolutionResult>>;

pub struct Resolver {
    config: ResolverConfig,
    candidates: Arc<CandidateGenerator>,
    prober: Arc<StrategyProber>,
    cache: Arc<LayeredCache>,
    fallback: Arc<SyntheticFallback>,
    in_flight: DashMap<String, InFlight>,
}

impl Resolver {
    pub fn new(
        config: ResolverConfig,
        candidates: Arc<CandidateGenerator>,
        prober: Arc<StrategyProber>,
        cache: Arc<LayeredCache>,
        fallback: Arc<SyntheticFallback>,
    ) -> Self {
        Self {
            config,
            candidates,
            prober,
            cache,
            fallback,
            in_flight: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<LayeredCache> {
        &self.cache
    }

    pub fn prober(&self) -> &Arc<StrategyProber> {
        &self.prober
    }

    pub fn get_cached(&self, identifier: &str) -> Option<String> {
        self.cache.get_url(identifier.trim())
    }

    pub async fn resolve(
        self: &Arc<Self>,
        identifier: &str,
        options: ResolveOptions,
    ) -> ResolutionResult {
        let key = identifier.trim();
        if key.is_empty() {
            return self.unresolvable(key);
        }

        if !options.bypass_cache
            && let Some(url) = self.cache.get_url(key)
        {
            counter!(METRIC_RESOLVE, "source" => ResolutionSource::Cache.as_str()).increment(1);
            return ResolutionResult {
                identifier: key.to_string(),
                url,
                succeeded_strategy: None,
                attempt_count: 0,
                success: true,
                source: ResolutionSource::Cache,
            };
        }

        // a joiner keeps its own title even when the leader had none
        let stand_in = options
            .title
            .clone()
            .map(|title| (title, options.category.clone()));
        let shared = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| {
                let this = Arc::clone(self);
                let owned = key.to_string();
                async move { this.resolve_uncached(&owned, &options).await }
                    .boxed()
                    .shared()
            })
            .clone();

        let mut result = shared.clone().await;
        self.in_flight.remove_if(key, |_, current| current.ptr_eq(&shared));
        if result.source == ResolutionSource::Placeholder
            && let Some((title, category)) = stand_in
        {
            result.url = self.fallback.data_uri(&title, category.as_deref());
            result.source = ResolutionSource::Synthetic;
        }
        result
    }

    /// Drop any cached URL and resolve again from scratch.
    pub async fn retry(
        self: &Arc<Self>,
        identifier: &str,
        options: ResolveOptions,
    ) -> ResolutionResult {
        self.cache.remove(identifier.trim());
        self.resolve(
            identifier,
            ResolveOptions {
                bypass_cache: true,
                ..options
            },
        )
        .await
    }

    /// Resolve in chunks with a pause between chunks. Only real URLs count
    /// as successes; placeholders count as failures.
    pub async fn preload<I, S>(self: &Arc<Self>, identifiers: I) -> PreloadSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers: Vec<String> = identifiers
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let chunk_size = self.config.preload_batch_size.max(1);
        let options = ResolveOptions {
            max_attempts: Some(self.config.preload_max_attempts.max(1)),
            ..ResolveOptions::default()
        };

        let mut summary = PreloadSummary::default();
        let chunk_count = identifiers.len().div_ceil(chunk_size);
        for (index, chunk) in identifiers.chunks(chunk_size).enumerate() {
            let results =
                join_all(chunk.iter().map(|id| self.resolve(id, options.clone()))).await;

            for result in results {
                if result.is_resolved() {
                    summary.success += 1;
                } else {
                    summary.failed += 1;
                }
            }

            if index + 1 < chunk_count && !self.config.preload_batch_delay.is_zero() {
                tokio::time::sleep(self.config.preload_batch_delay).await;
            }
        }

        info!(
            target = SOURCE,
            success = summary.success,
            failed = summary.failed,
            "preload finished"
        );
        summary
    }

    async fn resolve_uncached(
        &self,
        identifier: &str,
        options: &ResolveOptions,
    ) -> ResolutionResult {
        let candidates = self.candidates.generate(identifier);
        if candidates.is_empty() {
            return self.unresolvable(identifier);
        }

        let max_attempts = options
            .max_attempts
            .unwrap_or(self.config.max_attempts)
            .max(1);
        let timeout = options.timeout.unwrap_or(self.config.timeout);

        for attempt in 1..=max_attempts {
            for url in &candidates {
                let Ok(strategy) = self.prober.probe(url, timeout).await else {
                    continue;
                };

                if strategy != StrategyKind::Inline {
                    self.cache.set(identifier, url);
                }
                counter!(METRIC_RESOLVE, "source" => ResolutionSource::Probe.as_str()).increment(1);
                debug!(
                    target = SOURCE,
                    identifier,
                    url = %url,
                    strategy = %strategy,
                    attempt,
                    "resolved"
                );
                return ResolutionResult {
                    identifier: identifier.to_string(),
                    url: url.clone(),
                    succeeded_strategy: Some(strategy),
                    attempt_count: attempt,
                    success: true,
                    source: ResolutionSource::Probe,
                };
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.backoff_step.saturating_mul(attempt)).await;
            }
        }

        self.terminal(identifier, max_attempts, options)
    }

    fn terminal(
        &self,
        identifier: &str,
        attempts: u32,
        options: &ResolveOptions,
    ) -> ResolutionResult {
        let (url, source) = match options.title.as_deref() {
            Some(title) => (
                self.fallback.data_uri(title, options.category.as_deref()),
                ResolutionSource::Synthetic,
            ),
            None => (
                self.config.placeholder_url.clone(),
                ResolutionSource::Placeholder,
            ),
        };

        counter!(METRIC_RESOLVE, "source" => source.as_str()).increment(1);
        warn!(
            target = SOURCE,
            identifier,
            attempts,
            source = source.as_str(),
            "candidates exhausted; serving stand-in"
        );
        ResolutionResult {
            identifier: identifier.to_string(),
            url,
            succeeded_strategy: None,
            attempt_count: attempts,
            success: true,
            source,
        }
    }

    fn unresolvable(&self, identifier: &str) -> ResolutionResult {
        counter!(METRIC_RESOLVE, "source" => ResolutionSource::Unresolvable.as_str()).increment(1);
        ResolutionResult {
            identifier: identifier.to_string(),
            url: self.config.placeholder_url.clone(),
            succeeded_strategy: None,
            attempt_count: 0,
            success: false,
            source: ResolutionSource::Unresolvable,
        }
    }
}
