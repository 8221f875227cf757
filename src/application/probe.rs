//! Ordered reachability strategies for a single URL.
//!
//! The prober runs its strategies one after another and stops at the first
//! success. Every strategy runs under its own deadline; when the deadline
//! passes the strategy future is dropped, which abandons the in-flight
//! request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use tracing::debug;

use crate::domain::StrategyKind;
use crate::domain::error::ProbeFailure;

use super::store::ObjectStore;

const SOURCE: &str = "mediaward::probe";
const METRIC_PROBE_MS: &str = "mediaward_probe_ms";

#[async_trait]
pub trait ReachabilityStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Wall-clock budget for one `check` given the per-request timeout.
    fn budget(&self, timeout: Duration) -> Duration {
        timeout
    }

    async fn check(&self, url: &str, timeout: Duration) -> Result<(), ProbeFailure>;
}

pub struct StrategyProber {
    strategies: Vec<Arc<dyn ReachabilityStrategy>>,
    issued: AtomicU64,
}

impl StrategyProber {
    pub fn new(strategies: Vec<Arc<dyn ReachabilityStrategy>>) -> Self {
        Self {
            strategies,
            issued: AtomicU64::new(0),
        }
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Number of strategy checks started since construction.
    pub fn probes_issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Boolean form of [`probe`](Self::probe). Never fails.
    pub async fn test(&self, url: &str, timeout: Duration) -> bool {
        self.probe(url, timeout).await.is_ok()
    }

    /// Run the strategies in order; return the first that succeeds or the
    /// last failure.
    pub async fn probe(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<StrategyKind, ProbeFailure> {
        if url.starts_with("data:") {
            return Ok(StrategyKind::Inline);
        }

        let mut last = ProbeFailure::Exhausted;
        for strategy in &self.strategies {
            match self.run(strategy.as_ref(), url, timeout).await {
                Ok(()) => return Ok(strategy.kind()),
                Err(failure) => {
                    debug!(
                        target = SOURCE,
                        url,
                        strategy = %strategy.kind(),
                        kind = failure.kind().as_str(),
                        error = %failure,
                        "strategy failed"
                    );
                    last = failure;
                }
            }
        }
        Err(last)
    }

    async fn run(
        &self,
        strategy: &dyn ReachabilityStrategy,
        url: &str,
        timeout: Duration,
    ) -> Result<(), ProbeFailure> {
        self.issued.fetch_add(1, Ordering::Relaxed);
        let budget = strategy.budget(timeout);
        let started = Instant::now();

        let outcome = match tokio::time::timeout(budget, strategy.check(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(budget)),
        };

        histogram!(METRIC_PROBE_MS, "strategy" => strategy.kind().as_str())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        outcome
    }
}

/// Lightweight existence check delegated to the object store.
pub struct ExistenceStrategy {
    store: Arc<dyn ObjectStore>,
}

impl ExistenceStrategy {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReachabilityStrategy for ExistenceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Existence
    }

    async fn check(&self, url: &str, _timeout: Duration) -> Result<(), ProbeFailure> {
        if self.store.head_or_probe(url).await {
            Ok(())
        } else {
            Err(ProbeFailure::Network("existence probe rejected".to_string()))
        }
    }
}

/// Bounded linear-backoff retry around another strategy.
pub struct RetryStrategy {
    inner: Arc<dyn ReachabilityStrategy>,
    attempts: u32,
    step: Duration,
}

impl RetryStrategy {
    pub fn new(inner: Arc<dyn ReachabilityStrategy>, attempts: u32, step: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            step,
        }
    }
}

#[async_trait]
impl ReachabilityStrategy for RetryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageRetry
    }

    fn budget(&self, timeout: Duration) -> Duration {
        let pauses: u32 = (1..self.attempts).sum();
        timeout.saturating_mul(self.attempts) + self.step.saturating_mul(pauses)
    }

    async fn check(&self, url: &str, timeout: Duration) -> Result<(), ProbeFailure> {
        let mut last = ProbeFailure::Exhausted;
        for attempt in 1..=self.attempts {
            let check = self.inner.check(url, timeout);
            let outcome = match tokio::time::timeout(timeout, check).await {
                Ok(result) => result,
                Err(_) => Err(ProbeFailure::Timeout(timeout)),
            };
            match outcome {
                Ok(()) => return Ok(()),
                // Missing objects do not come back on retry.
                Err(failure @ ProbeFailure::NotFoundOrExpired { .. }) => return Err(failure),
                Err(failure) => last = failure,
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.step.saturating_mul(attempt)).await;
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct Scripted {
        kind: StrategyKind,
        outcomes: Mutex<VecDeque<Result<(), ProbeFailure>>>,
        calls: AtomicU64,
    }

    impl Scripted {
        fn new(kind: StrategyKind, outcomes: Vec<Result<(), ProbeFailure>>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl ReachabilityStrategy for Scripted {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn check(&self, _url: &str, _timeout: Duration) -> Result<(), ProbeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or(Err(ProbeFailure::Network("script exhausted".to_string())))
        }
    }

    struct Stall;

    #[async_trait]
    impl ReachabilityStrategy for Stall {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Existence
        }

        async fn check(&self, _url: &str, _timeout: Duration) -> Result<(), ProbeFailure> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn first_success_short_circuits() {
        let cors = Scripted::new(StrategyKind::ImageCors, vec![Ok(())]);
        let plain = Scripted::new(StrategyKind::ImagePlain, vec![Ok(())]);
        let prober = StrategyProber::new(vec![
            cors.clone() as Arc<dyn ReachabilityStrategy>,
            plain.clone(),
        ]);

        let winner = prober.probe("https://x/a.png", TIMEOUT).await;
        assert_eq!(winner, Ok(StrategyKind::ImageCors));
        assert_eq!(plain.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prober.probes_issued(), 1);
    }

    #[tokio::test]
    async fn falls_through_to_later_strategies() {
        let cors = Scripted::new(
            StrategyKind::ImageCors,
            vec![Err(ProbeFailure::Cors("no allow-origin".to_string()))],
        );
        let plain = Scripted::new(StrategyKind::ImagePlain, vec![Ok(())]);
        let prober = StrategyProber::new(vec![cors as Arc<dyn ReachabilityStrategy>, plain]);

        assert_eq!(
            prober.probe("https://x/a.png", TIMEOUT).await,
            Ok(StrategyKind::ImagePlain)
        );
        assert_eq!(prober.probes_issued(), 2);
    }

    #[tokio::test]
    async fn inline_data_needs_no_strategy() {
        let prober = StrategyProber::new(Vec::new());
        assert_eq!(
            prober.probe("data:image/png;base64,AAAA", TIMEOUT).await,
            Ok(StrategyKind::Inline)
        );
        assert_eq!(prober.probes_issued(), 0);
    }

    #[tokio::test]
    async fn no_strategies_means_exhausted() {
        let prober = StrategyProber::new(Vec::new());
        assert_eq!(
            prober.probe("https://x/a.png", TIMEOUT).await,
            Err(ProbeFailure::Exhausted)
        );
        assert!(!prober.test("https://x/a.png", TIMEOUT).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_strategies_time_out() {
        let prober = StrategyProber::new(vec![Arc::new(Stall) as Arc<dyn ReachabilityStrategy>]);
        assert_eq!(
            prober.probe("https://x/a.png", TIMEOUT).await,
            Err(ProbeFailure::Timeout(TIMEOUT))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backs_off_linearly() {
        let inner = Scripted::new(
            StrategyKind::ImageCors,
            vec![
                Err(ProbeFailure::Network("reset".to_string())),
                Err(ProbeFailure::Network("reset".to_string())),
                Ok(()),
            ],
        );
        let retry = RetryStrategy::new(inner.clone(), 3, Duration::from_millis(100));

        let started = tokio::time::Instant::now();
        assert_eq!(retry.check("https://x/a.png", TIMEOUT).await, Ok(()));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(300), "waited {waited:?}");
        assert!(waited < Duration::from_millis(400), "waited {waited:?}");
    }

    #[tokio::test]
    async fn retry_gives_up_on_missing_objects() {
        let inner = Scripted::new(
            StrategyKind::ImageCors,
            vec![Err(ProbeFailure::NotFoundOrExpired { status: 404 }), Ok(())],
        );
        let retry = RetryStrategy::new(inner.clone(), 3, Duration::from_millis(10));

        assert_eq!(
            retry.check("https://x/a.png", TIMEOUT).await,
            Err(ProbeFailure::NotFoundOrExpired { status: 404 })
        );
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_budget_covers_attempts_and_pauses() {
        let inner = Scripted::new(StrategyKind::ImageCors, Vec::new());
        let retry = RetryStrategy::new(inner, 3, Duration::from_millis(100));
        assert_eq!(retry.budget(TIMEOUT), Duration::from_millis(1_800));
    }

    struct Listing(Vec<&'static str>);

    #[async_trait]
    impl ObjectStore for Listing {
        fn public_url(&self, path: &str) -> String {
            format!("https://x/{path}")
        }

        async fn head_or_probe(&self, url: &str) -> bool {
            self.0.iter().any(|known| *known == url)
        }
    }

    #[tokio::test]
    async fn existence_strategy_asks_the_store() {
        let strategy = ExistenceStrategy::new(Arc::new(Listing(vec!["https://x/a.png"])));
        assert_eq!(strategy.kind(), StrategyKind::Existence);
        assert_eq!(strategy.check("https://x/a.png", TIMEOUT).await, Ok(()));
        assert!(strategy.check("https://x/b.png", TIMEOUT).await.is_err());
    }
}
