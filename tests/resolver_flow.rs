use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediaward::application::probe::ReachabilityStrategy;
use mediaward::application::resolver::{ResolveOptions, ResolverConfig};
use mediaward::application::service::{MediaService, ServiceConfig};
use mediaward::application::store::ObjectStore;
use mediaward::cache::{CacheConfig, LayeredCache};
use mediaward::domain::error::ProbeFailure;
use mediaward::domain::storage::StorageLayout;
use mediaward::domain::{PreloadSummary, ResolutionSource, StrategyKind};

const BASE: &str = "https://store.example";
const PUBLIC_A: &str = "https://store.example/storage/v1/object/public/images/covers/a.png";
const PLACEHOLDER: &str = "/static/images/placeholder.svg";

struct LayoutStore(Arc<StorageLayout>);

#[async_trait]
impl ObjectStore for LayoutStore {
    fn public_url(&self, path: &str) -> String {
        self.0.public_url(&self.0.address_for_key(path))
    }

    async fn head_or_probe(&self, _url: &str) -> bool {
        false
    }
}

/// Accepts exactly the URLs it has been told about.
struct KnownUrls {
    kind: StrategyKind,
    urls: Mutex<HashSet<String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl KnownUrls {
    fn new(kind: StrategyKind, urls: &[&str]) -> Arc<Self> {
        Self::delayed(kind, urls, Duration::ZERO)
    }

    fn delayed(kind: StrategyKind, urls: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            urls: Mutex::new(urls.iter().map(|url| url.to_string()).collect()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn deny(&self, url: &str) {
        self.urls.lock().expect("url set").remove(url);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityStrategy for KnownUrls {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn check(&self, url: &str, _timeout: Duration) -> Result<(), ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.urls.lock().expect("url set").contains(url) {
            Ok(())
        } else {
            Err(ProbeFailure::NotFoundOrExpired { status: 404 })
        }
    }
}

fn service(strategies: Vec<Arc<dyn ReachabilityStrategy>>) -> Arc<MediaService> {
    let layout = Arc::new(StorageLayout::new(BASE, "images").expect("valid layout"));
    let store: Arc<dyn ObjectStore> = Arc::new(LayoutStore(layout.clone()));
    let config = ServiceConfig {
        resolver: ResolverConfig {
            backoff_step: Duration::ZERO,
            preload_batch_delay: Duration::ZERO,
            ..ResolverConfig::default()
        },
        ..ServiceConfig::default()
    };
    let cache = Arc::new(LayeredCache::from_config(&CacheConfig::memory_only()));
    Arc::new(MediaService::new(config, store, layout, strategies, cache))
}

fn probes(service: &MediaService) -> u64 {
    service.resolver().prober().probes_issued()
}

#[tokio::test]
async fn reachable_public_url_resolves_on_first_try() {
    let cors = KnownUrls::new(StrategyKind::ImageCors, &[PUBLIC_A]);
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    let result = service.resolve(PUBLIC_A, ResolveOptions::default()).await;

    assert!(result.success);
    assert_eq!(result.source, ResolutionSource::Probe);
    assert_eq!(result.url, PUBLIC_A);
    assert_eq!(result.succeeded_strategy, Some(StrategyKind::ImageCors));
    assert_eq!(result.attempt_count, 1);
    assert_eq!(probes(&service), 1);
}

#[tokio::test]
async fn expired_signed_url_resolves_through_public_form() {
    let signed = "https://store.example/storage/v1/object/sign/images/covers/a.png?token=expired";
    let cors = KnownUrls::new(StrategyKind::ImageCors, &[]);
    let existence = KnownUrls::new(StrategyKind::Existence, &[PUBLIC_A]);
    let service = service(vec![
        cors as Arc<dyn ReachabilityStrategy>,
        existence.clone(),
    ]);

    let result = service.resolve(signed, ResolveOptions::default()).await;

    assert!(result.is_resolved());
    assert_eq!(result.url, PUBLIC_A);
    assert_eq!(result.succeeded_strategy, Some(StrategyKind::Existence));
    assert_eq!(existence.calls(), 1);
}

#[tokio::test]
async fn unreachable_identifier_falls_back_to_placeholder() {
    let cors = KnownUrls::new(StrategyKind::ImageCors, &[]);
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    let result = service
        .resolve("covers/missing.png", ResolveOptions::default())
        .await;

    assert!(result.success);
    assert!(!result.is_resolved());
    assert_eq!(result.source, ResolutionSource::Placeholder);
    assert_eq!(result.url, PLACEHOLDER);
    assert_eq!(result.attempt_count, 3);
    assert!(result.succeeded_strategy.is_none());
    assert!(service.get_cached("covers/missing.png").is_none());

    // public, http swap, legacy signed form; probed once per attempt
    assert_eq!(cors.calls(), 9);
}

#[tokio::test]
async fn titled_exhaustion_serves_a_stable_synthetic_image() {
    let service = service(vec![
        KnownUrls::new(StrategyKind::ImageCors, &[]) as Arc<dyn ReachabilityStrategy>,
    ]);
    let options = ResolveOptions::titled("Spring in Kyoto")
        .with_category("travel")
        .with_max_attempts(1);

    let first = service.resolve("covers/gone.png", options.clone()).await;
    let second = service.resolve("covers/gone.png", options).await;

    assert!(first.success);
    assert_eq!(first.source, ResolutionSource::Synthetic);
    assert_eq!(first.attempt_count, 1);
    assert!(first.url.starts_with("data:image/svg+xml;base64,"));
    assert_eq!(first.url, second.url);
}

#[tokio::test]
async fn cached_url_is_served_without_probing() {
    let cors = KnownUrls::new(StrategyKind::ImageCors, &[PUBLIC_A]);
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    let first = service.resolve("covers/a.png", ResolveOptions::default()).await;
    assert_eq!(first.source, ResolutionSource::Probe);
    let issued = probes(&service);

    assert_eq!(service.get_cached("covers/a.png").as_deref(), Some(PUBLIC_A));
    let second = service.resolve("covers/a.png", ResolveOptions::default()).await;

    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(second.url, first.url);
    assert_eq!(second.attempt_count, 0);
    assert_eq!(probes(&service), issued);
}

#[tokio::test]
async fn retry_ignores_the_cached_url() {
    let cors = KnownUrls::new(StrategyKind::ImageCors, &[PUBLIC_A]);
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    service.resolve("covers/a.png", ResolveOptions::default()).await;
    cors.deny(PUBLIC_A);
    let issued = probes(&service);

    let retried = service
        .retry("covers/a.png", ResolveOptions::default().with_max_attempts(1))
        .await;

    assert_eq!(retried.source, ResolutionSource::Placeholder);
    assert!(probes(&service) > issued);
    assert!(service.get_cached("covers/a.png").is_none());
}

#[tokio::test]
async fn empty_identifiers_settle_without_probing() {
    let service = service(vec![
        KnownUrls::new(StrategyKind::ImageCors, &[]) as Arc<dyn ReachabilityStrategy>,
    ]);

    for identifier in ["", "   "] {
        let result = service.resolve(identifier, ResolveOptions::default()).await;
        assert!(!result.success);
        assert_eq!(result.source, ResolutionSource::Unresolvable);
        assert_eq!(result.url, PLACEHOLDER);
        assert_eq!(result.attempt_count, 0);
    }
    assert_eq!(probes(&service), 0);
}

#[tokio::test]
async fn inline_data_is_returned_as_is() {
    let service = service(Vec::new());
    let data = "data:image/png;base64,iVBORw0KGgo=";

    let result = service.resolve(data, ResolveOptions::default()).await;

    assert_eq!(result.source, ResolutionSource::Probe);
    assert_eq!(result.succeeded_strategy, Some(StrategyKind::Inline));
    assert_eq!(result.url, data);
    assert!(service.get_cached(data).is_none());
}

#[tokio::test]
async fn preload_counts_only_real_urls() {
    let reachable = [
        "https://store.example/storage/v1/object/public/images/a.png",
        "https://store.example/storage/v1/object/public/images/b.png",
    ];
    let service = service(vec![
        KnownUrls::new(StrategyKind::ImageCors, &reachable) as Arc<dyn ReachabilityStrategy>,
    ]);

    let summary = service.preload(["a.png", "b.png", "c.png"]).await;

    assert_eq!(
        summary,
        PreloadSummary {
            success: 2,
            failed: 1
        }
    );
    assert_eq!(service.get_cached("a.png").as_deref(), Some(reachable[0]));
    assert!(service.get_cached("c.png").is_none());
}

#[tokio::test]
async fn concurrent_resolves_share_one_probe() {
    let cors = KnownUrls::delayed(
        StrategyKind::ImageCors,
        &[PUBLIC_A],
        Duration::from_millis(50),
    );
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    let (left, right) = tokio::join!(
        service.resolve("covers/a.png", ResolveOptions::default()),
        service.resolve("covers/a.png", ResolveOptions::default()),
    );

    assert_eq!(left, right);
    assert_eq!(left.url, PUBLIC_A);
    assert_eq!(cors.calls(), 1);
}

#[tokio::test]
async fn titled_resolve_joining_a_preload_keeps_its_synthetic_image() {
    let cors = KnownUrls::delayed(StrategyKind::ImageCors, &[], Duration::from_millis(20));
    let service = service(vec![cors.clone() as Arc<dyn ReachabilityStrategy>]);

    let (summary, titled) = tokio::join!(
        service.preload(["covers/missing.png"]),
        service.resolve("covers/missing.png", ResolveOptions::titled("Lost harbour")),
    );

    assert_eq!(
        summary,
        PreloadSummary {
            success: 0,
            failed: 1
        }
    );
    assert_eq!(titled.source, ResolutionSource::Synthetic);
    assert_eq!(
        titled.url,
        service.fallback("Lost harbour", None).to_data_uri()
    );
}

#[tokio::test]
async fn probe_results_are_registered_for_monitoring() {
    let service = service(vec![
        KnownUrls::new(StrategyKind::ImageCors, &[PUBLIC_A]) as Arc<dyn ReachabilityStrategy>,
    ]);

    service
        .resolve("covers/a.png", ResolveOptions::titled("Cover"))
        .await;
    service
        .resolve("covers/missing.png", ResolveOptions::default().with_max_attempts(1))
        .await;

    let snapshot = service
        .monitor()
        .snapshot("covers/a.png")
        .expect("auto-registered");
    assert_eq!(snapshot.url.as_deref(), Some(PUBLIC_A));
    assert_eq!(snapshot.metadata.title.as_deref(), Some("Cover"));
    assert!(!service.monitor().is_registered("covers/missing.png"));
    assert_eq!(service.get_health_stats().total, 1);
}
