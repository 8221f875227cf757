//! Injected entry point for pages and UI components.
//!
//! Owns the resolver, health monitor, and layered cache, and the two
//! background tasks: persistent-tier maintenance and the monitor loop. Both
//! start in [`MediaService::init`] and stop in [`MediaService::teardown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{LayeredCache, mutex_lock};
use crate::domain::storage::StorageLayout;
use crate::domain::{
    EntryMetadata, HealthSnapshot, HealthStats, PreloadSummary, ResolutionResult,
    ResolutionSource,
};

use super::candidates::CandidateGenerator;
use super::fallback::{FallbackConfig, SyntheticFallback, SyntheticImage};
use super::monitor::{HealthMonitor, MonitorConfig, Subscription};
use super::probe::{ReachabilityStrategy, StrategyProber};
use super::resolver::{ResolveOptions, Resolver, ResolverConfig};
use super::store::ObjectStore;

const SOURCE: &str = "mediaward::service";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub resolver: ResolverConfig,
    pub monitor: MonitorConfig,
    pub fallback: FallbackConfig,
    /// Run the periodic monitor loop after `init`.
    pub monitor_enabled: bool,
    /// Register identifiers with the monitor once they resolve to a real URL,
    /// whether probed or served from cache.
    pub auto_register: bool,
    pub maintenance_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            monitor: MonitorConfig::default(),
            fallback: FallbackConfig::default(),
            monitor_enabled: true,
            auto_register: true,
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

pub struct MediaService {
    config: ServiceConfig,
    resolver: Arc<Resolver>,
    monitor: Arc<HealthMonitor>,
    cache: Arc<LayeredCache>,
    fallback: Arc<SyntheticFallback>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl MediaService {
    /// Wire every component from its collaborators. Nothing runs until
    /// [`init`](Self::init).
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn ObjectStore>,
        layout: Arc<StorageLayout>,
        strategies: Vec<Arc<dyn ReachabilityStrategy>>,
        cache: Arc<LayeredCache>,
    ) -> Self {
        let candidates = Arc::new(CandidateGenerator::new(store, layout));
        let prober = Arc::new(StrategyProber::new(strategies));
        let fallback = Arc::new(SyntheticFallback::new(config.fallback.clone()));

        let resolver = Arc::new(Resolver::new(
            config.resolver.clone(),
            candidates.clone(),
            prober.clone(),
            cache.clone(),
            fallback.clone(),
        ));
        let monitor = Arc::new(HealthMonitor::new(
            config.monitor.clone(),
            prober,
            candidates,
            cache.clone(),
            fallback.clone(),
        ));

        Self {
            config,
            resolver,
            monitor,
            cache,
            fallback,
            maintenance: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn cache(&self) -> &Arc<LayeredCache> {
        &self.cache
    }

    /// Start background work. Idempotent.
    pub fn init(self: &Arc<Self>) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.cache.persistent().is_some() {
            let cache = Arc::downgrade(&self.cache);
            let period = self.config.maintenance_interval;
            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.tick().await; // first tick fires immediately
                loop {
                    interval.tick().await;
                    let Some(cache) = cache.upgrade() else {
                        break;
                    };
                    cache.maintain().await;
                }
            });
            *mutex_lock(&self.maintenance, "service", "init") = Some(handle);
        }

        if self.config.monitor_enabled {
            self.monitor.start();
        }
        info!(
            target = SOURCE,
            tiers = ?self.cache.tier_kinds(),
            monitor = self.config.monitor_enabled,
            "media service initialized"
        );
    }

    /// Stop background work and flush the persistent tier.
    pub async fn teardown(&self) {
        self.monitor.stop();
        let handle = mutex_lock(&self.maintenance, "service", "teardown").take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        self.cache.maintain().await;
        self.initialized.store(false, Ordering::Release);
        info!(target = SOURCE, "media service stopped");
    }

    // ====================================================================
    // Resolution
    // ====================================================================

    pub async fn resolve(&self, identifier: &str, options: ResolveOptions) -> ResolutionResult {
        let metadata = metadata_from(&options);
        let result = self.resolver.resolve(identifier, options).await;
        self.track(&result, metadata);
        result
    }

    pub async fn retry(&self, identifier: &str, options: ResolveOptions) -> ResolutionResult {
        let metadata = metadata_from(&options);
        let result = self.resolver.retry(identifier, options).await;
        self.track(&result, metadata);
        result
    }

    pub async fn preload<I, S>(&self, identifiers: I) -> PreloadSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolver.preload(identifiers).await
    }

    pub fn get_cached(&self, identifier: &str) -> Option<String> {
        self.resolver.get_cached(identifier)
    }

    pub fn fallback(&self, title: &str, category: Option<&str>) -> SyntheticImage {
        self.fallback.generate(title, category)
    }

    fn track(&self, result: &ResolutionResult, metadata: EntryMetadata) {
        let tracked = matches!(
            result.source,
            ResolutionSource::Probe | ResolutionSource::Cache
        );
        if !self.config.auto_register || !tracked {
            return;
        }
        if self
            .monitor
            .register(&result.identifier, Some(result.url.clone()), metadata)
        {
            debug!(
                target = SOURCE,
                identifier = %result.identifier,
                "auto-registered for monitoring"
            );
        }
    }

    // ====================================================================
    // Health
    // ====================================================================

    pub fn register(&self, identifier: &str, metadata: EntryMetadata) -> bool {
        self.monitor.register(identifier, None, metadata)
    }

    pub fn unregister(&self, identifier: &str) -> bool {
        self.monitor.unregister(identifier)
    }

    pub fn subscribe<F>(&self, identifier: &str, listener: F) -> Subscription
    where
        F: Fn(HealthSnapshot) + Send + Sync + 'static,
    {
        self.monitor.subscribe(identifier, Arc::new(listener))
    }

    pub fn get_health_stats(&self) -> HealthStats {
        self.monitor.stats()
    }

    pub fn set_visible(&self, visible: bool) {
        self.monitor.set_visible(visible);
    }
}

fn metadata_from(options: &ResolveOptions) -> EntryMetadata {
    EntryMetadata {
        title: options.title.clone(),
        category: options.category.clone(),
        ..EntryMetadata::default()
    }
}
