//! Runtime wiring from validated settings.

use std::sync::Arc;

use tracing::info;

use crate::application::error::AppError;
use crate::application::fallback::FallbackConfig;
use crate::application::monitor::MonitorConfig;
use crate::application::service::{MediaService, ServiceConfig};
use crate::application::resolver::ResolverConfig;
use crate::application::store::ObjectStore;
use crate::cache::{CacheConfig, LayeredCache};
use crate::config::{FallbackSettings, Settings, StorageSettings};
use crate::domain::health::HealthPolicy;
use crate::domain::storage::StorageLayout;

use super::error::InfraError;
use super::probe::build_strategies;
use super::storage::{HttpObjectStore, build_client};

const SOURCE: &str = "mediaward::bootstrap";

impl From<&FallbackSettings> for FallbackConfig {
    fn from(settings: &FallbackSettings) -> Self {
        Self {
            width: settings.width.get(),
            height: settings.height.get(),
            brand: settings.brand.clone(),
        }
    }
}

impl From<&Settings> for ServiceConfig {
    fn from(settings: &Settings) -> Self {
        let resolver = ResolverConfig {
            max_attempts: settings.resolver.max_attempts.get(),
            timeout: settings.probe.timeout,
            backoff_step: settings.resolver.backoff_step,
            placeholder_url: settings.resolver.placeholder_url.clone(),
            preload_batch_size: settings.resolver.preload_batch_size.get() as usize,
            preload_batch_delay: settings.resolver.preload_batch_delay,
            preload_max_attempts: settings.resolver.preload_max_attempts.get(),
        };

        let monitor = MonitorConfig {
            interval: settings.monitor.interval,
            batch_size: settings.monitor.batch_size.get() as usize,
            batch_delay: settings.monitor.batch_delay,
            check_timeout: settings.monitor.check_timeout,
            policy: HealthPolicy {
                critical_threshold: settings.monitor.critical_threshold.get(),
                max_errors: settings.monitor.max_errors.get(),
                max_healing_attempts: settings.monitor.max_healing_attempts.get(),
            },
            healing_batch: settings.monitor.healing_batch.get() as usize,
            synthetic_healing: settings.monitor.synthetic_healing,
        };

        Self {
            resolver,
            monitor,
            fallback: FallbackConfig::from(&settings.fallback),
            monitor_enabled: settings.monitor.enabled,
            auto_register: settings.resolver.auto_register,
            maintenance_interval: std::time::Duration::from_millis(
                settings.cache.maintenance_interval_ms,
            ),
        }
    }
}

/// Object store layout from the storage section; the base URL is mandatory.
pub fn storage_layout(storage: &StorageSettings) -> Result<StorageLayout, AppError> {
    let base = storage.public_base_url.as_deref().ok_or_else(|| {
        InfraError::configuration(
            "storage.public_base_url is required (set MEDIAWARD__STORAGE__PUBLIC_BASE_URL \
             or --storage-base-url)",
        )
    })?;

    let layout = StorageLayout::new(base, &storage.bucket)?
        .with_paths(&storage.public_path, &storage.sign_path)?
        .with_alternates(&storage.alternate_bases, &storage.alternate_buckets)?;
    Ok(layout)
}

/// Build the media service and every collaborator it needs. Background work
/// starts only when the caller invokes `init`.
pub fn build_service(settings: &Settings) -> Result<Arc<MediaService>, AppError> {
    let layout = Arc::new(storage_layout(&settings.storage)?);
    let client = build_client(settings.storage.request_timeout)
        .map_err(|err| InfraError::http(err.to_string()))?;

    let store: Arc<dyn ObjectStore> =
        Arc::new(HttpObjectStore::new(client.clone(), layout.clone()));
    let strategies = build_strategies(
        &settings.probe,
        settings.storage.site_origin.clone(),
        client,
        store.clone(),
    );

    let cache = Arc::new(LayeredCache::from_config(&CacheConfig::from(
        &settings.cache,
    )));

    info!(
        target = SOURCE,
        base = layout.base(),
        bucket = layout.bucket(),
        strategies = ?settings.probe.strategies,
        "media service configured"
    );

    Ok(Arc::new(MediaService::new(
        ServiceConfig::from(settings),
        store,
        layout,
        strategies,
        cache,
    )))
}
