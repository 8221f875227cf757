//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::fallback::{MAX_DIMENSION, MIN_DIMENSION};
use crate::domain::StrategyKind;

pub use cli::{
    CliArgs, Command, FallbackArgs, GlobalOverrides, PreloadArgs, ResolveArgs, WatchArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mediaward";
const ENV_PREFIX: &str = "MEDIAWARD";

const DEFAULT_BUCKET: &str = "images";
const DEFAULT_PUBLIC_PATH: &str = "storage/v1/object/public";
const DEFAULT_SIGN_PATH: &str = "storage/v1/object/sign";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROBE_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_PROBE_RETRY_STEP_MS: u64 = 250;
const DEFAULT_PROBE_SNIFF_BYTES: usize = 512;

const DEFAULT_RESOLVER_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RESOLVER_BACKOFF_MS: u64 = 500;
const DEFAULT_PLACEHOLDER_URL: &str = "/static/images/placeholder.svg";
const DEFAULT_PRELOAD_BATCH_SIZE: u32 = 5;
const DEFAULT_PRELOAD_BATCH_DELAY_MS: u64 = 100;
const DEFAULT_PRELOAD_MAX_ATTEMPTS: u32 = 1;

const DEFAULT_CACHE_MEMORY_LIMIT: usize = 500;
const DEFAULT_CACHE_PERSISTENT_PATH: &str = "mediaward-cache.json";
const DEFAULT_CACHE_PERSISTENT_MAX_ENTRIES: usize = 100;
const DEFAULT_CACHE_NETWORK_LIMIT: usize = 200;
const DEFAULT_CACHE_NETWORK_MAX_AGE_MS: u64 = 60 * 60 * 1000;
const DEFAULT_CACHE_MAINTENANCE_INTERVAL_MS: u64 = 60_000;

const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;
const DEFAULT_MONITOR_BATCH_SIZE: u32 = 5;
const DEFAULT_MONITOR_BATCH_DELAY_MS: u64 = 100;
const DEFAULT_MONITOR_CHECK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MONITOR_CRITICAL_THRESHOLD: u32 = 3;
const DEFAULT_MONITOR_MAX_ERRORS: u32 = 5;
const DEFAULT_MONITOR_MAX_HEALING_ATTEMPTS: u32 = 3;
const DEFAULT_MONITOR_HEALING_BATCH: u32 = 3;

const DEFAULT_FALLBACK_WIDTH: u32 = 800;
const DEFAULT_FALLBACK_HEIGHT: u32 = 450;
const DEFAULT_FALLBACK_BRAND: &str = "mediaward";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub probe: ProbeSettings,
    pub resolver: ResolverSettings,
    pub cache: CacheSettings,
    pub monitor: MonitorSettings,
    pub fallback: FallbackSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Required by every command that touches the network.
    pub public_base_url: Option<String>,
    pub bucket: String,
    pub public_path: String,
    pub sign_path: String,
    pub alternate_bases: Vec<String>,
    pub alternate_buckets: Vec<String>,
    /// Origin sent by the cross-origin image strategy.
    pub site_origin: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub strategies: Vec<StrategyKind>,
    pub timeout: Duration,
    pub retry_attempts: NonZeroU32,
    pub retry_step: Duration,
    pub sniff_bytes: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub max_attempts: NonZeroU32,
    pub backoff_step: Duration,
    pub placeholder_url: String,
    pub preload_batch_size: NonZeroU32,
    pub preload_batch_delay: Duration,
    pub preload_max_attempts: NonZeroU32,
    pub auto_register: bool,
}

/// Plain values; `cache::CacheConfig` is built from these.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_memory_tier: bool,
    pub memory_limit: usize,
    pub enable_persistent_tier: bool,
    pub persistent_path: PathBuf,
    pub persistent_max_entries: usize,
    pub enable_network_tier: bool,
    pub network_limit: usize,
    pub network_max_age_ms: u64,
    pub maintenance_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub batch_size: NonZeroU32,
    pub batch_delay: Duration,
    pub check_timeout: Duration,
    pub critical_threshold: NonZeroU32,
    pub max_errors: NonZeroU32,
    pub max_healing_attempts: NonZeroU32,
    pub healing_batch: NonZeroU32,
    pub synthetic_healing: bool,
}

#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
    pub brand: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("probe.strategies")
            .with_list_parse_key("storage.alternate_bases")
            .with_list_parse_key("storage.alternate_buckets")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides);
    if let Some(Command::Watch(args)) = cli.command.as_ref() {
        raw.apply_watch_overrides(args);
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    storage: RawStorageSettings,
    probe: RawProbeSettings,
    resolver: RawResolverSettings,
    cache: RawCacheSettings,
    monitor: RawMonitorSettings,
    fallback: RawFallbackSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.storage_base_url.as_ref() {
            self.storage.public_base_url = Some(url.clone());
        }
        if let Some(bucket) = overrides.storage_bucket.as_ref() {
            self.storage.bucket = Some(bucket.clone());
        }
        if let Some(path) = overrides.cache_path.as_ref() {
            self.cache.persistent_path = Some(path.clone());
        }
        if let Some(enabled) = overrides.cache_persistent {
            self.cache.enable_persistent_tier = Some(enabled);
        }
        if let Some(timeout) = overrides.probe_timeout_ms {
            self.probe.timeout_ms = Some(timeout);
        }
    }

    fn apply_watch_overrides(&mut self, args: &WatchArgs) {
        if let Some(seconds) = args.interval_seconds {
            self.monitor.interval_secs = Some(seconds);
        }
        self.monitor.enabled = Some(true);
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            storage,
            probe,
            resolver,
            cache,
            monitor,
            fallback,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let storage = build_storage_settings(storage)?;
        let probe = build_probe_settings(probe)?;
        let resolver = build_resolver_settings(resolver)?;
        let cache = build_cache_settings(cache)?;
        let monitor = build_monitor_settings(monitor)?;
        let fallback = build_fallback_settings(fallback)?;

        Ok(Self {
            logging,
            storage,
            probe,
            resolver,
            cache,
            monitor,
            fallback,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let public_base_url = non_blank(storage.public_base_url);
    if let Some(base) = public_base_url.as_deref() {
        check_http_url(base, "storage.public_base_url")?;
    }

    let bucket = non_blank(storage.bucket).unwrap_or_else(|| DEFAULT_BUCKET.to_string());
    if bucket.contains('/') {
        return Err(LoadError::invalid(
            "storage.bucket",
            "bucket name must not contain `/`",
        ));
    }

    let public_path =
        non_blank(storage.public_path).unwrap_or_else(|| DEFAULT_PUBLIC_PATH.to_string());
    let sign_path = non_blank(storage.sign_path).unwrap_or_else(|| DEFAULT_SIGN_PATH.to_string());
    if public_path.trim_matches('/') == sign_path.trim_matches('/') {
        return Err(LoadError::invalid(
            "storage.sign_path",
            "must differ from storage.public_path",
        ));
    }

    let alternate_bases: Vec<String> = storage
        .alternate_bases
        .unwrap_or_default()
        .into_iter()
        .filter_map(|base| non_blank(Some(base)))
        .collect();
    for base in &alternate_bases {
        check_http_url(base, "storage.alternate_bases")?;
    }
    let alternate_buckets = storage
        .alternate_buckets
        .unwrap_or_default()
        .into_iter()
        .filter_map(|bucket| non_blank(Some(bucket)))
        .collect();

    let request_timeout = positive_millis(
        storage.request_timeout_ms,
        DEFAULT_REQUEST_TIMEOUT_MS,
        "storage.request_timeout_ms",
    )?;

    Ok(StorageSettings {
        public_base_url,
        bucket,
        public_path,
        sign_path,
        alternate_bases,
        alternate_buckets,
        site_origin: non_blank(storage.site_origin),
        request_timeout,
    })
}

fn build_probe_settings(probe: RawProbeSettings) -> Result<ProbeSettings, LoadError> {
    let strategies = match probe.strategies {
        Some(names) => {
            let mut parsed = Vec::with_capacity(names.len());
            for name in names {
                let kind = StrategyKind::from_str(name.trim())
                    .map_err(|reason| LoadError::invalid("probe.strategies", reason))?;
                if kind == StrategyKind::Inline {
                    return Err(LoadError::invalid(
                        "probe.strategies",
                        "`inline` is implicit and cannot be configured",
                    ));
                }
                if parsed.contains(&kind) {
                    return Err(LoadError::invalid(
                        "probe.strategies",
                        format!("`{kind}` is listed twice"),
                    ));
                }
                parsed.push(kind);
            }
            if parsed.is_empty() {
                return Err(LoadError::invalid(
                    "probe.strategies",
                    "at least one strategy is required",
                ));
            }
            parsed
        }
        None => StrategyKind::DEFAULT_ORDER.to_vec(),
    };

    let timeout = positive_millis(probe.timeout_ms, DEFAULT_PROBE_TIMEOUT_MS, "probe.timeout_ms")?;
    let retry_attempts = non_zero_u32(
        probe
            .retry_attempts
            .unwrap_or(DEFAULT_PROBE_RETRY_ATTEMPTS)
            .into(),
        "probe.retry_attempts",
    )?;
    let retry_step = Duration::from_millis(
        probe
            .retry_step_ms
            .unwrap_or(DEFAULT_PROBE_RETRY_STEP_MS),
    );
    let sniff_bytes = NonZeroUsize::new(probe.sniff_bytes.unwrap_or(DEFAULT_PROBE_SNIFF_BYTES))
        .ok_or_else(|| LoadError::invalid("probe.sniff_bytes", "must be greater than zero"))?;

    Ok(ProbeSettings {
        strategies,
        timeout,
        retry_attempts,
        retry_step,
        sniff_bytes,
    })
}

fn build_resolver_settings(resolver: RawResolverSettings) -> Result<ResolverSettings, LoadError> {
    let max_attempts = non_zero_u32(
        resolver
            .max_attempts
            .unwrap_or(DEFAULT_RESOLVER_MAX_ATTEMPTS)
            .into(),
        "resolver.max_attempts",
    )?;
    let placeholder_url = non_blank(resolver.placeholder_url)
        .unwrap_or_else(|| DEFAULT_PLACEHOLDER_URL.to_string());
    let preload_batch_size = non_zero_u32(
        resolver
            .preload_batch_size
            .unwrap_or(DEFAULT_PRELOAD_BATCH_SIZE)
            .into(),
        "resolver.preload_batch_size",
    )?;
    let preload_max_attempts = non_zero_u32(
        resolver
            .preload_max_attempts
            .unwrap_or(DEFAULT_PRELOAD_MAX_ATTEMPTS)
            .into(),
        "resolver.preload_max_attempts",
    )?;

    Ok(ResolverSettings {
        max_attempts,
        backoff_step: Duration::from_millis(
            resolver.backoff_ms.unwrap_or(DEFAULT_RESOLVER_BACKOFF_MS),
        ),
        placeholder_url,
        preload_batch_size,
        preload_batch_delay: Duration::from_millis(
            resolver
                .preload_batch_delay_ms
                .unwrap_or(DEFAULT_PRELOAD_BATCH_DELAY_MS),
        ),
        preload_max_attempts,
        auto_register: resolver.auto_register.unwrap_or(true),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let memory_limit = cache.memory_limit.unwrap_or(DEFAULT_CACHE_MEMORY_LIMIT);
    if memory_limit == 0 {
        return Err(LoadError::invalid(
            "cache.memory_limit",
            "must be greater than zero",
        ));
    }

    let persistent_path = cache
        .persistent_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PERSISTENT_PATH));
    if persistent_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.persistent_path",
            "path must not be empty",
        ));
    }

    let persistent_max_entries = cache
        .persistent_max_entries
        .unwrap_or(DEFAULT_CACHE_PERSISTENT_MAX_ENTRIES);
    if persistent_max_entries == 0 {
        return Err(LoadError::invalid(
            "cache.persistent_max_entries",
            "must be greater than zero",
        ));
    }

    let network_limit = cache.network_limit.unwrap_or(DEFAULT_CACHE_NETWORK_LIMIT);
    if network_limit == 0 {
        return Err(LoadError::invalid(
            "cache.network_limit",
            "must be greater than zero",
        ));
    }

    let maintenance_interval_ms = cache
        .maintenance_interval_ms
        .unwrap_or(DEFAULT_CACHE_MAINTENANCE_INTERVAL_MS);
    if maintenance_interval_ms < 1_000 {
        return Err(LoadError::invalid(
            "cache.maintenance_interval_ms",
            "must be at least 1000",
        ));
    }

    Ok(CacheSettings {
        enable_memory_tier: cache.enable_memory_tier.unwrap_or(true),
        memory_limit,
        enable_persistent_tier: cache.enable_persistent_tier.unwrap_or(true),
        persistent_path,
        persistent_max_entries,
        enable_network_tier: cache.enable_network_tier.unwrap_or(true),
        network_limit,
        network_max_age_ms: cache
            .network_max_age_ms
            .unwrap_or(DEFAULT_CACHE_NETWORK_MAX_AGE_MS),
        maintenance_interval_ms,
    })
}

fn build_monitor_settings(monitor: RawMonitorSettings) -> Result<MonitorSettings, LoadError> {
    let interval_secs = monitor
        .interval_secs
        .unwrap_or(DEFAULT_MONITOR_INTERVAL_SECS);
    if interval_secs == 0 {
        return Err(LoadError::invalid(
            "monitor.interval_secs",
            "must be greater than zero",
        ));
    }

    let critical_threshold = non_zero_u32(
        monitor
            .critical_threshold
            .unwrap_or(DEFAULT_MONITOR_CRITICAL_THRESHOLD)
            .into(),
        "monitor.critical_threshold",
    )?;
    let max_errors = non_zero_u32(
        monitor
            .max_errors
            .unwrap_or(DEFAULT_MONITOR_MAX_ERRORS)
            .into(),
        "monitor.max_errors",
    )?;
    if critical_threshold > max_errors {
        return Err(LoadError::invalid(
            "monitor.critical_threshold",
            "must not exceed monitor.max_errors",
        ));
    }

    Ok(MonitorSettings {
        enabled: monitor.enabled.unwrap_or(true),
        interval: Duration::from_secs(interval_secs),
        batch_size: non_zero_u32(
            monitor
                .batch_size
                .unwrap_or(DEFAULT_MONITOR_BATCH_SIZE)
                .into(),
            "monitor.batch_size",
        )?,
        batch_delay: Duration::from_millis(
            monitor
                .batch_delay_ms
                .unwrap_or(DEFAULT_MONITOR_BATCH_DELAY_MS),
        ),
        check_timeout: positive_millis(
            monitor.check_timeout_ms,
            DEFAULT_MONITOR_CHECK_TIMEOUT_MS,
            "monitor.check_timeout_ms",
        )?,
        critical_threshold,
        max_errors,
        max_healing_attempts: non_zero_u32(
            monitor
                .max_healing_attempts
                .unwrap_or(DEFAULT_MONITOR_MAX_HEALING_ATTEMPTS)
                .into(),
            "monitor.max_healing_attempts",
        )?,
        healing_batch: non_zero_u32(
            monitor
                .healing_batch
                .unwrap_or(DEFAULT_MONITOR_HEALING_BATCH)
                .into(),
            "monitor.healing_batch",
        )?,
        synthetic_healing: monitor.synthetic_healing.unwrap_or(true),
    })
}

fn build_fallback_settings(fallback: RawFallbackSettings) -> Result<FallbackSettings, LoadError> {
    let width = non_zero_u32(
        fallback.width.unwrap_or(DEFAULT_FALLBACK_WIDTH).into(),
        "fallback.width",
    )?;
    let height = non_zero_u32(
        fallback.height.unwrap_or(DEFAULT_FALLBACK_HEIGHT).into(),
        "fallback.height",
    )?;
    for (value, key) in [(width, "fallback.width"), (height, "fallback.height")] {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value.get()) {
            return Err(LoadError::invalid(
                key,
                format!("must be between {MIN_DIMENSION} and {MAX_DIMENSION} pixels"),
            ));
        }
    }

    Ok(FallbackSettings {
        width,
        height,
        brand: non_blank(fallback.brand).unwrap_or_else(|| DEFAULT_FALLBACK_BRAND.to_string()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    public_base_url: Option<String>,
    bucket: Option<String>,
    public_path: Option<String>,
    sign_path: Option<String>,
    alternate_bases: Option<Vec<String>>,
    alternate_buckets: Option<Vec<String>>,
    site_origin: Option<String>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProbeSettings {
    strategies: Option<Vec<String>>,
    timeout_ms: Option<u64>,
    retry_attempts: Option<u32>,
    retry_step_ms: Option<u64>,
    sniff_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResolverSettings {
    max_attempts: Option<u32>,
    backoff_ms: Option<u64>,
    placeholder_url: Option<String>,
    preload_batch_size: Option<u32>,
    preload_batch_delay_ms: Option<u64>,
    preload_max_attempts: Option<u32>,
    auto_register: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_memory_tier: Option<bool>,
    memory_limit: Option<usize>,
    enable_persistent_tier: Option<bool>,
    persistent_path: Option<PathBuf>,
    persistent_max_entries: Option<usize>,
    enable_network_tier: Option<bool>,
    network_limit: Option<usize>,
    network_max_age_ms: Option<u64>,
    maintenance_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMonitorSettings {
    enabled: Option<bool>,
    interval_secs: Option<u64>,
    batch_size: Option<u32>,
    batch_delay_ms: Option<u64>,
    check_timeout_ms: Option<u64>,
    critical_threshold: Option<u32>,
    max_errors: Option<u32>,
    max_healing_attempts: Option<u32>,
    healing_batch: Option<u32>,
    synthetic_healing: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFallbackSettings {
    width: Option<u32>,
    height: Option<u32>,
    brand: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn check_http_url(value: &str, key: &'static str) -> Result<(), LoadError> {
    let parsed = url::Url::parse(value)
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

fn positive_millis(
    value: Option<u64>,
    default: u64,
    key: &'static str,
) -> Result<Duration, LoadError> {
    let millis = value.unwrap_or(default);
    if millis == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(millis))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
