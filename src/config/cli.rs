use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the mediaward binary.
#[derive(Debug, Parser)]
#[command(
    name = "mediaward",
    version,
    about = "Resolve, cache, and health-check stored media URLs"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MEDIAWARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve identifiers and print one result per line as JSON.
    Resolve(ResolveArgs),
    /// Warm the cache for identifiers and print the summary as JSON.
    Preload(PreloadArgs),
    /// Monitor identifiers until interrupted, logging status changes.
    Watch(WatchArgs),
    /// Write the synthetic fallback image for a title.
    Fallback(FallbackArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the object store base URL.
    #[arg(long = "storage-base-url", value_name = "URL", global = true)]
    pub storage_base_url: Option<String>,

    /// Override the primary bucket.
    #[arg(long = "storage-bucket", value_name = "NAME", global = true)]
    pub storage_bucket: Option<String>,

    /// Override the persistent cache file.
    #[arg(
        long = "cache-path",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub cache_path: Option<PathBuf>,

    /// Enable or disable the persistent cache tier.
    #[arg(
        long = "cache-persistent",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_persistent: Option<bool>,

    /// Override the per-request probe timeout.
    #[arg(long = "probe-timeout-ms", value_name = "MILLIS", global = true)]
    pub probe_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Storage keys, public URLs, or signed URLs.
    #[arg(value_name = "ID", required = true)]
    pub identifiers: Vec<String>,

    /// Title for the synthetic fallback when nothing is reachable.
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Category for the synthetic fallback.
    #[arg(long, value_name = "TEXT")]
    pub category: Option<String>,

    /// Override the attempt budget.
    #[arg(long = "max-attempts", value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Ignore cached URLs and probe again.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub retry: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PreloadArgs {
    #[arg(value_name = "ID", required = true)]
    pub identifiers: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[arg(value_name = "ID", required = true)]
    pub identifiers: Vec<String>,

    /// Override the check interval.
    #[arg(long = "interval-seconds", value_name = "SECONDS")]
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct FallbackArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "TEXT")]
    pub category: Option<String>,

    /// Output file; the SVG goes to stdout when omitted.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}
