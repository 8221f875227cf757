use std::{io::Write, process, sync::Arc};

use clap::CommandFactory;
use mediaward::{
    application::{
        error::AppError,
        fallback::{FallbackConfig, SyntheticFallback},
        resolver::ResolveOptions,
        service::MediaService,
    },
    config::{self, CliArgs, Command, FallbackArgs, PreloadArgs, ResolveArgs, WatchArgs},
    domain::{EntryMetadata, HealthSnapshot},
    infra::{bootstrap, error::InfraError, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE: &str = "mediaward::cli";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error.report().render(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error.report().render(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let Some(command) = cli_args.command else {
        CliArgs::command().print_help().map_err(InfraError::from)?;
        return Ok(());
    };

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        Command::Resolve(args) => run_resolve(&settings, args).await,
        Command::Preload(args) => run_preload(&settings, args).await,
        Command::Watch(args) => run_watch(&settings, args).await,
        Command::Fallback(args) => run_fallback(&settings, args).await,
    }
}

async fn run_resolve(settings: &config::Settings, args: ResolveArgs) -> Result<(), AppError> {
    let service = bootstrap::build_service(settings)?;

    for identifier in &args.identifiers {
        let mut options = ResolveOptions {
            title: args.title.clone(),
            category: args.category.clone(),
            ..ResolveOptions::default()
        };
        if let Some(max_attempts) = args.max_attempts {
            options = options.with_max_attempts(max_attempts);
        }

        let result = if args.retry {
            service.retry(identifier, options).await
        } else {
            service.resolve(identifier, options).await
        };
        print_json(&result)?;
    }

    service.teardown().await;
    Ok(())
}

async fn run_preload(settings: &config::Settings, args: PreloadArgs) -> Result<(), AppError> {
    let service = bootstrap::build_service(settings)?;
    let summary = service.preload(&args.identifiers).await;
    print_json(&summary)?;
    service.teardown().await;
    Ok(())
}

async fn run_watch(settings: &config::Settings, args: WatchArgs) -> Result<(), AppError> {
    let service = bootstrap::build_service(settings)?;
    service.init();

    let subscriptions = register_all(&service, &args.identifiers).await;
    info!(
        target = SOURCE,
        count = subscriptions.len(),
        interval_secs = settings.monitor.interval.as_secs(),
        "watching identifiers; press Ctrl-C to stop"
    );

    let signal = tokio::signal::ctrl_c().await;
    drop(subscriptions);

    let stats = service.get_health_stats();
    service.teardown().await;
    signal.map_err(InfraError::from)?;
    print_json(&stats)
}

async fn register_all(
    service: &Arc<MediaService>,
    identifiers: &[String],
) -> Vec<mediaward::application::monitor::Subscription> {
    let mut subscriptions = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        let result = service
            .resolve(identifier, ResolveOptions::default())
            .await;
        if !result.is_resolved() {
            warn!(
                target = SOURCE,
                identifier = %identifier,
                source = result.source.as_str(),
                "identifier did not resolve; monitoring its first candidate"
            );
        }
        service.register(identifier, EntryMetadata::default());
        subscriptions.push(service.subscribe(identifier, log_snapshot));
    }
    subscriptions
}

fn log_snapshot(snapshot: HealthSnapshot) {
    info!(
        target = SOURCE,
        identifier = %snapshot.identifier,
        status = snapshot.status.as_str(),
        errors = snapshot.error_count,
        healing = snapshot.is_healing,
        synthetic = snapshot.synthetic,
        url = snapshot.url.as_deref().unwrap_or(""),
        "health update"
    );
}

async fn run_fallback(settings: &config::Settings, args: FallbackArgs) -> Result<(), AppError> {
    let fallback = SyntheticFallback::new(FallbackConfig::from(&settings.fallback));
    let image = fallback.generate(&args.title, args.category.as_deref());

    match args.out {
        Some(path) => {
            tokio::fs::write(&path, &image.bytes)
                .await
                .map_err(InfraError::from)?;
            info!(
                target = SOURCE,
                path = %path.display(),
                bytes = image.bytes.len(),
                "fallback image written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&image.bytes).map_err(InfraError::from)?;
            stdout.write_all(b"\n").map_err(InfraError::from)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let line = serde_json::to_string(value)
        .map_err(|err| AppError::unexpected(format!("failed to serialize output: {err}")))?;
    println!("{line}");
    Ok(())
}
