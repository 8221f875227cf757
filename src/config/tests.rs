use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.storage.bucket = Some("media".to_string());
    raw.probe.timeout_ms = Some(1_000);

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        storage_bucket: Some("covers".to_string()),
        probe_timeout_ms: Some(2_500),
        ..Default::default()
    };

    raw.apply_global_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.storage.bucket, "covers");
    assert_eq!(settings.probe.timeout, Duration::from_millis(2_500));
}

#[test]
fn defaults_describe_a_usable_deployment() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.storage.public_base_url.is_none());
    assert_eq!(settings.storage.bucket, DEFAULT_BUCKET);
    assert_eq!(
        settings.probe.strategies,
        StrategyKind::DEFAULT_ORDER.to_vec()
    );
    assert_eq!(settings.resolver.max_attempts.get(), 3);
    assert_eq!(settings.resolver.placeholder_url, DEFAULT_PLACEHOLDER_URL);
    assert_eq!(settings.resolver.preload_max_attempts.get(), 1);
    assert_eq!(settings.monitor.interval, Duration::from_secs(30));
    assert_eq!(settings.monitor.critical_threshold.get(), 3);
    assert_eq!(settings.monitor.max_errors.get(), 5);
    assert_eq!(settings.monitor.max_healing_attempts.get(), 3);
    assert_eq!(settings.cache.memory_limit, 500);
    assert_eq!(settings.cache.persistent_max_entries, 100);
    assert_eq!(settings.cache.network_max_age_ms, 3_600_000);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_global_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn critical_threshold_cannot_exceed_max_errors() {
    let mut raw = RawSettings::default();
    raw.monitor.critical_threshold = Some(6);
    raw.monitor.max_errors = Some(5);

    let err = Settings::from_raw(raw).expect_err("threshold above max errors");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "monitor.critical_threshold",
            ..
        }
    ));
}

#[test]
fn strategies_parse_in_configured_order() {
    let mut raw = RawSettings::default();
    raw.probe.strategies = Some(vec![
        "existence".to_string(),
        " IMAGE_PLAIN ".to_string(),
    ]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.probe.strategies,
        vec![StrategyKind::Existence, StrategyKind::ImagePlain]
    );
}

#[test]
fn unknown_or_duplicate_strategies_are_rejected() {
    let mut raw = RawSettings::default();
    raw.probe.strategies = Some(vec!["carrier_pigeon".to_string()]);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "probe.strategies",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.probe.strategies = Some(vec!["existence".to_string(), "existence".to_string()]);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.probe.strategies = Some(vec!["inline".to_string()]);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn base_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.storage.public_base_url = Some("ftp://files.example".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "storage.public_base_url",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.storage.public_base_url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("blank means unset");
    assert!(settings.storage.public_base_url.is_none());
}

#[test]
fn blank_alternates_are_dropped() {
    let mut raw = RawSettings::default();
    raw.storage.alternate_bases = Some(vec![
        "https://mirror.example".to_string(),
        "".to_string(),
    ]);
    raw.storage.alternate_buckets = Some(vec![" ".to_string(), "legacy".to_string()]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.storage.alternate_bases, vec!["https://mirror.example"]);
    assert_eq!(settings.storage.alternate_buckets, vec!["legacy"]);
}

#[test]
fn zero_sized_limits_are_rejected() {
    let mut raw = RawSettings::default();
    raw.resolver.max_attempts = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "resolver.max_attempts",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.cache.memory_limit = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.monitor.interval_secs = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn fallback_dimensions_are_bounded() {
    let mut raw = RawSettings::default();
    raw.fallback.height = Some(32);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "fallback.height",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.fallback.width = Some(MAX_DIMENSION + 1);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "fallback.width",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.fallback.width = Some(MAX_DIMENSION);
    let settings = Settings::from_raw(raw).expect("largest card is allowed");
    assert_eq!(settings.fallback.width.get(), MAX_DIMENSION);
}

#[test]
fn watch_interval_overrides_monitor() {
    let args = CliArgs::parse_from([
        "mediaward",
        "watch",
        "covers/a.jpg",
        "--interval-seconds",
        "5",
    ]);
    let Some(Command::Watch(watch)) = args.command.as_ref() else {
        panic!("expected watch command");
    };

    let mut raw = RawSettings::default();
    raw.monitor.enabled = Some(false);
    raw.apply_watch_overrides(watch);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.monitor.interval, Duration::from_secs(5));
    assert!(settings.monitor.enabled);
}

#[test]
fn no_subcommand_is_allowed() {
    let args = CliArgs::parse_from(["mediaward"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_resolve_arguments() {
    let args = CliArgs::parse_from([
        "mediaward",
        "resolve",
        "covers/a.jpg",
        "https://cdn.example/b.png",
        "--title",
        "Spring",
        "--max-attempts",
        "2",
        "--retry",
        "--log-level",
        "warn",
    ]);

    assert_eq!(args.overrides.log_level.as_deref(), Some("warn"));
    match args.command.expect("resolve command") {
        Command::Resolve(resolve) => {
            assert_eq!(
                resolve.identifiers,
                vec!["covers/a.jpg", "https://cdn.example/b.png"]
            );
            assert_eq!(resolve.title.as_deref(), Some("Spring"));
            assert_eq!(resolve.max_attempts, Some(2));
            assert!(resolve.retry);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_fallback_arguments() {
    let args = CliArgs::parse_from([
        "mediaward",
        "fallback",
        "--title",
        "Hello",
        "--category",
        "travel",
        "--out",
        "cover.svg",
    ]);

    match args.command.expect("fallback command") {
        Command::Fallback(fallback) => {
            assert_eq!(fallback.title, "Hello");
            assert_eq!(fallback.category.as_deref(), Some("travel"));
            assert_eq!(fallback.out, Some(PathBuf::from("cover.svg")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn resolve_requires_an_identifier() {
    assert!(CliArgs::try_parse_from(["mediaward", "resolve"]).is_err());
}

#[test]
fn explicit_config_file_is_layered() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("mediaward.toml");
    std::fs::write(
        &path,
        "[storage]\npublic_base_url = \"https://store.example\"\n\n[monitor]\ninterval_secs = 12\n",
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "mediaward",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "--storage-base-url",
        "https://override.example",
    ]);
    let settings = load(&args).expect("load settings");

    assert_eq!(
        settings.storage.public_base_url.as_deref(),
        Some("https://override.example")
    );
    assert_eq!(settings.monitor.interval, Duration::from_secs(12));
}
