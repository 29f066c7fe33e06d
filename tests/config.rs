use snapshot_flatten::logging::{LogConfig, LogFormat, LogLevel, init_logging};
use snapshot_flatten::{EntityKind, FlattenError, FlattenPipeline, OutputFormat, PipelineConfig, ShardLimit};
use std::fs;
use std::path::PathBuf;

#[test]
fn defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.entity, EntityKind::Works);
    assert_eq!(config.format, OutputFormat::Parquet);
    assert_eq!(config.shard_limit, ShardLimit::All);
    assert_eq!(config.max_attempts, 2);
    assert!(!config.skip_empty_tables);
    assert_eq!(config.checkpoint_dir(), PathBuf::from("./processed-snapshot/temp"));
    assert!(config.worker_count() >= 1);
    assert!(config.validate().is_ok());
}

#[test]
fn loads_partial_json() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "snapshot_root": "/data/snapshot",
            "output_root": "/data/out",
            "entity": "institutions",
            "workers": 3,
            "shard_limit": {"first": 5},
            "format": "csv_gz"
        }"#,
    )?;

    let config = PipelineConfig::from_json_file(&path)?;
    assert_eq!(config.entity, EntityKind::Institutions);
    assert_eq!(config.worker_count(), 3);
    assert_eq!(config.shard_limit, ShardLimit::First(5));
    assert_eq!(config.format, OutputFormat::CsvGz);
    assert_eq!(config.max_attempts, 2);
    assert_eq!(config.checkpoint_dir(), PathBuf::from("/data/out/temp"));
    Ok(())
}

#[test]
fn invalid_json_names_the_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{")?;
    let err = PipelineConfig::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
    Ok(())
}

#[test]
fn shard_limit_truncates() {
    assert_eq!(ShardLimit::First(2).apply(vec![1, 2, 3]), vec![1, 2]);
    assert_eq!(ShardLimit::First(5).apply(vec![1, 2]), vec![1, 2]);
    assert_eq!(ShardLimit::All.apply(vec![1, 2, 3]), vec![1, 2, 3]);
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let mut zero_workers = PipelineConfig::new(EntityKind::Works, "in", "out");
    zero_workers.workers = Some(0);
    assert!(matches!(
        FlattenPipeline::new(zero_workers),
        Err(FlattenError::Precondition(_))
    ));

    let mut zero_attempts = PipelineConfig::new(EntityKind::Works, "in", "out");
    zero_attempts.max_attempts = 0;
    assert!(zero_attempts.validate().is_err());

    let empty_root = PipelineConfig::new(EntityKind::Works, "", "out");
    assert!(empty_root.validate().is_err());
}

#[test]
fn log_settings_parse() {
    assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert!("loud".parse::<LogLevel>().is_err());
    assert_eq!(LogLevel::Debug.to_string(), "debug");
}

#[test]
fn logging_init_is_idempotent() -> anyhow::Result<()> {
    let config = LogConfig {
        level: LogLevel::Debug,
        format: LogFormat::Text,
        filter_directives: Some("snapshot_flatten::sink=trace".into()),
    };
    init_logging(&config)?;
    init_logging(&LogConfig::default())?;

    let bad = LogConfig {
        filter_directives: Some("snapshot_flatten=shouty".into()),
        ..LogConfig::default()
    };
    assert!(init_logging(&bad).is_err());
    Ok(())
}
