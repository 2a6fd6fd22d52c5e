//! Config loading: TOML sections, defaults for missing keys, validation.

use std::time::Duration;

use sift_core::config::{SiftConfig, StorageConfig};
use sift_core::errors::ConfigError;

#[test]
fn empty_toml_yields_defaults() {
    let config = SiftConfig::from_toml("").unwrap();
    assert_eq!(config.storage.effective_queue_capacity(), 128);
    assert_eq!(config.storage.effective_batch_size(), 50);
}

#[test]
fn storage_section_overrides_defaults() {
    let config = SiftConfig::from_toml(
        r#"
        [storage]
        queue_capacity = 16
        batch_size = 5
        commit_drain_timeout_ms = 250
        enqueue_timeout_ms = 10
        "#,
    )
    .unwrap();
    assert_eq!(config.storage.effective_queue_capacity(), 16);
    assert_eq!(config.storage.effective_batch_size(), 5);
    assert_eq!(config.storage.effective_commit_drain_timeout(), Duration::from_millis(250));
    assert_eq!(config.storage.effective_enqueue_timeout(), Some(Duration::from_millis(10)));
    // Untouched keys keep their defaults.
    assert_eq!(config.storage.effective_commit_poll_interval(), Duration::from_millis(100));
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let err = SiftConfig::from_toml("[storage]\nqueue_capacity = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = SiftConfig::from_toml("[storage\nbatch_size = 5").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(&path, "[storage]\nbatch_size = 7\n").unwrap();
    let config = SiftConfig::load(&path).unwrap();
    assert_eq!(config.storage.effective_batch_size(), 7);
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SiftConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn storage_config_round_trips_through_json() {
    let config = StorageConfig {
        batch_size: Some(9),
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: StorageConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.batch_size, Some(9));
    assert_eq!(back.queue_capacity, None);
}
