//! Tests for configuration loading.

use genvault::{CloudBackend, GenvaultConfig};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_bundled_defaults() {
    let config = GenvaultConfig::bundled().unwrap();

    assert_eq!(config.storage().root(), &PathBuf::from("./genvault-data"));
    assert_eq!(config.storage().write_timeout(), Duration::from_secs(120));
    assert_eq!(config.cache().ttl(), Duration::from_secs(86400));
    assert!(!config.cloud().enabled());
    assert_eq!(config.cloud().backend(), &CloudBackend::Filesystem);
    assert_eq!(*config.replication().max_attempts(), 3);
    assert!(config.download().local_base_url().is_none());
    assert!(config.database().url().is_none());
    assert_eq!(config.logging().level(), "info");
}

#[test]
fn test_overrides_from_toml() {
    let config = GenvaultConfig::from_toml(
        r#"
        [storage]
        root = "/srv/genvault"

        [cloud]
        enabled = true
        backend = "memory"
        prefix = "prod"

        [replication]
        max_attempts = 5

        [download]
        local_base_url = "https://app.example.com/downloads"

        [logging]
        json = true
        "#,
    )
    .unwrap();

    assert_eq!(config.storage().root(), &PathBuf::from("/srv/genvault"));
    assert_eq!(config.storage().write_timeout(), Duration::from_secs(120));
    assert!(*config.cloud().enabled());
    assert_eq!(config.cloud().backend(), &CloudBackend::Memory);
    assert_eq!(config.cloud().prefix().as_deref(), Some("prod"));
    assert_eq!(*config.replication().max_attempts(), 5);
    assert_eq!(
        config.download().local_base_url().as_deref(),
        Some("https://app.example.com/downloads")
    );
    assert!(*config.logging().json());
    assert_eq!(config.logging().level(), "info");
}

#[test]
fn test_invalid_backend_is_config_error() {
    let err = GenvaultConfig::from_toml("[cloud]\nbackend = \"ftp\"\n").unwrap_err();
    assert!(err.to_string().contains("configuration"));
}
