use std::time::Duration;

use assert_matches::assert_matches;

use idx_indices_sync::config::{
    Config, ConfigLoader, ConfigOverrides, RateLimitConfig, DEFAULT_WORKING_DIR,
    MAX_RATE_LIMIT_SECS,
};
use idx_indices_sync::domain::IndexName;
use idx_indices_sync::error::SyncError;

#[test]
fn parse_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("idx-sync.json");
    std::fs::write(
        &path,
        r#"{
            "base_url": "https://mirror.example/",
            "proxy": "http://proxy:3128",
            "year": 2024,
            "indices": ["LQ45", " IDX G30 "],
            "rate_limit": { "min_secs": 1.0, "max_secs": 2.5 },
            "timeout_secs": 15,
            "catalog_retries": 1,
            "accept_invalid_certs": false,
            "working_dir": "downloads"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.base_url, "https://mirror.example");
    assert_eq!(resolved.proxy.as_deref(), Some("http://proxy:3128"));
    assert_eq!(resolved.year, 2024);
    assert_eq!(
        resolved.indices,
        vec![
            "LQ45".parse::<IndexName>().unwrap(),
            "IDX G30".parse::<IndexName>().unwrap()
        ]
    );
    assert_eq!(
        resolved.rate_limit,
        RateLimitConfig {
            min_secs: 1.0,
            max_secs: 2.5
        }
    );
    assert_eq!(resolved.timeout, Duration::from_secs(15));
    assert_eq!(resolved.catalog_retries, 1);
    assert!(!resolved.accept_invalid_certs);
    assert_eq!(resolved.working_dir.as_str(), "downloads");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SyncError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("idx-sync.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SyncError::ConfigParse(_));
}

#[test]
fn inverted_rate_limit_is_rejected() {
    let config = Config {
        rate_limit: Some(RateLimitConfig {
            min_secs: 12.0,
            max_secs: 3.0,
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SyncError::InvalidConfig(_));
}

#[test]
fn oversized_rate_limit_is_rejected() {
    let config = Config {
        rate_limit: Some(RateLimitConfig {
            min_secs: 3.0,
            max_secs: 1e30,
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SyncError::InvalidConfig(_));

    let config = Config {
        rate_limit: Some(RateLimitConfig {
            min_secs: 0.0,
            max_secs: MAX_RATE_LIMIT_SECS,
        }),
        ..Config::default()
    };
    assert!(ConfigLoader::resolve_config(config).is_ok());
}

#[test]
fn blank_index_is_rejected() {
    let config = Config {
        indices: Some(vec!["LQ45".to_string(), "  ".to_string()]),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SyncError::InvalidIndexName(_));
}

#[test]
fn overrides_win_over_file_values() {
    let config = Config {
        year: Some(2023),
        indices: Some(vec!["LQ45".to_string()]),
        proxy: Some("http://file-proxy:1".to_string()),
        ..Config::default()
    };
    let overrides = ConfigOverrides {
        year: Some(2025),
        indices: vec!["JII70".to_string(), "IDX30".to_string()],
        proxy: None,
        working_dir: Some("scratch".to_string()),
    };

    let resolved =
        ConfigLoader::resolve_config(ConfigLoader::apply_overrides(config, overrides)).unwrap();
    assert_eq!(resolved.year, 2025);
    assert_eq!(resolved.indices.len(), 2);
    assert_eq!(resolved.proxy.as_deref(), Some("http://file-proxy:1"));
    assert_eq!(resolved.working_dir.as_str(), "scratch");
    assert_ne!(resolved.working_dir.as_str(), DEFAULT_WORKING_DIR);
}
