//! Config file and environment handling.

use bridge_core::config::{BACKEND_URL_ENV, BridgeConfig};
use bridge_core::error::ConfigError;

use serial_test::serial;
use tempfile::TempDir;

#[test]
fn given_missing_file_when_loading_then_defaults() {
    // GIVEN: An empty directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN
    let config = BridgeConfig::load(dir.path()).expect("defaults");

    // THEN
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn given_saved_config_when_loading_then_round_trips() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.server.port = 20001;
    config.backend.base_url = "http://127.0.0.1:9999".to_string();

    config.save(dir.path()).expect("save");
    let loaded = BridgeConfig::load(dir.path()).expect("load");

    assert_eq!(loaded, config);
    assert!(!dir.path().join("bridge.json.tmp").exists());
}

/// **VALUE**: A corrupted file is an error, not silently replaced by defaults.
///
/// **BUG THIS CATCHES**: Would catch a loader that quietly points the bridge at the
/// default backend because the user's file had a typo.
#[test]
fn given_corrupted_file_when_loading_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("bridge.json"), "{ not json").expect("write");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn given_invalid_values_in_file_when_loading_then_validation_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("bridge.json"),
        r#"{ "server": { "host": "0.0.0.0" } }"#,
    )
    .expect("write");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[test]
#[serial]
fn given_env_override_when_applied_then_backend_url_replaced() {
    // GIVEN
    // SAFETY: serialized with the other env tests; no other thread reads this variable.
    unsafe { std::env::set_var(BACKEND_URL_ENV, "http://127.0.0.1:7777") };

    // WHEN
    let config = BridgeConfig::default().with_env_overrides();
    unsafe { std::env::remove_var(BACKEND_URL_ENV) };

    // THEN
    assert_eq!(
        config.expect("valid override").backend.base_url,
        "http://127.0.0.1:7777"
    );
}

#[test]
#[serial]
fn given_invalid_env_override_when_applied_then_validation_error() {
    unsafe { std::env::set_var(BACKEND_URL_ENV, "localhost:7777") };

    let result = BridgeConfig::default().with_env_overrides();
    unsafe { std::env::remove_var(BACKEND_URL_ENV) };

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[test]
#[serial]
fn given_no_env_override_when_applied_then_config_unchanged() {
    unsafe { std::env::remove_var(BACKEND_URL_ENV) };

    let config = BridgeConfig::default()
        .with_env_overrides()
        .expect("unchanged");

    assert_eq!(config, BridgeConfig::default());
}
