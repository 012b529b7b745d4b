use crate::config::AppConfig;
use crate::error::config::ConfigError;
use crate::session::ReplayPolicy;

use std::time::Duration;

use tempfile::TempDir;

#[test]
fn given_defaults_when_validating_then_ok() {
    let config = AppConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.version, 1);
    assert_eq!(config.pairing.client_name, "sensor-companion");
    assert_eq!(config.pairing.resolve_timeout(), Duration::from_secs(5));
    assert_eq!(config.session.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.session.replay_policy, ReplayPolicy::BestEffort);
    assert!(config.session.auto_reconnect);
}

/// **VALUE**: Verifies a first run with no config file gets defaults, not an error.
#[test]
fn given_missing_file_when_loading_then_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN
    let config = AppConfig::load(dir.path()).expect("load");

    // THEN
    assert_eq!(config, AppConfig::default());
}

/// **VALUE**: Verifies a corrupt file is reported instead of silently replaced by defaults.
///
/// **WHY THIS MATTERS**: Falling back to defaults would quietly discard the user's
/// settings the next time the config is saved.
#[test]
fn given_corrupt_file_when_loading_then_parse_error() {
    // GIVEN
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), "{ not json").expect("write");

    // WHEN
    let result = AppConfig::load(dir.path());

    // THEN
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

/// **VALUE**: Verifies partial files fill missing fields with defaults.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` making older config
/// files unreadable after a field is added.
#[test]
fn given_partial_file_when_loading_then_missing_fields_defaulted() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "session": { "replay_policy": "stop_on_failure" } }"#,
    )
    .expect("write");

    let config = AppConfig::load(dir.path()).expect("load");

    assert_eq!(config.session.replay_policy, ReplayPolicy::StopOnFailure);
    assert_eq!(config.session.request_timeout_secs, 10);
    assert_eq!(config.pairing, AppConfig::default().pairing);
}

#[test]
fn given_modified_config_when_saved_then_load_returns_it() {
    // GIVEN: A nested directory that does not exist yet
    let dir = TempDir::new().expect("temp dir");
    let config_dir = dir.path().join("nested");
    let mut config = AppConfig::default();
    config.pairing.client_name = String::from("kitchen-tablet");
    config.session.events_url = Some(String::from("wss://10.0.0.2:8443/ws/events"));

    // WHEN
    config.save(&config_dir).expect("save");

    // THEN: Round trips and leaves no temp file behind
    assert_eq!(AppConfig::load(&config_dir).expect("load"), config);
    assert!(!config_dir.join("config.json.tmp").exists());
}

/// **VALUE**: Verifies out-of-range values are refused on load and on save.
#[test]
fn given_invalid_values_when_validating_then_validation_error() {
    let mut cases = Vec::new();

    let mut config = AppConfig::default();
    config.version = 0;
    cases.push(config);

    let mut config = AppConfig::default();
    config.version = 2;
    cases.push(config);

    let mut config = AppConfig::default();
    config.pairing.client_name = String::from("   ");
    cases.push(config);

    let mut config = AppConfig::default();
    config.pairing.resolve_timeout_secs = 0;
    cases.push(config);

    let mut config = AppConfig::default();
    config.session.request_timeout_secs = 301;
    cases.push(config);

    let mut config = AppConfig::default();
    config.session.reconnect_max_elapsed_secs = 0;
    cases.push(config);

    let mut config = AppConfig::default();
    config.session.events_url = Some(String::from("https://sensor.local/ws/events"));
    cases.push(config);

    let mut config = AppConfig::default();
    config.session.events_url = Some(String::from("not a url"));
    cases.push(config);

    for config in cases {
        assert!(
            matches!(config.validate(), Err(ConfigError::Validation { .. })),
            "{config:?} should be invalid"
        );
    }
}

#[test]
fn given_invalid_config_when_saving_then_nothing_written() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = AppConfig::default();
    config.session.request_timeout_secs = 0;

    assert!(config.save(dir.path()).is_err());
    assert!(!dir.path().join("config.json").exists());
}
