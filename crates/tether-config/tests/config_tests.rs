// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tether configuration system.

use tether_config::diagnostic::ConfigError;
use tether_config::model::TetherConfig;
use tether_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with every known field deserializes.
#[test]
fn valid_toml_deserializes_into_tether_config() {
    let toml = r#"
[relay]
url = "ws://127.0.0.1:9000"
heartbeat_interval_ms = 1000
backoff_base_ms = 100
backoff_max_ms = 800
jitter_ms = 0
confirm_timeout_ms = 2000

[outbox]
database_path = "/tmp/tether-test.db"
fallback_dir = "/tmp/tether-kv"
capacity = 3

[migration]
lock_timeout_ms = 500

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.relay.url, "ws://127.0.0.1:9000");
    assert_eq!(config.relay.heartbeat_interval_ms, 1000);
    assert_eq!(config.relay.backoff_base_ms, 100);
    assert_eq!(config.relay.backoff_max_ms, 800);
    assert_eq!(config.relay.jitter_ms, 0);
    assert_eq!(config.relay.confirm_timeout().as_secs(), 2);
    assert_eq!(config.outbox.database_path, "/tmp/tether-test.db");
    assert_eq!(config.outbox.fallback_dir, "/tmp/tether-kv");
    assert_eq!(config.outbox.capacity, 3);
    assert_eq!(config.migration.lock_timeout().as_millis(), 500);
    assert_eq!(config.log.level, "debug");
}

/// Missing sections fall back to the documented defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.relay.url, "wss://otakon-relay.onrender.com");
    assert_eq!(config.relay.heartbeat_interval_ms, 30_000);
    assert_eq!(config.relay.backoff_base_ms, 500);
    assert_eq!(config.relay.backoff_max_ms, 5_000);
    assert_eq!(config.relay.jitter_ms, 300);
    assert_eq!(config.relay.confirm_timeout_ms, 15_000);
    assert_eq!(config.outbox.capacity, 10);
    assert_eq!(config.migration.lock_timeout_ms, 10_000);
    assert_eq!(config.log.level, "info");
}

/// A typo in a known section is rejected with a suggestion.
#[test]
fn unknown_field_produces_suggestion() {
    let toml = r#"
[outbox]
capacty = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "capacty");
            assert_eq!(suggestion.as_deref(), Some("capacity"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// A wrongly typed value is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[relay]
jitter_ms = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

/// Validation runs after a successful parse.
#[test]
fn semantic_errors_surface_through_load_and_validate() {
    let toml = r#"
[relay]
url = "http://relay.example"
"#;

    let errors = load_and_validate_str(toml).expect_err("http url must be rejected");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

/// Dotted overrides (as produced by the env provider) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: TetherConfig = Figment::new()
        .merge(Serialized::defaults(TetherConfig::default()))
        .merge(Toml::string("[outbox]\ncapacity = 4\n"))
        .merge(("outbox.capacity", 7))
        .extract()
        .expect("should merge override");

    assert_eq!(config.outbox.capacity, 7);
}

/// Missing config files are skipped silently.
#[test]
fn missing_config_file_is_skipped() {
    let config =
        tether_config::load_config_from_path(std::path::Path::new("/nonexistent/tether.toml"))
            .expect("missing file should be skipped");
    assert_eq!(config.outbox.capacity, 10);
}
