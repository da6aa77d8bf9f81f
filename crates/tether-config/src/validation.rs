// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TetherConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &TetherConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let url = config.relay.url.trim();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        fail(format!(
            "relay.url `{url}` must start with ws:// or wss://"
        ));
    }
    if url.ends_with('/') {
        fail(format!(
            "relay.url `{url}` must not end with `/`; the pairing code is appended as a path segment"
        ));
    }

    if config.relay.heartbeat_interval_ms == 0 {
        fail("relay.heartbeat_interval_ms must be greater than 0".to_string());
    }

    if config.relay.backoff_base_ms == 0 {
        fail("relay.backoff_base_ms must be greater than 0".to_string());
    }

    if config.relay.backoff_base_ms > config.relay.backoff_max_ms {
        fail(format!(
            "relay.backoff_base_ms ({}) must not exceed relay.backoff_max_ms ({})",
            config.relay.backoff_base_ms, config.relay.backoff_max_ms
        ));
    }

    if config.relay.confirm_timeout_ms == 0 {
        fail("relay.confirm_timeout_ms must be greater than 0".to_string());
    }

    if config.outbox.capacity == 0 {
        fail("outbox.capacity must be at least 1".to_string());
    }

    if config.outbox.database_path.trim().is_empty() {
        fail("outbox.database_path must not be empty".to_string());
    }

    if config.outbox.fallback_dir.trim().is_empty() {
        fail("outbox.fallback_dir must not be empty".to_string());
    }

    if config.migration.lock_timeout_ms == 0 {
        fail("migration.lock_timeout_ms must be greater than 0".to_string());
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        fail(format!(
            "log.level `{}` must be one of: {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
