// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key is
//! rejected at startup instead of silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Tether configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    /// Relay link settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Durable outbox settings.
    #[serde(default)]
    pub outbox: OutboxConfig,

    /// Migration coordinator settings.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Relay link configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Base relay address; the pairing code is appended as the last path segment.
    #[serde(default = "default_relay_url")]
    pub url: String,

    /// Interval between keep-alive pings while the socket is open.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Reconnect delay for the first attempt; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound of the exponential part of the reconnect delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Exclusive upper bound of the random jitter added to each reconnect delay.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// How long callers wait for a partner confirmation before giving up.
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
}

impl RelayConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            jitter_ms: default_jitter_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
        }
    }
}

fn default_relay_url() -> String {
    "wss://otakon-relay.onrender.com".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    5_000
}

fn default_jitter_ms() -> u64 {
    300
}

fn default_confirm_timeout_ms() -> u64 {
    15_000
}

/// Durable outbox configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboxConfig {
    /// Path to the SQLite database backing the primary queue.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory of the key-value fallback store.
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: String,

    /// Maximum number of pending messages.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            fallback_dir: default_fallback_dir(),
            capacity: default_capacity(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tether").join("tether.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "tether.db".to_string())
}

fn default_fallback_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("tether").join("kv"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "tether-kv".to_string())
}

fn default_capacity() -> usize {
    10
}

/// Migration coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// A held migration lock is force-released after this long.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl MigrationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
