// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tether sync core.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across Tether components and collaborator traits.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Configuration errors (invalid TOML, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relay link failures. Reported through the connection handler, never
    /// raised synchronously except for malformed pairing codes.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Storage backend errors (database open, transaction failure, I/O).
    ///
    /// The outbox absorbs these internally by falling back; callers of the
    /// outbox never observe this variant.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The outbox already holds its fixed number of pending items.
    #[error(
        "Offline queue is full ({limit} messages). Please wait for the connection to restore."
    )]
    CapacityExceeded { limit: usize },

    /// A migration could not start because its containers are unusable.
    /// Raised before any container is mutated.
    #[error(transparent)]
    MigrationPrecondition(#[from] MigrationPrecondition),

    /// JSON (de)serialization failure for frames or persisted records.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TetherError::Storage {
            source: Box::new(source),
        }
    }

    /// Build a storage failure from a plain message.
    pub fn storage_msg(message: impl Into<String>) -> Self {
        TetherError::Storage {
            source: message.into().into(),
        }
    }
}

/// Kinds of relay link failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The pairing code is not exactly six ASCII digits. No socket was opened.
    #[error("Invalid code format. Please enter a 6-digit code.")]
    InvalidCode { code: String },

    /// The socket could not be established at all.
    #[error(
        "Could not reach the relay at {url}: {message}. Please check your network connection."
    )]
    Unreachable { url: String, message: String },

    /// The socket closed without a completed closing handshake.
    #[error("{}", abnormal_close_message(.code, .reason))]
    AbnormalClose { code: u16, reason: String },

    /// No confirmation frame arrived within the caller's bound.
    #[error("{}", confirm_timeout_message(.reached_relay, .after))]
    ConfirmTimeout { reached_relay: bool, after: Duration },
}

/// Close code reported when a socket vanished without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

fn abnormal_close_message(code: &u16, reason: &str) -> String {
    if *code == ABNORMAL_CLOSE_CODE {
        "Connection to the relay failed. Please check your network, verify the code, \
         and ensure the PC client is running."
            .to_string()
    } else if !reason.is_empty() {
        format!("Connection closed: {reason}")
    } else {
        format!("Connection closed unexpectedly (code {code}).")
    }
}

fn confirm_timeout_message(reached_relay: &bool, after: &Duration) -> String {
    if *reached_relay {
        format!(
            "Reached the relay but no PC client answered within {}s. \
             Make sure the desktop companion is running with the same code.",
            after.as_secs()
        )
    } else {
        format!(
            "Could not reach the relay within {}s. Please check your network connection.",
            after.as_secs()
        )
    }
}

/// Reasons a migration was refused before touching any container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationPrecondition {
    #[error("source container `{container_id}` not found (available: {})", .available.join(", "))]
    SourceMissing {
        container_id: String,
        available: Vec<String>,
    },

    #[error("destination container `{container_id}` not found (available: {})", .available.join(", "))]
    DestinationMissing {
        container_id: String,
        available: Vec<String>,
    },

    #[error("cannot migrate records from container `{container_id}` into itself")]
    SameContainer { container_id: String },
}
