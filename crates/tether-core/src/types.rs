// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the relay link, the outbox, and the migration coordinator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of the relay link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No socket is open. Either none will be opened until the next
    /// `connect()`, or the relay closed the link cleanly and a reconnect is
    /// scheduled.
    Disconnected,
    /// A socket is being opened, or is open and waiting for a partner confirmation.
    Connecting,
    /// The relay confirmed that a partner is attached.
    Connected,
    /// `disconnect()` was called and the socket close is in flight.
    /// Close events observed in this state never schedule a reconnect.
    Closing,
    /// The link failed. Terminal until the next `connect()`, including the
    /// one issued by the reconnect timer.
    Error,
}

impl ConnectionState {
    /// Whether a socket exists or is being established.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// Author role of a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single unit of content (a chat message) belonging to exactly one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Globally unique record identifier.
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Creation time in Unix milliseconds.
    pub timestamp: i64,
}

/// A persisted conversation: an ordered list of records plus its last update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub records: Vec<Record>,
    /// Last modification time in Unix milliseconds.
    pub updated_at: i64,
}

impl Container {
    /// Create an empty container.
    pub fn new(id: impl Into<String>, title: impl Into<String>, updated_at: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            records: Vec::new(),
            updated_at,
        }
    }

    /// Whether a record with this id is present.
    pub fn contains(&self, record_id: &str) -> bool {
        self.records.iter().any(|r| r.id == record_id)
    }

    /// Ids of all records, in order.
    pub fn record_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Every container known to the record store, keyed by container id.
pub type ContainerMap = BTreeMap<String, Container>;

/// A user-originated message waiting in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    pub id: String,
    pub container_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Enqueue time in Unix milliseconds.
    pub timestamp: i64,
    pub retry_count: u32,
}

/// Caller-supplied part of a [`QueuedMessage`]; the outbox assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub container_id: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl NewMessage {
    pub fn text(container_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            content: content.into(),
            image_url: None,
        }
    }
}

/// A binary-scale payload (screenshot) waiting for upload. Only the primary
/// store ever holds these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedImage {
    pub id: String,
    pub container_id: String,
    pub image_data: String,
    pub timestamp: i64,
}

/// Advisory bookkeeping about outbox drain passes. Diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub last_sync_attempt: i64,
    pub pending_count: u64,
    pub last_successful_sync: i64,
}

/// Result of asking the outbox whether another item fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Admission {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}
