// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tether sync core.
//!
//! Holds the error type, the domain types exchanged between the relay link,
//! the durable outbox and the migration coordinator, and the collaborator
//! traits those components are built against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConnectionError, MigrationPrecondition, TetherError, ABNORMAL_CLOSE_CODE};
pub use traits::{ImageQueue, PersistentQueue, RecordStore};
pub use types::{
    Admission, Container, ContainerMap, ConnectionState, NewMessage, QueuedImage, QueuedMessage,
    Record, Role, SyncMetadata,
};

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
