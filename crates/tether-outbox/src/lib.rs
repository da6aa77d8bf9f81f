// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable outbox for the Tether sync core.
//!
//! Messages that cannot be sent right away are written to a SQLite primary
//! store, or to a key-value fallback when the primary is missing or failing.
//! The outbox holds at most a fixed number of messages and rejects the rest
//! with a user-facing reason. Images are only ever queued in the primary.

pub mod fallback;
pub mod kv_queue;
pub mod outbox;
pub mod sqlite;

pub use fallback::FallbackQueue;
pub use kv_queue::KvQueue;
pub use outbox::{ImageQueueOutcome, Outbox, SyncUpdate};
pub use sqlite::SqliteQueue;
