// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Tether sync core.
//!
//! Provides WAL-mode SQLite storage with embedded, versioned migrations and a
//! single-writer model via `tokio-rusqlite`, typed queries for the outbox
//! tables and the container map, a SQLite-backed [`RecordStore`], and a simple
//! key-value store used as the outbox fallback.
//!
//! [`RecordStore`]: tether_core::RecordStore

pub mod database;
pub mod kv;
pub mod migrations;
pub mod queries;
pub mod record_store;

pub use database::Database;
pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use record_store::SqliteRecordStore;
