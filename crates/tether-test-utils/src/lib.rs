// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tether integration tests.
//!
//! Provides an in-process relay server and in-memory collaborators for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockRelay`] - Local WebSocket relay with frame capture and fault injection
//! - [`MemoryRecordStore`] - In-memory record store with optional latency and failures
//! - [`FailingQueue`] - Persistent queue whose every operation fails

pub mod failing_queue;
pub mod fixtures;
pub mod memory_store;
pub mod mock_relay;

pub use failing_queue::FailingQueue;
pub use fixtures::{container, queued, record};
pub use memory_store::MemoryRecordStore;
pub use mock_relay::MockRelay;
