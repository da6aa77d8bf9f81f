// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for domain values used across test suites.

use tether_core::{Container, QueuedMessage, Record, Role};

/// A user record with content derived from its id.
pub fn record(id: &str) -> Record {
    Record {
        id: id.to_string(),
        role: Role::User,
        content: format!("content of {id}"),
        timestamp: 1_700_000_000_000,
    }
}

/// A container holding records with the given ids, in order.
pub fn container(id: &str, record_ids: &[&str]) -> Container {
    let mut container = Container::new(id, format!("{id} conversation"), 1_700_000_000_000);
    container.records = record_ids.iter().map(|r| record(r)).collect();
    container
}

/// A pending message with an explicit timestamp.
pub fn queued(id: &str, container_id: &str, timestamp: i64) -> QueuedMessage {
    QueuedMessage {
        id: id.to_string(),
        container_id: container_id.to_string(),
        content: format!("message {id}"),
        image_url: None,
        timestamp,
        retry_count: 0,
    }
}
