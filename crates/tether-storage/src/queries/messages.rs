// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending outbound message operations.

use rusqlite::params;
use tether_core::{QueuedMessage, TetherError};

use crate::database::{map_tr_err, Database};

/// Insert a message. Fails if a message with the same id is already queued.
pub async fn insert(db: &Database, message: &QueuedMessage) -> Result<(), TetherError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO pending_messages (id, container_id, content, image_url, timestamp, retry_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.container_id,
                    message.content,
                    message.image_url,
                    message.timestamp,
                    message.retry_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All pending messages, oldest first; ties keep insertion order.
pub async fn list(db: &Database) -> Result<Vec<QueuedMessage>, TetherError> {
    db.connection()
        .call(|conn| -> Result<Vec<QueuedMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, container_id, content, image_url, timestamp, retry_count
                 FROM pending_messages
                 ORDER BY timestamp ASC, seq ASC",
            )?;
            stmt.query_map([], |row| {
                Ok(QueuedMessage {
                    id: row.get(0)?,
                    container_id: row.get(1)?,
                    content: row.get(2)?,
                    image_url: row.get(3)?,
                    timestamp: row.get(4)?,
                    retry_count: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count(db: &Database) -> Result<usize, TetherError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM pending_messages", [], |row| row.get(0))
        })
        .await
        .map(|n| n.max(0) as usize)
        .map_err(map_tr_err)
}

/// Delete a message by id. Returns whether a row was deleted.
pub async fn delete(db: &Database, id: &str) -> Result<bool, TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM pending_messages WHERE id = ?1", params![id])
        })
        .await
        .map(|deleted| deleted > 0)
        .map_err(map_tr_err)
}

pub async fn delete_all(db: &Database) -> Result<(), TetherError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM pending_messages", [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
