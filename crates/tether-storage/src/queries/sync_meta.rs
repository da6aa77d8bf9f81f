// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Singleton sync metadata row.

use rusqlite::{params, OptionalExtension};
use tether_core::{SyncMetadata, TetherError};

use crate::database::{map_tr_err, Database};

const SYNC_STATUS_ID: &str = "sync-status";

pub async fn put(db: &Database, metadata: &SyncMetadata) -> Result<(), TetherError> {
    let metadata = *metadata;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO sync_metadata (id, last_sync_attempt, pending_count, last_successful_sync)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     last_sync_attempt = excluded.last_sync_attempt,
                     pending_count = excluded.pending_count,
                     last_successful_sync = excluded.last_successful_sync",
                params![
                    SYNC_STATUS_ID,
                    metadata.last_sync_attempt,
                    metadata.pending_count as i64,
                    metadata.last_successful_sync,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database) -> Result<Option<SyncMetadata>, TetherError> {
    db.connection()
        .call(|conn| -> Result<Option<SyncMetadata>, rusqlite::Error> {
            conn.query_row(
                "SELECT last_sync_attempt, pending_count, last_successful_sync
                 FROM sync_metadata WHERE id = ?1",
                params![SYNC_STATUS_ID],
                |row| {
                    let pending: i64 = row.get(1)?;
                    Ok(SyncMetadata {
                        last_sync_attempt: row.get(0)?,
                        pending_count: pending.max(0) as u64,
                        last_successful_sync: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
