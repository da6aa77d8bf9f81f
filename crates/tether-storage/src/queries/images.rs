// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending image payload operations.

use rusqlite::params;
use tether_core::{QueuedImage, TetherError};

use crate::database::{map_tr_err, Database};

pub async fn insert(db: &Database, image: &QueuedImage) -> Result<(), TetherError> {
    let image = image.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO pending_images (id, container_id, image_data, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![image.id, image.container_id, image.image_data, image.timestamp],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list(db: &Database) -> Result<Vec<QueuedImage>, TetherError> {
    db.connection()
        .call(|conn| -> Result<Vec<QueuedImage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, container_id, image_data, timestamp
                 FROM pending_images
                 ORDER BY timestamp ASC, seq ASC",
            )?;
            stmt.query_map([], |row| {
                Ok(QueuedImage {
                    id: row.get(0)?,
                    container_id: row.get(1)?,
                    image_data: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_all(db: &Database) -> Result<(), TetherError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM pending_images", [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
