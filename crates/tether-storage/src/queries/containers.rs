// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-map container operations.
//!
//! The container map is read and written as a unit. `save_all` replaces every
//! row inside one transaction so observers see either the old map or the new
//! one, never a mix.

use std::str::FromStr;

use rusqlite::params;
use tether_core::{Container, ContainerMap, Record, Role, TetherError};

use crate::database::{map_tr_err, Database};

pub async fn load_all(db: &Database) -> Result<ContainerMap, TetherError> {
    db.connection()
        .call(|conn| -> Result<ContainerMap, rusqlite::Error> {
            let mut containers = ContainerMap::new();

            let mut stmt = conn.prepare("SELECT id, title, updated_at FROM containers")?;
            let rows = stmt.query_map([], |row| {
                Ok(Container {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    records: Vec::new(),
                    updated_at: row.get(2)?,
                })
            })?;
            for container in rows {
                let container = container?;
                containers.insert(container.id.clone(), container);
            }

            let mut stmt = conn.prepare(
                "SELECT container_id, id, role, content, timestamp
                 FROM records
                 ORDER BY container_id, position ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                let container_id: String = row.get(0)?;
                let role: String = row.get(2)?;
                let role = Role::from_str(&role).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok((
                    container_id,
                    Record {
                        id: row.get(1)?,
                        role,
                        content: row.get(3)?,
                        timestamp: row.get(4)?,
                    },
                ))
            })?;
            for row in rows {
                let (container_id, record) = row?;
                if let Some(container) = containers.get_mut(&container_id) {
                    container.records.push(record);
                }
            }

            Ok(containers)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the stored map. Rows are keyed by the map key, not by the
/// container's own `id` field. A record id appearing in two containers
/// violates the primary key and rolls the whole write back.
pub async fn save_all(db: &Database, containers: ContainerMap) -> Result<(), TetherError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM records", [])?;
            tx.execute("DELETE FROM containers", [])?;
            {
                let mut insert_container = tx.prepare(
                    "INSERT INTO containers (id, title, updated_at) VALUES (?1, ?2, ?3)",
                )?;
                let mut insert_record = tx.prepare(
                    "INSERT INTO records (id, container_id, position, role, content, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (id, container) in &containers {
                    insert_container.execute(params![
                        id,
                        container.title,
                        container.updated_at
                    ])?;
                    for (position, record) in container.records.iter().enumerate() {
                        insert_record.execute(params![
                            record.id,
                            id,
                            position as i64,
                            record.role.to_string(),
                            record.content,
                            record.timestamp,
                        ])?;
                    }
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}
