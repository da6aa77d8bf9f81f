// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All reads and writes go through one `tokio_rusqlite::Connection`, which
//! serializes closures on a single background thread. Do NOT open additional
//! connections for writes.

use std::path::Path;
use std::time::Duration;

use tether_core::TetherError;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the SQLite database. Cheap to clone; clones share the writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub async fn open(path: &str) -> Result<Self, TetherError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(TetherError::storage)?;
            }
        }

        // Migrations need a plain `&mut rusqlite::Connection`, so they run on a
        // short-lived connection before the serialized writer is opened.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), TetherError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(TetherError::storage)?;
            apply_pragmas(&conn).map_err(TetherError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TetherError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path.to_string())
            .await
            .map_err(|e| TetherError::storage_msg(format!("failed to open {path}: {e}")))?;
        conn.call(|conn| -> Result<(), rusqlite::Error> { apply_pragmas(conn) })
            .await
            .map_err(map_tr_err)?;

        info!(path, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The serialized connection all queries go through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TetherError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .close()
            .await
            .map_err(|e| TetherError::storage_msg(format!("failed to close database: {e}")))?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

fn apply_pragmas(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

/// Convert a tokio-rusqlite error into a storage failure.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TetherError {
    TetherError::storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/tether.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_applies_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("schema.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .unwrap();

        for table in ["containers", "pending_images", "pending_messages", "records", "sync_metadata"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
    }

    #[tokio::test]
    async fn open_fails_when_path_is_a_directory() {
        let dir = tempdir().unwrap();
        let result = Database::open(dir.path().to_str().unwrap()).await;
        assert!(matches!(result, Err(TetherError::Storage { .. })));
    }
}
