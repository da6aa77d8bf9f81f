// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`RecordStore`] collaborator.

use async_trait::async_trait;
use tether_core::{ContainerMap, RecordStore, TetherError};
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::Database;
use crate::queries;

/// Container map persisted in SQLite with an in-memory view.
///
/// `load_all(false)` answers from the view once it is populated; every
/// successful `save_all` replaces the view with what was written.
pub struct SqliteRecordStore {
    db: Database,
    cache: RwLock<Option<ContainerMap>>,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn load_all(&self, bypass_cache: bool) -> Result<ContainerMap, TetherError> {
        if !bypass_cache {
            if let Some(cached) = self.cache.read().await.as_ref() {
                return Ok(cached.clone());
            }
        }
        let loaded = queries::containers::load_all(&self.db).await?;
        debug!(containers = loaded.len(), bypass_cache, "container map loaded");
        *self.cache.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    async fn save_all(&self, containers: ContainerMap) -> Result<(), TetherError> {
        queries::containers::save_all(&self.db, containers.clone()).await?;
        *self.cache.write().await = Some(containers);
        Ok(())
    }
}
