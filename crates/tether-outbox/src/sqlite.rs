// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary queue backend on the SQLite database.

use async_trait::async_trait;
use tether_core::{ImageQueue, PersistentQueue, QueuedImage, QueuedMessage, SyncMetadata, TetherError};
use tether_storage::queries::{images, messages, sync_meta};
use tether_storage::Database;

/// Pending messages, images and sync metadata in their own tables.
#[derive(Clone)]
pub struct SqliteQueue {
    db: Database,
}

impl SqliteQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PersistentQueue for SqliteQueue {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn push(&self, message: &QueuedMessage) -> Result<(), TetherError> {
        messages::insert(&self.db, message).await
    }

    async fn list(&self) -> Result<Vec<QueuedMessage>, TetherError> {
        messages::list(&self.db).await
    }

    async fn count(&self) -> Result<usize, TetherError> {
        messages::count(&self.db).await
    }

    async fn remove(&self, id: &str) -> Result<bool, TetherError> {
        messages::delete(&self.db, id).await
    }

    async fn clear(&self) -> Result<(), TetherError> {
        messages::delete_all(&self.db).await
    }

    async fn put_sync_metadata(&self, metadata: &SyncMetadata) -> Result<(), TetherError> {
        sync_meta::put(&self.db, metadata).await
    }

    async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, TetherError> {
        sync_meta::get(&self.db).await
    }
}

#[async_trait]
impl ImageQueue for SqliteQueue {
    async fn push_image(&self, image: &QueuedImage) -> Result<(), TetherError> {
        images::insert(&self.db, image).await
    }

    async fn list_images(&self) -> Result<Vec<QueuedImage>, TetherError> {
        images::list(&self.db).await
    }

    async fn clear_images(&self) -> Result<(), TetherError> {
        images::delete_all(&self.db).await
    }
}
