// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A persistent queue that is always broken, for exercising fallback paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tether_core::{ImageQueue, PersistentQueue, QueuedImage, QueuedMessage, SyncMetadata, TetherError};

/// Every operation fails with a storage error. Counts how often it was tried.
#[derive(Debug, Default)]
pub struct FailingQueue {
    calls: AtomicUsize,
}

impl FailingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, op: &str) -> Result<T, TetherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TetherError::storage_msg(format!("{op}: database is locked")))
    }
}

#[async_trait]
impl PersistentQueue for FailingQueue {
    fn name(&self) -> &str {
        "failing"
    }

    async fn push(&self, _message: &QueuedMessage) -> Result<(), TetherError> {
        self.fail("push")
    }

    async fn list(&self) -> Result<Vec<QueuedMessage>, TetherError> {
        self.fail("list")
    }

    async fn count(&self) -> Result<usize, TetherError> {
        self.fail("count")
    }

    async fn remove(&self, _id: &str) -> Result<bool, TetherError> {
        self.fail("remove")
    }

    async fn clear(&self) -> Result<(), TetherError> {
        self.fail("clear")
    }

    async fn put_sync_metadata(&self, _metadata: &SyncMetadata) -> Result<(), TetherError> {
        self.fail("put_sync_metadata")
    }

    async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, TetherError> {
        self.fail("sync_metadata")
    }
}

#[async_trait]
impl ImageQueue for FailingQueue {
    async fn push_image(&self, _image: &QueuedImage) -> Result<(), TetherError> {
        self.fail("push_image")
    }

    async fn list_images(&self) -> Result<Vec<QueuedImage>, TetherError> {
        self.fail("list_images")
    }

    async fn clear_images(&self) -> Result<(), TetherError> {
        self.fail("clear_images")
    }
}
