// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage capability behind the durable outbox.

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::{QueuedImage, QueuedMessage, SyncMetadata};

/// A backing store for queued outbound messages.
///
/// Implementations report failures as [`TetherError::Storage`]; deciding what
/// to do about a failure (falling back, returning a default) belongs to the
/// decorator that composes them.
#[async_trait]
pub trait PersistentQueue: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Persist a fully-formed message.
    async fn push(&self, message: &QueuedMessage) -> Result<(), TetherError>;

    /// All pending messages, oldest first.
    async fn list(&self) -> Result<Vec<QueuedMessage>, TetherError>;

    /// Number of pending messages.
    async fn count(&self) -> Result<usize, TetherError>;

    /// Delete a message. Returns whether it was present.
    async fn remove(&self, id: &str) -> Result<bool, TetherError>;

    /// Delete every pending message.
    async fn clear(&self) -> Result<(), TetherError>;

    /// Overwrite the singleton sync metadata record.
    async fn put_sync_metadata(&self, metadata: &SyncMetadata) -> Result<(), TetherError>;

    /// Read the singleton sync metadata record, if one was written.
    async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, TetherError>;
}

/// A backing store able to hold binary-scale image payloads.
///
/// Only the primary transactional store implements this.
#[async_trait]
pub trait ImageQueue: Send + Sync + 'static {
    async fn push_image(&self, image: &QueuedImage) -> Result<(), TetherError>;

    async fn list_images(&self) -> Result<Vec<QueuedImage>, TetherError>;

    async fn clear_images(&self) -> Result<(), TetherError>;
}
