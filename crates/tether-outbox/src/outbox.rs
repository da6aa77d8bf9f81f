// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capacity-checked outbox facade.
//!
//! Storage failures stop here. Every method returns a usable value (an empty
//! list, `false`, a default) and logs the failure; the only error a caller can
//! see is [`TetherError::CapacityExceeded`].

use std::sync::Arc;

use tether_config::OutboxConfig;
use tether_core::{
    now_millis, Admission, ImageQueue, NewMessage, PersistentQueue, QueuedImage, QueuedMessage,
    SyncMetadata, TetherError,
};
use tether_storage::{Database, FileKvStore};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::fallback::FallbackQueue;
use crate::kv_queue::KvQueue;
use crate::sqlite::SqliteQueue;

/// Result of [`Outbox::enqueue_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageQueueOutcome {
    Queued(String),
    /// The primary store is absent or refused the write. Images are never
    /// written to the fallback.
    Unavailable,
}

/// Fields to change in the sync metadata record. Unset fields keep their
/// stored value, except `last_sync_attempt`, which defaults to now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncUpdate {
    pub last_sync_attempt: Option<i64>,
    pub pending_count: Option<u64>,
    pub last_successful_sync: Option<i64>,
}

/// Durable queue for messages that could not be sent.
pub struct Outbox {
    queue: FallbackQueue,
    images: Option<Arc<dyn ImageQueue>>,
    database: Option<Database>,
    capacity: usize,
    /// Held from the capacity check through the write so concurrent
    /// enqueues cannot both take the last slot.
    admission: Mutex<()>,
}

impl Outbox {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(queue: FallbackQueue, images: Option<Arc<dyn ImageQueue>>, capacity: usize) -> Self {
        Self {
            queue,
            images,
            database: None,
            capacity,
            admission: Mutex::new(()),
        }
    }

    /// Open the SQLite primary and the file-backed fallback described by
    /// `config`. A primary that cannot be opened is logged and left out; the
    /// outbox then runs on the fallback alone.
    pub async fn open(config: &OutboxConfig) -> Self {
        let fallback: Arc<dyn PersistentQueue> =
            Arc::new(KvQueue::new(FileKvStore::new(&config.fallback_dir)));

        match Database::open(&config.database_path).await {
            Ok(db) => {
                let sqlite = Arc::new(SqliteQueue::new(db.clone()));
                let primary: Arc<dyn PersistentQueue> = sqlite.clone();
                info!(path = %config.database_path, "outbox primary store opened");
                Self {
                    queue: FallbackQueue::new(Some(primary), fallback),
                    images: Some(sqlite),
                    database: Some(db),
                    capacity: config.capacity,
                    admission: Mutex::new(()),
                }
            }
            Err(e) => {
                warn!(
                    path = %config.database_path,
                    fallback = %config.fallback_dir,
                    error = %e,
                    "outbox primary store unavailable, using key-value fallback only"
                );
                Self::new(FallbackQueue::new(None, fallback), None, config.capacity)
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_primary_available(&self) -> bool {
        self.queue.has_primary()
    }

    /// Whether one more message fits. The rejection reason is meant for the user.
    pub async fn can_enqueue(&self) -> Admission {
        if self.pending_count().await >= self.capacity {
            let reason = TetherError::CapacityExceeded {
                limit: self.capacity,
            };
            Admission::rejected(reason.to_string())
        } else {
            Admission::allowed()
        }
    }

    /// Persist `message` and return its new id.
    ///
    /// Fails only when the outbox is full, in which case nothing is written.
    /// If every backend refuses the write the id is still returned and the
    /// failure is logged.
    pub async fn enqueue(&self, message: NewMessage) -> Result<String, TetherError> {
        let _admission = self.admission.lock().await;
        if !self.can_enqueue().await.allowed {
            warn!(
                capacity = self.capacity,
                container_id = %message.container_id,
                "outbox full, message rejected"
            );
            return Err(TetherError::CapacityExceeded {
                limit: self.capacity,
            });
        }

        let queued = QueuedMessage {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            container_id: message.container_id,
            content: message.content,
            image_url: message.image_url,
            timestamp: now_millis(),
            retry_count: 0,
        };
        match self.queue.push(&queued).await {
            Ok(()) => debug!(id = %queued.id, container_id = %queued.container_id, "message queued"),
            Err(e) => error!(id = %queued.id, error = %e, "outbox write failed on every backend"),
        }
        Ok(queued.id)
    }

    /// Pending messages, oldest first.
    pub async fn list_pending(&self) -> Vec<QueuedMessage> {
        self.queue.list().await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot read outbox");
            Vec::new()
        })
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.count().await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot count outbox");
            0
        })
    }

    /// Delete one message, typically after it was delivered.
    pub async fn remove(&self, id: &str) -> bool {
        self.queue.remove(id).await.unwrap_or_else(|e| {
            warn!(id, error = %e, "cannot remove outbox message");
            false
        })
    }

    /// Empty the outbox on every backend.
    pub async fn clear(&self) {
        match self.queue.clear().await {
            Ok(()) => info!("outbox cleared"),
            Err(e) => warn!(error = %e, "cannot clear outbox"),
        }
    }

    /// Queue a screenshot for later upload. Primary store only.
    pub async fn enqueue_image(
        &self,
        container_id: &str,
        image_data: impl Into<String>,
    ) -> ImageQueueOutcome {
        let Some(images) = &self.images else {
            warn!(container_id, "image queue unavailable without the primary store");
            return ImageQueueOutcome::Unavailable;
        };
        let image = QueuedImage {
            id: format!("img_{}", Uuid::new_v4().simple()),
            container_id: container_id.to_string(),
            image_data: image_data.into(),
            timestamp: now_millis(),
        };
        match images.push_image(&image).await {
            Ok(()) => {
                debug!(id = %image.id, container_id, "image queued");
                ImageQueueOutcome::Queued(image.id)
            }
            Err(e) => {
                warn!(container_id, error = %e, "image queue write failed");
                ImageQueueOutcome::Unavailable
            }
        }
    }

    pub async fn pending_images(&self) -> Vec<QueuedImage> {
        let Some(images) = &self.images else {
            return Vec::new();
        };
        images.list_images().await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot read image queue");
            Vec::new()
        })
    }

    pub async fn clear_images(&self) {
        if let Some(images) = &self.images {
            if let Err(e) = images.clear_images().await {
                warn!(error = %e, "cannot clear image queue");
            }
        }
    }

    /// Record a drain attempt. Diagnostics only; failures are logged.
    pub async fn update_sync_metadata(&self, update: SyncUpdate) {
        let current = self.sync_metadata().await.unwrap_or_default();
        let next = SyncMetadata {
            last_sync_attempt: update.last_sync_attempt.unwrap_or_else(now_millis),
            pending_count: update.pending_count.unwrap_or(current.pending_count),
            last_successful_sync: update
                .last_successful_sync
                .unwrap_or(current.last_successful_sync),
        };
        if let Err(e) = self.queue.put_sync_metadata(&next).await {
            warn!(error = %e, "cannot write sync metadata");
        }
    }

    pub async fn sync_metadata(&self) -> Option<SyncMetadata> {
        self.queue.sync_metadata().await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot read sync metadata");
            None
        })
    }

    /// Checkpoint and close the primary database, if one is open.
    pub async fn close(self) -> Result<(), TetherError> {
        let Self { queue, images, database, .. } = self;
        drop(queue);
        drop(images);
        match database {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }
}
