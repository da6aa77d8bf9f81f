// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fallback queue backend: the whole pending list as one JSON value.
//!
//! No transactions and no images. Every mutation rewrites the list, which is
//! acceptable at a capacity of a handful of messages.

use async_trait::async_trait;
use tether_core::{PersistentQueue, QueuedMessage, SyncMetadata, TetherError};
use tether_storage::KvStore;
use tokio::sync::Mutex;

/// Key holding the serialized pending list.
pub const PENDING_KEY: &str = "tether_pending_messages";
/// Key holding the serialized sync metadata.
pub const SYNC_METADATA_KEY: &str = "tether_sync_metadata";

pub struct KvQueue<S> {
    store: S,
    /// Serializes read-modify-write cycles on the list.
    write_lock: Mutex<()>,
}

impl<S: KvStore> KvQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read(&self) -> Result<Vec<QueuedMessage>, TetherError> {
        match self.store.get(PENDING_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, messages: &[QueuedMessage]) -> Result<(), TetherError> {
        let raw = serde_json::to_string(messages)?;
        self.store.set(PENDING_KEY, &raw).await
    }
}

#[async_trait]
impl<S: KvStore> PersistentQueue for KvQueue<S> {
    fn name(&self) -> &str {
        "kv"
    }

    async fn push(&self, message: &QueuedMessage) -> Result<(), TetherError> {
        let _guard = self.write_lock.lock().await;
        let mut messages = self.read().await?;
        messages.push(message.clone());
        self.write(&messages).await
    }

    async fn list(&self) -> Result<Vec<QueuedMessage>, TetherError> {
        self.read().await
    }

    async fn count(&self) -> Result<usize, TetherError> {
        Ok(self.read().await?.len())
    }

    async fn remove(&self, id: &str) -> Result<bool, TetherError> {
        let _guard = self.write_lock.lock().await;
        let mut messages = self.read().await?;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Ok(false);
        }
        self.write(&messages).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<(), TetherError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(PENDING_KEY).await
    }

    async fn put_sync_metadata(&self, metadata: &SyncMetadata) -> Result<(), TetherError> {
        let raw = serde_json::to_string(metadata)?;
        self.store.set(SYNC_METADATA_KEY, &raw).await
    }

    async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, TetherError> {
        match self.store.get(SYNC_METADATA_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_storage::MemoryKvStore;
    use tether_test_utils::queued;

    #[tokio::test]
    async fn push_list_remove() {
        let queue = KvQueue::new(MemoryKvStore::new());
        queue.push(&queued("a", "hub", 1)).await.unwrap();
        queue.push(&queued("b", "hub", 2)).await.unwrap();

        let ids: Vec<String> = queue.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(queue.remove("a").await.unwrap());
        assert!(!queue.remove("a").await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stored_shape_is_a_camel_case_list() {
        let queue = KvQueue::new(MemoryKvStore::new());
        queue.push(&queued("a", "hub", 7)).await.unwrap();

        let raw = queue.store().get(PENDING_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["containerId"], "hub");
        assert_eq!(value[0]["retryCount"], 0);
    }

    #[tokio::test]
    async fn clear_drops_the_key() {
        let queue = KvQueue::new(MemoryKvStore::new());
        queue.push(&queued("a", "hub", 1)).await.unwrap();
        queue.clear().await.unwrap();
        assert!(queue.store().get(PENDING_KEY).await.unwrap().is_none());
        assert!(queue.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_list_is_an_error() {
        let queue = KvQueue::new(MemoryKvStore::new());
        queue.store().set(PENDING_KEY, "{not json").await.unwrap();
        assert!(matches!(
            queue.list().await,
            Err(TetherError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn sync_metadata_round_trips() {
        let queue = KvQueue::new(MemoryKvStore::new());
        assert_eq!(queue.sync_metadata().await.unwrap(), None);
        let meta = SyncMetadata {
            last_sync_attempt: 10,
            pending_count: 2,
            last_successful_sync: 5,
        };
        queue.put_sync_metadata(&meta).await.unwrap();
        assert_eq!(queue.sync_metadata().await.unwrap(), Some(meta));
    }
}
