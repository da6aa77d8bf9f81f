// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary-then-fallback composition of two queue backends.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tether_core::{PersistentQueue, QueuedMessage, SyncMetadata, TetherError};
use tracing::warn;

/// Routes every call to the primary backend and retries it on the fallback
/// when the primary is absent or fails.
///
/// Reads merge both backends so that items written to the fallback during a
/// transient primary failure stay visible. Deletes apply to both.
pub struct FallbackQueue {
    primary: Option<Arc<dyn PersistentQueue>>,
    fallback: Arc<dyn PersistentQueue>,
}

impl FallbackQueue {
    pub fn new(
        primary: Option<Arc<dyn PersistentQueue>>,
        fallback: Arc<dyn PersistentQueue>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    async fn route<'a, T, F>(&'a self, op: &'static str, call: F) -> Result<T, TetherError>
    where
        F: Fn(&'a dyn PersistentQueue) -> BoxFuture<'a, Result<T, TetherError>>,
    {
        if let Some(primary) = &self.primary {
            match call(primary.as_ref()).await {
                Ok(value) => return Ok(value),
                Err(e) => warn!(
                    op,
                    primary = primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "primary queue failed, using fallback"
                ),
            }
        }
        call(self.fallback.as_ref()).await
    }

    /// Run `call` on both backends. Fails only if every backend that exists failed.
    async fn both<'a, T, F>(&'a self, op: &'static str, call: F) -> Result<Vec<T>, TetherError>
    where
        F: Fn(&'a dyn PersistentQueue) -> BoxFuture<'a, Result<T, TetherError>>,
    {
        let mut results = Vec::with_capacity(2);
        let mut last_error = None;
        let backends = self
            .primary
            .iter()
            .chain(std::iter::once(&self.fallback));
        for backend in backends {
            match call(backend.as_ref()).await {
                Ok(value) => results.push(value),
                Err(e) => {
                    warn!(op, backend = backend.name(), error = %e, "queue backend failed");
                    last_error = Some(e);
                }
            }
        }
        match (results.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(results),
        }
    }
}

#[async_trait]
impl PersistentQueue for FallbackQueue {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn push(&self, message: &QueuedMessage) -> Result<(), TetherError> {
        self.route("push", |q| q.push(message)).await
    }

    async fn list(&self) -> Result<Vec<QueuedMessage>, TetherError> {
        let lists = self.both("list", |q| q.list()).await?;
        let mut seen = HashSet::new();
        let mut merged: Vec<QueuedMessage> = lists
            .into_iter()
            .flatten()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        // Stable: equal timestamps keep primary-first, insertion order.
        merged.sort_by_key(|m| m.timestamp);
        Ok(merged)
    }

    async fn count(&self) -> Result<usize, TetherError> {
        Ok(self.both("count", |q| q.count()).await?.into_iter().sum())
    }

    async fn remove(&self, id: &str) -> Result<bool, TetherError> {
        Ok(self
            .both("remove", |q| q.remove(id))
            .await?
            .into_iter()
            .any(|removed| removed))
    }

    async fn clear(&self) -> Result<(), TetherError> {
        self.both("clear", |q| q.clear()).await.map(|_| ())
    }

    async fn put_sync_metadata(&self, metadata: &SyncMetadata) -> Result<(), TetherError> {
        self.route("put_sync_metadata", |q| q.put_sync_metadata(metadata))
            .await
    }

    async fn sync_metadata(&self) -> Result<Option<SyncMetadata>, TetherError> {
        self.route("sync_metadata", |q| q.sync_metadata()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_queue::KvQueue;
    use tether_storage::MemoryKvStore;
    use tether_test_utils::{queued, FailingQueue};

    fn kv() -> Arc<KvQueue<MemoryKvStore>> {
        Arc::new(KvQueue::new(MemoryKvStore::new()))
    }

    fn compose(
        primary: Arc<dyn PersistentQueue>,
        fallback: Arc<dyn PersistentQueue>,
    ) -> FallbackQueue {
        FallbackQueue::new(Some(primary), fallback)
    }

    #[tokio::test]
    async fn healthy_primary_serves_writes() {
        let primary = kv();
        let fallback = kv();
        let queue = compose(primary.clone(), fallback.clone());

        queue.push(&queued("a", "hub", 1)).await.unwrap();
        assert_eq!(primary.count().await.unwrap(), 1);
        assert_eq!(fallback.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failing_primary_falls_back() {
        let primary = Arc::new(FailingQueue::new());
        let fallback = kv();
        let queue = compose(primary.clone(), fallback.clone());

        queue.push(&queued("a", "hub", 1)).await.unwrap();
        assert_eq!(fallback.count().await.unwrap(), 1);
        assert_eq!(queue.list().await.unwrap().len(), 1);
        assert!(primary.calls() >= 2);
    }

    #[tokio::test]
    async fn reads_merge_both_backends_by_timestamp() {
        let primary = kv();
        let fallback = kv();
        primary.push(&queued("p1", "hub", 10)).await.unwrap();
        primary.push(&queued("p2", "hub", 30)).await.unwrap();
        fallback.push(&queued("f1", "hub", 20)).await.unwrap();
        let queue = compose(primary, fallback);

        let ids: Vec<String> = queue.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, ["p1", "f1", "p2"]);
        assert_eq!(queue.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn remove_and_clear_reach_both_backends() {
        let primary = kv();
        let fallback = kv();
        primary.push(&queued("p1", "hub", 1)).await.unwrap();
        fallback.push(&queued("f1", "hub", 2)).await.unwrap();
        fallback.push(&queued("f2", "hub", 3)).await.unwrap();
        let queue = compose(primary.clone(), fallback.clone());

        assert!(queue.remove("f1").await.unwrap());
        assert!(!queue.remove("missing").await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 2);

        queue.clear().await.unwrap();
        assert_eq!(primary.count().await.unwrap(), 0);
        assert_eq!(fallback.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn both_backends_failing_is_an_error() {
        let queue = compose(Arc::new(FailingQueue::new()), Arc::new(FailingQueue::new()));
        assert!(queue.list().await.is_err());
        assert!(queue.push(&queued("a", "hub", 1)).await.is_err());
    }
}
