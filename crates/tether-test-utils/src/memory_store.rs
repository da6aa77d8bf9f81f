// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory record store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tether_core::{Container, ContainerMap, RecordStore, TetherError};

/// A record store backed by a map, with knobs for slow or failing writes.
///
/// `latency` is awaited inside both `load_all` and `save_all`, which widens
/// the window in which concurrent callers can interleave.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    containers: Mutex<ContainerMap>,
    latency: Option<Duration>,
    fail_saves: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new(containers: impl IntoIterator<Item = Container>) -> Self {
        Self {
            containers: Mutex::new(
                containers
                    .into_iter()
                    .map(|c| (c.id.clone(), c))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every following `save_all` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored map.
    pub async fn snapshot(&self) -> ContainerMap {
        self.containers.lock().await.clone()
    }

    /// Ids of the records in `container_id`, or `None` if it does not exist.
    pub async fn record_ids(&self, container_id: &str) -> Option<Vec<String>> {
        self.containers
            .lock()
            .await
            .get(container_id)
            .map(|c| c.records.iter().map(|r| r.id.clone()).collect())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_all(&self, _bypass_cache: bool) -> Result<ContainerMap, TetherError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.containers.lock().await.clone())
    }

    async fn save_all(&self, containers: ContainerMap) -> Result<(), TetherError> {
        self.delay().await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TetherError::storage_msg("write rejected"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.containers.lock().await = containers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::container;

    #[tokio::test]
    async fn save_replaces_the_whole_map() {
        let store = MemoryRecordStore::new([container("hub", &["m1"])]);
        let mut map = store.load_all(false).await.unwrap();
        map.insert("zelda".into(), container("zelda", &["m2"]));
        store.save_all(map).await.unwrap();

        assert_eq!(store.record_ids("zelda").await, Some(vec!["m2".to_string()]));
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn failed_save_leaves_data_alone() {
        let store = MemoryRecordStore::new([container("hub", &["m1"])]);
        store.fail_saves(true);
        assert!(store.save_all(ContainerMap::new()).await.is_err());
        assert_eq!(store.record_ids("hub").await, Some(vec!["m1".to_string()]));
    }
}
