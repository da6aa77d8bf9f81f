// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moves records between two containers with one store write.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tether_config::MigrationConfig;
use tether_core::{now_millis, ContainerMap, MigrationPrecondition, RecordStore, TetherError};
use tracing::{debug, info, warn};

use crate::key::MigrationKey;
use crate::lock::LockTable;

/// What a migration call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The combined map was written.
    Migrated {
        /// Ids appended to the destination.
        moved: Vec<String>,
        /// Ids removed from the source that the destination already held.
        duplicates_skipped: Vec<String>,
    },
    /// None of the requested ids were in the source. Nothing was written.
    NothingToMove,
    /// Another migration between the same pair holds the lock. Nothing was
    /// read or written, and the call is not retried.
    Skipped { key: MigrationKey },
}

pub struct MigrationCoordinator {
    store: Arc<dyn RecordStore>,
    locks: LockTable,
}

impl MigrationCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, config: &MigrationConfig) -> Self {
        Self::with_lock_timeout(store, config.lock_timeout())
    }

    pub fn with_lock_timeout(store: Arc<dyn RecordStore>, lock_timeout: Duration) -> Self {
        Self {
            store,
            locks: LockTable::new(lock_timeout),
        }
    }

    /// Whether a migration between `a` and `b` (either direction) is running.
    pub fn is_locked(&self, a: &str, b: &str) -> bool {
        self.locks.is_locked(&MigrationKey::new(a, b))
    }

    /// Move the records listed in `record_ids` from container `from` to
    /// container `to`.
    ///
    /// Source removal and destination append are written as one combined
    /// map, so observers see both halves or neither. Records already present
    /// in the destination are dropped from the source without being appended
    /// again, which makes repeated calls harmless.
    ///
    /// Missing containers and `from == to` fail before anything is written.
    /// Lock contention returns [`MigrationOutcome::Skipped`].
    pub async fn migrate_records<S: AsRef<str> + Sync>(
        &self,
        record_ids: &[S],
        from: &str,
        to: &str,
    ) -> Result<MigrationOutcome, TetherError> {
        if from == to {
            return Err(MigrationPrecondition::SameContainer {
                container_id: from.to_string(),
            }
            .into());
        }

        let key = MigrationKey::new(from, to);
        let Some(_guard) = self.locks.try_acquire(&key) else {
            warn!(%key, "migration already in progress, skipping");
            return Ok(MigrationOutcome::Skipped { key });
        };

        let requested: HashSet<&str> = record_ids.iter().map(AsRef::as_ref).collect();
        let mut containers = self.store.load_all(false).await?;

        let Some(mut source) = containers.remove(from) else {
            return Err(MigrationPrecondition::SourceMissing {
                container_id: from.to_string(),
                available: containers_ids(&containers),
            }
            .into());
        };
        let Some(mut destination) = containers.remove(to) else {
            let mut available = containers_ids(&containers);
            available.push(from.to_string());
            available.sort();
            return Err(MigrationPrecondition::DestinationMissing {
                container_id: to.to_string(),
                available,
            }
            .into());
        };

        let (matched, remaining): (Vec<_>, Vec<_>) = source
            .records
            .into_iter()
            .partition(|r| requested.contains(r.id.as_str()));
        if matched.is_empty() {
            debug!(from, to, requested = requested.len(), "no requested records in source");
            return Ok(MigrationOutcome::NothingToMove);
        }

        let (duplicates, to_add): (Vec<_>, Vec<_>) =
            matched.into_iter().partition(|r| destination.contains(&r.id));
        let moved: Vec<String> = to_add.iter().map(|r| r.id.clone()).collect();
        let duplicates_skipped: Vec<String> = duplicates.iter().map(|r| r.id.clone()).collect();

        let now = now_millis();
        source.records = remaining;
        source.updated_at = now;
        destination.records.extend(to_add);
        destination.updated_at = now;

        let source_len = source.records.len();
        let destination_len = destination.records.len();
        containers.insert(from.to_string(), source);
        containers.insert(to.to_string(), destination);
        self.store.save_all(containers).await?;

        info!(
            from,
            to,
            moved = moved.len(),
            duplicates_skipped = duplicates_skipped.len(),
            source_len,
            destination_len,
            "records migrated"
        );
        Ok(MigrationOutcome::Migrated {
            moved,
            duplicates_skipped,
        })
    }
}

fn containers_ids(containers: &ContainerMap) -> Vec<String> {
    containers.keys().cloned().collect()
}
