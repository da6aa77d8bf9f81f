// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract consumed from the persistent record store.

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::ContainerMap;

/// Whole-map load/save of containers.
///
/// Both operations are atomic from the caller's point of view. Writers perform
/// read-modify-write cycles over the entire map; containers are never
/// partially updated.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Load every container.
    ///
    /// With `bypass_cache == false` the most recent in-memory view is
    /// preferred, which includes containers created moments earlier in the
    /// same session that a forced refetch may not yet see.
    async fn load_all(&self, bypass_cache: bool) -> Result<ContainerMap, TetherError>;

    /// Replace the stored map with `containers` in a single write.
    async fn save_all(&self, containers: ContainerMap) -> Result<(), TetherError>;
}
