// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the sync core.
//!
//! All traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for in-memory doubles in tests.

pub mod queue;
pub mod record_store;

pub use queue::{ImageQueue, PersistentQueue};
pub use record_store::RecordStore;
