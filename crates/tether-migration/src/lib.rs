// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration coordinator for the Tether sync core.
//!
//! Moves a set of records from one container to another under an advisory
//! lock keyed by the unordered container pair. The lock expires on its own
//! after a timeout so a stalled migration cannot block the pair forever.

pub mod coordinator;
pub mod key;
pub mod lock;
pub mod routing;

pub use coordinator::{MigrationCoordinator, MigrationOutcome};
pub use key::MigrationKey;
pub use lock::{LockTable, MigrationGuard};
pub use routing::should_route;
