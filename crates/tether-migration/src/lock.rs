// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory, process-local migration locks with automatic expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::key::MigrationKey;

type Held = Arc<Mutex<HashMap<MigrationKey, u64>>>;

/// Set of container pairs currently being migrated.
///
/// Each acquisition gets a token. Release (guard drop) and expiry only remove
/// the entry if it still carries their token, so a lock that expired and was
/// re-acquired is never released by the earlier holder.
#[derive(Debug)]
pub struct LockTable {
    held: Held,
    next_token: AtomicU64,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Take the lock for `key`, or `None` if it is held.
    ///
    /// Must be called inside a Tokio runtime; the expiry timer is a task.
    pub fn try_acquire(&self, key: &MigrationKey) -> Option<MigrationGuard> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut held = lock(&self.held);
            if held.contains_key(key) {
                return None;
            }
            held.insert(key.clone(), token);
        }

        let expiry = {
            let held = Arc::clone(&self.held);
            let key = key.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if release(&held, &key, token) {
                    warn!(%key, timeout_ms = timeout.as_millis() as u64, "migration lock expired");
                }
            })
        };

        debug!(%key, token, "migration lock acquired");
        Some(MigrationGuard {
            held: Arc::clone(&self.held),
            key: key.clone(),
            token,
            expiry,
        })
    }

    pub fn is_locked(&self, key: &MigrationKey) -> bool {
        lock(&self.held).contains_key(key)
    }
}

/// Releases its lock when dropped, on every exit path.
#[derive(Debug)]
pub struct MigrationGuard {
    held: Held,
    key: MigrationKey,
    token: u64,
    expiry: JoinHandle<()>,
}

impl MigrationGuard {
    pub fn key(&self) -> &MigrationKey {
        &self.key
    }
}

impl Drop for MigrationGuard {
    fn drop(&mut self) {
        self.expiry.abort();
        if release(&self.held, &self.key, self.token) {
            debug!(key = %self.key, "migration lock released");
        }
    }
}

fn lock(held: &Held) -> MutexGuard<'_, HashMap<MigrationKey, u64>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remove `key` if `token` still owns it.
fn release(held: &Held, key: &MigrationKey, token: u64) -> bool {
    let mut held = lock(held);
    if held.get(key) == Some(&token) {
        held.remove(key);
        true
    } else {
        false
    }
}
