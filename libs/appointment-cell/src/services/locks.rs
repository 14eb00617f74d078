// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use shared_models::slot::SlotKey;

type LockTable = HashMap<SlotKey, Arc<AsyncMutex<()>>>;

/// One async mutex per [`SlotKey`], created on demand.
///
/// Holders of different keys never wait on each other. An entry lives only
/// while a guard or a waiter references it.
#[derive(Clone, Default)]
pub struct SlotLockRegistry {
    table: Arc<Mutex<LockTable>>,
}

impl SlotLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: SlotKey) -> SlotGuard {
        let slot_mutex = {
            let mut table = lock_table(&self.table);
            Arc::clone(table.entry(key).or_default())
        };

        let guard = slot_mutex.lock_owned().await;
        debug!("Acquired slot lock {}", key);

        SlotGuard {
            key,
            table: Arc::clone(&self.table),
            guard: Some(guard),
        }
    }

    /// Keys that currently have a holder or a waiter.
    pub fn active_keys(&self) -> usize {
        lock_table(&self.table).len()
    }
}

// The table is only touched in short non-panicking sections, so a poisoned
// lock still holds a coherent map.
fn lock_table(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SlotGuard {
    key: SlotKey,
    table: Arc<Mutex<LockTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SlotGuard {
    pub fn key(&self) -> &SlotKey {
        &self.key
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut table = lock_table(&self.table);

        // Release the async mutex while the table is held so no new waiter can
        // clone the entry between the count check and the removal.
        self.guard.take();

        let unused = table
            .get(&self.key)
            .map(|slot_mutex| Arc::strong_count(slot_mutex) == 1)
            .unwrap_or(false);

        if unused {
            table.remove(&self.key);
        }

        debug!("Released slot lock {}", self.key);
    }
}
