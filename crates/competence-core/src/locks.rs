//! Per-key async mutual exclusion.
//!
//! Each key gets its own `tokio::sync::Mutex`, created on first use and
//! dropped from the table once no task holds or waits for it. Tasks working on
//! different keys never contend on the same lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

/// A table of async locks addressed by key.
pub struct KeyedLocks<K> {
    table: Mutex<HashMap<K, Slot>>,
}

// `users` counts holders and waiters. It is taken before waiting starts and
// given back by the guard's drop, so a waiter cancelled mid-wait still
// releases its share.
struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Access lasts until the returned
    /// guard is dropped.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = table.entry(key.clone()).or_insert_with(|| Slot {
                mutex: Arc::default(),
                users: 0,
            });
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };
        let mut entry = KeyGuard {
            locks: self,
            key: Some(key),
            guard: None,
        };
        entry.guard = Some(mutex.lock_owned().await);
        entry
    }

    /// Number of keys currently locked or awaited.
    pub fn active_keys(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, key: &K) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = table.get_mut(key) {
            slot.users -= 1;
            if slot.users == 0 {
                table.remove(key);
            }
        }
    }
}

/// Exclusive access to one key of a [`KeyedLocks`] table.
pub struct KeyGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a KeyedLocks<K>,
    key: Option<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Some(key) = self.key.take() {
            self.locks.release(&key);
        }
    }
}
