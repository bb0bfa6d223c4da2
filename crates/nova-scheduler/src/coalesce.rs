use std::{collections::HashMap, hash::Hash};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::{CancellationToken, Cancelled};

/// Outcome of [`CoalescingQueue::insert_or_merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new entry was created and one permit was released.
    Inserted,
    /// The value was folded into an already pending entry; no permit was released.
    Merged,
}

/// A permit was granted but the pending map had nothing to hand out.
///
/// Permits and entries are kept one-to-one, so this only happens if the queue itself is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("coalescing queue signalled a permit without a pending entry ({permits} permits left)")]
pub struct QueueInvariantViolation {
    pub permits: usize,
}

struct Pending<K, V> {
    entries: HashMap<K, V>,
    last_access: Instant,
}

/// A keyed pending map paired with a counting signal.
///
/// At most one entry exists per key. Every entry owns exactly one permit of the signal, so a
/// consumer that successfully [`wait`](Self::wait)s is guaranteed an entry from
/// [`take_one`](Self::take_one). Which entry is handed out is unspecified.
///
/// The lock is only held to insert, merge or remove; it is never held across an `.await` and
/// the map is never iterated for callers.
pub struct CoalescingQueue<K, V> {
    pending: Mutex<Pending<K, V>>,
    signal: Semaphore,
}

impl<K, V> CoalescingQueue<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                entries: HashMap::new(),
                last_access: Instant::now(),
            }),
            signal: Semaphore::new(0),
        }
    }

    /// Inserts `value` under `key`, or folds it into the pending entry with `merge`.
    pub fn insert_or_merge<F>(&self, key: K, value: V, merge: F) -> Enqueued
    where
        F: FnOnce(&mut V, V),
    {
        let mut pending = self.pending.lock();
        pending.last_access = Instant::now();
        match pending.entries.get_mut(&key) {
            Some(existing) => {
                merge(existing, value);
                Enqueued::Merged
            }
            None => {
                pending.entries.insert(key, value);
                self.signal.add_permits(1);
                Enqueued::Inserted
            }
        }
    }

    /// Inserts `value` only if nothing is pending for `key`.
    ///
    /// A rejected value is handed back so the caller drops it outside the lock.
    pub fn insert_if_absent(&self, key: K, value: V) -> Result<(), V> {
        let mut pending = self.pending.lock();
        pending.last_access = Instant::now();
        if pending.entries.contains_key(&key) {
            return Err(value);
        }
        pending.entries.insert(key, value);
        self.signal.add_permits(1);
        Ok(())
    }

    /// Waits until at least one entry is pending and claims its permit.
    pub async fn wait(&self, token: &CancellationToken) -> Result<(), Cancelled> {
        Cancelled::check(token)?;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Cancelled),
            permit = self.signal.acquire() => {
                // The semaphore is never closed; treat closure like shutdown.
                permit.map_err(|_| Cancelled)?.forget();
                Ok(())
            }
        }
    }

    /// Removes one pending entry. Must only be called after a successful [`wait`](Self::wait).
    pub fn take_one(&self) -> Result<(K, V), QueueInvariantViolation> {
        let mut pending = self.pending.lock();
        let key = pending.entries.keys().next().cloned();
        match key.and_then(|key| pending.entries.remove_entry(&key)) {
            Some(entry) => Ok(entry),
            None => Err(QueueInvariantViolation {
                permits: self.signal.available_permits(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.pending.lock().entries.contains_key(key)
    }

    /// Inspects the entry pending for `key` without removing it.
    pub fn inspect<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.pending.lock().entries.get(key).map(f)
    }

    /// The last time anything was inserted or merged.
    pub fn last_access(&self) -> Instant {
        self.pending.lock().last_access
    }

    /// Permits not yet claimed by a consumer.
    pub fn available_permits(&self) -> usize {
        self.signal.available_permits()
    }

    /// Grants a permit with no entry behind it.
    #[cfg(test)]
    pub(crate) fn add_orphan_permit(&self) {
        self.signal.add_permits(1);
    }
}

impl<K, V> Default for CoalescingQueue<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
