//! Per-key async mutual exclusion.
//!
//! Checks of the same domain must not interleave: two ticks racing through
//! the throttle window would both query the registry and could both send the
//! same notification. Different keys never contend.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// A set of async mutexes created on demand, one per key.
///
/// Entries nobody holds or waits on are pruned whenever a lock is taken, so
/// the map stays proportional to the number of in-flight keys.
pub struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for exclusive access to `key`; released when the guard drops.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut entries = match self.entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("Keyed lock map poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            entries.retain(|_, m| Arc::strong_count(m) > 1);
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        if mutex.try_lock().is_err() {
            debug!(?key, "Waiting for in-flight check");
        }
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked (held, awaited, or not yet pruned).
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
