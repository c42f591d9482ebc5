use std::convert::Infallible;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

// ---------------------------------------------------------------------------
// TTL memoization cache
// ---------------------------------------------------------------------------

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Memoizes `key → Arc<V>` with an optional time-to-live.
///
/// The sharded key map is locked only long enough to find or create the
/// key's slot; the slot's own lock is held while the value is computed, so
/// simultaneous first requests for one key compute it once while other keys
/// proceed in parallel.  Failed computations leave the slot empty.
pub struct TtlCache<K, V> {
    ttl: Option<Duration>,
    slots: DashMap<K, Slot<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Entries expire `ttl` after they were stored.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            slots: DashMap::new(),
        }
    }

    /// Entries live until the process exits.
    pub fn unbounded() -> Self {
        Self {
            ttl: None,
            slots: DashMap::new(),
        }
    }

    fn is_fresh(&self, entry: &Entry<V>) -> bool {
        self.ttl.map_or(true, |ttl| entry.stored_at.elapsed() < ttl)
    }

    /// The shard guard is released before the caller locks the slot.
    fn slot(&self, key: &K) -> Slot<V> {
        self.slots.entry(key.clone()).or_default().clone()
    }

    /// Return the cached value for `key`, or compute, store and return it.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        init: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        let slot = self.slot(key);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entry.as_ref().filter(|e| self.is_fresh(e)) {
            return Ok(existing.value.clone());
        }

        let value = Arc::new(init()?);
        *entry = Some(Entry {
            value: value.clone(),
            stored_at: Instant::now(),
        });
        Ok(value)
    }

    pub fn get_or_insert_with(&self, key: &K, init: impl FnOnce() -> V) -> Arc<V> {
        match self.get_or_try_insert_with(key, || Ok::<_, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Drop expired and empty slots.  Returns how many were removed.
    ///
    /// Slots whose lock is held (a computation in flight) are kept.
    pub fn purge_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(entry) => entry.as_ref().is_some_and(|e| self.is_fresh(e)),
            Err(_) => true,
        });
        before.saturating_sub(self.slots.len())
    }

    /// Number of keys with a slot, fresh or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
