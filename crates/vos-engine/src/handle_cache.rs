//! Object handle cache.
//!
//! A bounded LRU of hydrated object handles, realized with
//! `lru::LruCache` — the same crate the teacher already depends on and uses
//! elsewhere for bounded caches. Entries with a nonzero refcount are pinned:
//! when capacity forces a pop, the cache scans from LRU order looking for
//! the first zero-refcount entry to evict rather than trusting the
//! underlying `LruCache::pop_lru` to pick a safe victim.

use lru::LruCache;
use std::num::NonZeroUsize;
use vos_types::error::VosError;
use vos_types::ids::ObjectId;
use vos_types::Result;

/// Bookkeeping the cache keeps per held object, independent of the object
/// record itself (which lives in [`vos_storage::oi::ObjectIndex`]).
#[derive(Debug, Default)]
pub struct ObjectHandleEntry {
    refcount: u32,
}

impl ObjectHandleEntry {
    pub fn refcount(&self) -> u32 {
        self.refcount
    }
}

/// A bounded LRU of [`ObjectHandleEntry`] keyed by [`ObjectId`].
pub struct ObjectHandleCache {
    entries: LruCache<ObjectId, ObjectHandleEntry>,
}

impl ObjectHandleCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Increments the refcount of `oid`'s entry, creating it (marking it
    /// most-recently-used) if absent. If the cache is at capacity and no
    /// zero-refcount entry can be evicted to make room, returns `BUSY`.
    pub fn hold(&mut self, oid: ObjectId) -> Result<()> {
        if self.entries.get_mut(&oid).is_some() {
            // `get_mut` already marks it MRU; re-borrow to bump the count.
            if let Some(entry) = self.entries.get_mut(&oid) {
                entry.refcount += 1;
            }
            return Ok(());
        }

        if self.entries.len() == self.entries.cap().get() {
            self.evict_one_unheld()?;
        }
        self.entries.put(oid, ObjectHandleEntry { refcount: 1 });
        Ok(())
    }

    /// Decrements the refcount of `oid`'s entry. The entry remains cached
    /// (now a candidate for eviction) until capacity pressure reclaims it.
    pub fn release(&mut self, oid: ObjectId) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&oid)
            .ok_or_else(|| VosError::Invalid("release of an unheld object handle".into()))?;
        if entry.refcount == 0 {
            return Err(VosError::Invalid("refcount underflow on release".into()));
        }
        entry.refcount -= 1;
        Ok(())
    }

    /// Explicitly drops `oid` from the cache regardless of refcount,
    /// required after an object-level punch (§4.4) so the next fetch sees
    /// the new empty incarnation.
    pub fn evict(&mut self, oid: ObjectId) {
        self.entries.pop(&oid);
        vos_telemetry::metrics().inc_object_cache_evictions();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_one_unheld(&mut self) -> Result<()> {
        let victim = self
            .entries
            .iter()
            .rev() // LRU end first
            .find(|(_, entry)| entry.refcount() == 0)
            .map(|(oid, _)| *oid);

        match victim {
            Some(oid) => {
                self.entries.pop(&oid);
                vos_telemetry::metrics().inc_object_cache_evictions();
                Ok(())
            }
            None => Err(VosError::Busy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vos_types::ids::ObjectFeatureBits;

    fn oid(lo: u64) -> ObjectId {
        ObjectId::new(0, lo, ObjectFeatureBits::empty()).expect("valid oid")
    }

    #[test]
    fn hold_and_release_track_refcount() {
        let mut cache = ObjectHandleCache::new(4);
        cache.hold(oid(1)).expect("hold");
        cache.hold(oid(1)).expect("hold again");
        cache.release(oid(1)).expect("release");
        cache.release(oid(1)).expect("release again");
        assert!(cache.release(oid(1)).is_err());
    }

    #[test]
    fn eviction_skips_held_entries() {
        let mut cache = ObjectHandleCache::new(2);
        cache.hold(oid(1)).expect("hold 1");
        cache.hold(oid(2)).expect("hold 2");
        cache.release(oid(2)).expect("release 2");

        // oid(3) forces an eviction; oid(1) is held so oid(2) must go.
        cache.hold(oid(3)).expect("hold 3 evicts unheld");
        assert_eq!(cache.len(), 2);
        assert!(cache.release(oid(1)).is_ok());
        assert!(cache.release(oid(2)).is_err());
    }

    #[test]
    fn cache_full_of_held_entries_returns_busy() {
        let mut cache = ObjectHandleCache::new(1);
        cache.hold(oid(1)).expect("hold 1");
        let err = cache.hold(oid(2)).unwrap_err();
        assert!(matches!(err, VosError::Busy));
    }

    #[test]
    fn explicit_evict_removes_regardless_of_refcount() {
        let mut cache = ObjectHandleCache::new(2);
        cache.hold(oid(1)).expect("hold");
        cache.evict(oid(1));
        assert!(cache.is_empty());
    }
}
