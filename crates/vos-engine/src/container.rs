//! Container lifecycle glue.
//!
//! A container owns one [`ObjectIndex`], one [`ObjectHandleCache`], and
//! shares its pool's [`Pm`] transaction shim and [`Bio`] bridge. Per §5, a
//! container's state is owned by a single xstream for its lifetime; this
//! struct is not `Sync` by design (its fields are only ever touched from
//! the task that opened it).

use std::sync::Arc;
use vos_storage::bio::Bio;
use vos_storage::oi::ObjectIndex;
use vos_storage::pm::Pm;
use vos_types::ids::ContainerId;

use crate::handle_cache::ObjectHandleCache;

/// An open container: the object index plus the handle cache bounding how
/// many hydrated objects it keeps warm.
pub struct Container {
    pub(crate) id: ContainerId,
    pub(crate) pm: Arc<Pm>,
    pub(crate) bio: Bio,
    pub(crate) object_index: ObjectIndex,
    pub(crate) handle_cache: ObjectHandleCache,
    pub(crate) inline_threshold_bytes: usize,
    /// Monotonic write cursor for the NVMe blob. A real NVMe allocator would
    /// recycle freed extents; this bridge only ever appends (§4.7).
    pub(crate) nvme_cursor: u64,
    /// Monotonic byte-offset cursor for inline SCM payloads. Distinct from
    /// `pm`'s own record-id allocator: `RecAddr::Scm` addresses a byte range
    /// in the `Bio`-owned mmap directly, not a PM record.
    pub(crate) scm_cursor: u64,
}

impl Container {
    pub fn new(
        id: ContainerId,
        pm: Arc<Pm>,
        bio: Bio,
        object_cache_capacity: usize,
        inline_threshold_bytes: usize,
    ) -> Self {
        tracing::info!(container = ?id.0, "container opened");
        Self {
            id,
            pm,
            bio,
            object_index: ObjectIndex::new(),
            handle_cache: ObjectHandleCache::new(object_cache_capacity),
            inline_threshold_bytes,
            nvme_cursor: 0,
            scm_cursor: 1, // 0 is reserved for PmAddr::NIL
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn close(self) {
        tracing::info!(container = ?self.id.0, "container closed");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn open_test_container() -> (Container, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pm = Pm::open(dir.path().join("pool.redb")).expect("open pm");
        let bio = Bio::open(
            dir.path().join("pool.scm"),
            1 << 20,
            dir.path().join("blob.nvme"),
        )
        .expect("open bio");
        let container = Container::new(
            ContainerId(uuid::Uuid::nil()),
            Arc::new(pm),
            bio,
            64,
            crate::iod::DEFAULT_INLINE_THRESHOLD_BYTES,
        );
        (container, dir)
    }
}
