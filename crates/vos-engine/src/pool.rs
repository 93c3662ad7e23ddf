//! Pool lifecycle glue.
//!
//! A pool owns the PM file and NVMe blob; containers are opened lazily and
//! registered in a map that is, per §5, "the one structure genuinely shared
//! across xstreams" — guarded with `parking_lot::Mutex` accordingly.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vos_storage::bio::Bio;
use vos_storage::pm::Pm;
use vos_types::ids::ContainerId;
use vos_types::ids::PoolId;
use vos_types::{config::VosConfig, error::VosError, Result};

use crate::container::Container;

struct OpenPool {
    pm: Arc<Pm>,
    scm_path: PathBuf,
    nvme_path: PathBuf,
    config: VosConfig,
}

/// A registry of open pools, keyed by [`PoolId`]. Exactly one open handle
/// per process-thread is the caller's responsibility (§3 Pool invariant);
/// this registry only guards concurrent *registration*.
#[derive(Default)]
pub struct Pool {
    open: Mutex<AHashMap<PoolId, OpenPool>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (creating if necessary) the pool's PM file at `scm_path` and
    /// registers it under `pool_id`, using `config` for NVMe blob placement
    /// and per-container cache sizing.
    pub fn open(
        &self,
        pool_id: PoolId,
        scm_path: impl AsRef<Path>,
        nvme_path: impl AsRef<Path>,
        config: VosConfig,
    ) -> Result<()> {
        let pm = Pm::open(scm_path.as_ref())?;
        let mut guard = self.open.lock();
        if guard.contains_key(&pool_id) {
            return Err(VosError::AlreadyExists);
        }
        guard.insert(
            pool_id,
            OpenPool {
                pm: Arc::new(pm),
                scm_path: scm_path.as_ref().to_path_buf(),
                nvme_path: nvme_path.as_ref().to_path_buf(),
                config,
            },
        );
        tracing::info!(pool = ?pool_id.0, "pool opened");
        Ok(())
    }

    /// Opens `container_id` under `pool_id`, failing `NO_HDL` if the pool
    /// itself is not open.
    pub fn open_container(&self, pool_id: PoolId, container_id: ContainerId) -> Result<Container> {
        let guard = self.open.lock();
        let entry = guard.get(&pool_id).ok_or(VosError::NoHandle)?;
        let bio = Bio::open(
            &entry.scm_path,
            entry.config.scm_size_gb * (1 << 30),
            &entry.nvme_path,
        )?;
        Ok(Container::new(
            container_id,
            entry.pm.clone(),
            bio,
            entry.config.object_cache_capacity,
            entry.config.epoch_inline_threshold_bytes as usize,
        ))
    }

    pub fn close(&self, pool_id: PoolId) -> Result<()> {
        let mut guard = self.open.lock();
        guard.remove(&pool_id).ok_or(VosError::NoHandle)?;
        tracing::info!(pool = ?pool_id.0, "pool closed");
        Ok(())
    }

    pub fn is_open(&self, pool_id: PoolId) -> bool {
        self.open.lock().contains_key(&pool_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn double_open_of_the_same_pool_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Pool::new();
        let pool_id = PoolId(Uuid::nil());
        registry
            .open(
                pool_id,
                dir.path().join("pool.redb"),
                dir.path().join("blob.nvme"),
                VosConfig::default(),
            )
            .expect("first open");
        let err = registry
            .open(
                pool_id,
                dir.path().join("pool.redb"),
                dir.path().join("blob.nvme"),
                VosConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, VosError::AlreadyExists));
    }

    #[test]
    fn closing_an_unopened_pool_returns_no_handle() {
        let registry = Pool::new();
        let err = registry.close(PoolId(Uuid::nil())).unwrap_err();
        assert!(matches!(err, VosError::NoHandle));
    }

    #[test]
    fn open_container_requires_the_pool_to_be_open() {
        let registry = Pool::new();
        let err = registry
            .open_container(PoolId(Uuid::nil()), ContainerId(Uuid::nil()))
            .unwrap_err();
        assert!(matches!(err, VosError::NoHandle));
    }
}
