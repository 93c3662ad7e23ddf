//! Per-instance configuration for a VOS pool.
//!
//! Mirrors the shared-config convention used elsewhere in the codebase:
//! a `serde`-deserializable struct with `#[serde(default = ...)]` on every
//! field, so a minimal (even empty) TOML document is always valid.

use serde::{Deserialize, Serialize};

/// Selects how the PM pool's storage class media is emulated or backed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScmClass {
    /// Emulate PM on tmpfs (`scm_size` governs the ramdisk size).
    Ram,
    /// Use real DCPM (App Direct mode) hardware.
    Dcpm,
}

impl Default for ScmClass {
    fn default() -> Self {
        Self::Ram
    }
}

/// Selects the backing block device class used for bulk (NVMe-resident) payloads.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BdevClass {
    /// A real NVMe SSD.
    Nvme,
    /// An in-memory block device, useful for tests.
    Malloc,
    /// A kernel block device (e.g. `/dev/sdb`).
    Kdev,
    /// A plain file used as a block device.
    File,
}

impl Default for BdevClass {
    fn default() -> Self {
        Self::File
    }
}

fn default_scm_size_gb() -> u64 {
    4
}
fn default_scm_mount() -> String {
    "/mnt/vos".to_string()
}
fn default_bdev_list() -> Vec<String> {
    Vec::new()
}
fn default_targets() -> u32 {
    1
}
fn default_nr_xs_helpers() -> u32 {
    1
}
fn default_first_core() -> u32 {
    0
}
fn default_inline_threshold() -> u64 {
    4096
}
fn default_object_cache_capacity() -> usize {
    4096
}
fn default_log_filter() -> String {
    "info".to_string()
}

/// The full per-instance VOS configuration (§6.4 of the design document).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VosConfig {
    /// How the SCM (storage-class memory / PM) tier is backed.
    #[serde(default)]
    pub scm_class: ScmClass,
    /// Ramdisk size in GiB; only consulted when `scm_class == Ram`.
    #[serde(default = "default_scm_size_gb")]
    pub scm_size_gb: u64,
    /// Filesystem path at which the PM pool file is created/opened.
    #[serde(default = "default_scm_mount")]
    pub scm_mount: String,
    /// Backing class for bulk array payloads.
    #[serde(default)]
    pub bdev_class: BdevClass,
    /// Backing device paths/identifiers for `bdev_class`.
    #[serde(default = "default_bdev_list")]
    pub bdev_list: Vec<String>,
    /// Number of VOS targets (xstreams dedicated to application I/O).
    #[serde(default = "default_targets")]
    pub targets: u32,
    /// Number of helper xstreams assisting the main targets.
    #[serde(default = "default_nr_xs_helpers")]
    pub nr_xs_helpers: u32,
    /// The first CPU core this instance's xstreams are pinned to.
    #[serde(default = "default_first_core")]
    pub first_core: u32,
    /// Array payloads at or above this size are placed on NVMe rather than SCM.
    #[serde(default = "default_inline_threshold")]
    pub epoch_inline_threshold_bytes: u64,
    /// Bound on the number of hydrated objects kept in the handle cache.
    #[serde(default = "default_object_cache_capacity")]
    pub object_cache_capacity: usize,
    /// Whether the Prometheus metrics sink is installed.
    #[serde(default)]
    pub metrics_enabled: bool,
    /// The `tracing` `EnvFilter` directive used when metrics/logging init runs standalone.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for VosConfig {
    fn default() -> Self {
        Self {
            scm_class: ScmClass::default(),
            scm_size_gb: default_scm_size_gb(),
            scm_mount: default_scm_mount(),
            bdev_class: BdevClass::default(),
            bdev_list: default_bdev_list(),
            targets: default_targets(),
            nr_xs_helpers: default_nr_xs_helpers(),
            first_core: default_first_core(),
            epoch_inline_threshold_bytes: default_inline_threshold(),
            object_cache_capacity: default_object_cache_capacity(),
            metrics_enabled: false,
            log_filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_document_parses_to_defaults() {
        let cfg: VosConfig = toml::from_str("").expect("empty config must be valid");
        assert_eq!(cfg.scm_class, ScmClass::Ram);
        assert_eq!(cfg.targets, 1);
        assert_eq!(cfg.epoch_inline_threshold_bytes, 4096);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg: VosConfig = toml::from_str("targets = 4\nbdev_class = \"nvme\"\n").unwrap();
        assert_eq!(cfg.targets, 4);
        assert_eq!(cfg.bdev_class, BdevClass::Nvme);
        assert_eq!(cfg.scm_mount, "/mnt/vos");
    }
}
