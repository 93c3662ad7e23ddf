//! BIO bridge.
//!
//! Binds a set of scatter-gather descriptors to either SCM addresses
//! (resolved to a direct slice over a `memmap2::MmapMut` of the pool file)
//! or NVMe addresses (resolved to an owned `Vec<u8>` staging buffer that is
//! written back to a separate blob file on `post`). This models the
//! DMA/write-back split described in §4.7 without a real NVMe driver, the
//! same mmap-backed approach a sibling PM-inspired state engine in this
//! retrieval pack uses for its own storage layer.

use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use vos_types::error::VosError;
use vos_types::Result;

use crate::evt::RecAddr;

/// One descriptor in a scatter-gather list: a logical byte range bound to a
/// [`RecAddr`].
#[derive(Debug, Clone, Copy)]
pub struct SgEntry {
    pub addr: RecAddr,
    pub len: usize,
}

/// Whether the bound buffers will be read from or written to during this
/// descriptor's `prep..post` lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Fetch,
    Update,
}

/// A single in-flight I/O descriptor. `prep` must be paired with exactly
/// one `post`; between the two the caller may freely memcpy in/out of
/// [`IoDescriptor::buffers`].
pub struct IoDescriptor {
    direction: Direction,
    entries: Vec<SgEntry>,
    buffers: Vec<Vec<u8>>,
    posted: bool,
}

impl IoDescriptor {
    pub fn buffers(&mut self) -> &mut [Vec<u8>] {
        &mut self.buffers
    }

    pub fn entries(&self) -> &[SgEntry] {
        &self.entries
    }
}

impl Drop for IoDescriptor {
    fn drop(&mut self) {
        if !self.posted {
            tracing::warn!("IoDescriptor dropped without a matching post() call");
        }
    }
}

/// The BIO bridge: an SCM-backed mmap of the pool file plus an NVMe-backed
/// blob file.
pub struct Bio {
    scm: MmapMut,
    nvme_path: PathBuf,
}

impl Bio {
    /// Opens (creating if necessary) the SCM pool file at `scm_path`, sized
    /// to `scm_size_bytes`, and records the NVMe blob path for staged
    /// writes.
    pub fn open(scm_path: impl AsRef<Path>, scm_size_bytes: u64, nvme_path: impl Into<PathBuf>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(scm_path.as_ref())
            .map_err(|e| VosError::Io(e.to_string()))?;
        file.set_len(scm_size_bytes)
            .map_err(|e| VosError::Io(e.to_string()))?;
        // Safety: the pool file is exclusively owned by this `Bio` instance
        // for the lifetime of the mapping; VOS never opens the same pool
        // file from two processes concurrently (§3 Pool invariant).
        let scm = unsafe { MmapMut::map_mut(&file).map_err(|e| VosError::Io(e.to_string()))? };
        Ok(Self {
            scm,
            nvme_path: nvme_path.into(),
        })
    }

    /// Binds `entries` for `direction`, returning buffers the caller copies
    /// into (update) or out of (fetch). A hole entry yields a zero-filled
    /// buffer and never touches SCM or the NVMe blob.
    pub fn prep(&self, direction: Direction, entries: Vec<SgEntry>) -> Result<IoDescriptor> {
        let mut buffers = Vec::with_capacity(entries.len());
        for entry in &entries {
            let buf = match (direction, entry.addr) {
                (_, RecAddr::Hole) => vec![0u8; entry.len],
                (Direction::Fetch, RecAddr::Scm(addr)) => {
                    let offset = addr.raw() as usize;
                    let end = offset
                        .checked_add(entry.len)
                        .ok_or_else(|| VosError::Overflow { required: entry.len })?;
                    self.scm
                        .get(offset..end)
                        .ok_or_else(|| VosError::Overflow { required: end })?
                        .to_vec()
                }
                (Direction::Fetch, RecAddr::Nvme(offset)) => self.read_nvme(offset, entry.len)?,
                (Direction::Update, _) => vec![0u8; entry.len],
            };
            buffers.push(buf);
        }
        Ok(IoDescriptor {
            direction,
            entries,
            buffers,
            posted: false,
        })
    }

    /// For updates, performs the write-back (direct store for SCM, append
    /// to the NVMe blob for NVMe); for fetches, this is a no-op release of
    /// the DMA buffers.
    pub fn post(&mut self, mut descriptor: IoDescriptor) -> Result<()> {
        if descriptor.direction == Direction::Update {
            for (entry, buf) in descriptor.entries.iter().zip(descriptor.buffers.iter()) {
                match entry.addr {
                    RecAddr::Hole => {}
                    RecAddr::Scm(addr) => {
                        let offset = addr.raw() as usize;
                        let end = offset
                            .checked_add(buf.len())
                            .ok_or_else(|| VosError::Overflow { required: buf.len() })?;
                        let dest = self
                            .scm
                            .get_mut(offset..end)
                            .ok_or_else(|| VosError::Overflow { required: end })?;
                        dest.copy_from_slice(buf);
                    }
                    RecAddr::Nvme(offset) => {
                        self.write_nvme(offset, buf)?;
                    }
                }
            }
        }
        descriptor.posted = true;
        let total_bytes: u64 = descriptor.buffers.iter().map(|b| b.len() as u64).sum();
        match descriptor.direction {
            Direction::Update => vos_telemetry::metrics().inc_bytes_written_total(total_bytes),
            Direction::Fetch => vos_telemetry::metrics().inc_bytes_read_total(total_bytes),
        }
        Ok(())
    }

    fn write_nvme(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        use std::io::Seek;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.nvme_path)
            .map_err(|e| VosError::Io(e.to_string()))?;
        file.seek(std::io::SeekFrom::Start(offset))
            .map_err(|e| VosError::Io(e.to_string()))?;
        file.write_all(bytes).map_err(|e| VosError::Io(e.to_string()))?;
        Ok(())
    }

    pub fn read_nvme(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        use std::io::{Read, Seek};
        let mut file = OpenOptions::new()
            .read(true)
            .open(&self.nvme_path)
            .map_err(|e| VosError::Io(e.to_string()))?;
        file.seek(std::io::SeekFrom::Start(offset))
            .map_err(|e| VosError::Io(e.to_string()))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .map_err(|e| VosError::Io(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pm::PmAddr;

    fn open_temp() -> (Bio, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let bio = Bio::open(dir.path().join("pool.scm"), 1 << 20, dir.path().join("blob.nvme"))
            .expect("open bio");
        (bio, dir)
    }

    #[test]
    fn hole_entries_yield_zero_filled_buffers_without_touching_media() {
        let (bio, _dir) = open_temp();
        let mut desc = bio
            .prep(
                Direction::Fetch,
                vec![SgEntry {
                    addr: RecAddr::Hole,
                    len: 16,
                }],
            )
            .expect("prep");
        assert_eq!(desc.buffers()[0], vec![0u8; 16]);
    }

    #[test]
    fn scm_write_then_read_round_trips() {
        let (mut bio, _dir) = open_temp();
        let addr = PmAddr::from_raw(128);

        let mut write_desc = bio
            .prep(
                Direction::Update,
                vec![SgEntry {
                    addr: RecAddr::Scm(addr),
                    len: 4,
                }],
            )
            .expect("prep update");
        write_desc.buffers()[0].copy_from_slice(b"data");
        bio.post(write_desc).expect("post update");

        let mut read_desc = bio
            .prep(
                Direction::Fetch,
                vec![SgEntry {
                    addr: RecAddr::Scm(addr),
                    len: 4,
                }],
            )
            .expect("prep fetch");
        assert_eq!(read_desc.buffers()[0], b"data");
        bio.post(read_desc).expect("post fetch");
    }

    #[test]
    fn nvme_write_then_read_round_trips() {
        let (mut bio, _dir) = open_temp();
        let mut write_desc = bio
            .prep(
                Direction::Update,
                vec![SgEntry {
                    addr: RecAddr::Nvme(0),
                    len: 5,
                }],
            )
            .expect("prep update");
        write_desc.buffers()[0].copy_from_slice(b"hello");
        bio.post(write_desc).expect("post update");

        let bytes = bio.read_nvme(0, 5).expect("read back");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn fetch_prep_of_an_nvme_entry_reads_the_staged_bytes() {
        let (mut bio, _dir) = open_temp();
        let mut write_desc = bio
            .prep(
                Direction::Update,
                vec![SgEntry {
                    addr: RecAddr::Nvme(0),
                    len: 5,
                }],
            )
            .expect("prep update");
        write_desc.buffers()[0].copy_from_slice(b"hello");
        bio.post(write_desc).expect("post update");

        let mut fetch_desc = bio
            .prep(
                Direction::Fetch,
                vec![SgEntry {
                    addr: RecAddr::Nvme(0),
                    len: 5,
                }],
            )
            .expect("prep fetch");
        assert_eq!(fetch_desc.buffers()[0], b"hello");
        bio.post(fetch_desc).expect("post fetch");
    }
}
