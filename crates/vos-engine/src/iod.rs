//! I/O descriptor (IOD) types shared by the update and fetch pipelines.
//!
//! An IOD is the caller-supplied description of the keys, extents, and
//! record size for one operation (§4.6). VOS composes it from a dkey, one
//! or more akeys, and per-akey I/O units that are either a single value or
//! a set of array extents.

use vos_types::epoch::Epoch;
use vos_types::error::VosError;
use vos_types::key::Key;
use vos_types::Result;

/// The SCM/NVMe placement boundary: array payloads at or under this size
/// are allocated inline on SCM; larger payloads go to the NVMe blob
/// (§6.4 `epoch_inline_threshold_bytes`).
pub const DEFAULT_INLINE_THRESHOLD_BYTES: usize = 4096;

/// One extent within an array I/O unit: a `[lo, hi]` record-index range
/// plus the bytes to write (update) or the requested length (fetch).
#[derive(Debug, Clone)]
pub struct RecxUnit {
    pub lo: u64,
    pub hi: u64,
    pub rec_size: u32,
    pub payload: Vec<u8>,
}

impl RecxUnit {
    pub fn validate(&self) -> Result<()> {
        if self.hi < self.lo {
            return Err(VosError::Invalid("recx hi < lo".into()));
        }
        if self.rec_size == 0 {
            return Err(VosError::Invalid("rsize=0 on a non-punch update".into()));
        }
        let expected_len = (self.hi - self.lo + 1) as usize * self.rec_size as usize;
        if self.payload.len() != expected_len {
            return Err(VosError::Invalid(
                "recx payload length disagrees with [lo,hi] * rec_size".into(),
            ));
        }
        Ok(())
    }
}

/// The per-akey I/O unit: either a single value or a set of array extents.
/// `iod_size = 0` on the single-value variant is the signal for a punch of
/// that akey (§4.6.1).
#[derive(Debug, Clone)]
pub enum IoUnit {
    Single(Vec<u8>),
    Array(Vec<RecxUnit>),
    /// A punch of this akey (or, at the dkey level, of everything beneath
    /// it): no payload, `iod_size = 0`.
    Punch,
}

/// One `(dkey, akey, io_unit)` triple within an update/fetch request.
#[derive(Debug, Clone)]
pub struct IodEntry {
    pub dkey: Key,
    pub akey: Key,
    pub unit: IoUnit,
}

/// A batch of entries applied under one transaction/epoch.
#[derive(Debug, Clone)]
pub struct Iod {
    pub epoch: Epoch,
    pub entries: Vec<IodEntry>,
}

impl Iod {
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            if let IoUnit::Array(recxs) = &entry.unit {
                for recx in recxs {
                    recx.validate()?;
                }
                let rec_sizes: Vec<u32> = recxs.iter().map(|r| r.rec_size).collect();
                if let Some(first) = rec_sizes.first() {
                    if rec_sizes.iter().any(|s| s != first) {
                        return Err(VosError::Invalid(
                            "record size disagreement within one IOD".into(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recx_with_mismatched_payload_length_is_invalid() {
        let recx = RecxUnit {
            lo: 0,
            hi: 9,
            rec_size: 4,
            payload: vec![0u8; 10],
        };
        assert!(matches!(recx.validate(), Err(VosError::Invalid(_))));
    }

    #[test]
    fn recx_with_zero_rec_size_is_invalid() {
        let recx = RecxUnit {
            lo: 0,
            hi: 0,
            rec_size: 0,
            payload: vec![],
        };
        assert!(matches!(recx.validate(), Err(VosError::Invalid(_))));
    }

    #[test]
    fn well_formed_recx_validates() {
        let recx = RecxUnit {
            lo: 0,
            hi: 3,
            rec_size: 2,
            payload: vec![0u8; 8],
        };
        assert!(recx.validate().is_ok());
    }
}
