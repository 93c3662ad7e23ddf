//! Update pipeline (§4.6.1).

use vos_storage::bio::{Direction, SgEntry};
use vos_storage::evt::{EvtEntry, RecAddr};
use vos_storage::keyrec::KeyRecord;
use vos_types::epoch::{DtxIntent, Epoch};
use vos_types::error::{ErrorCode, VosError};
use vos_types::ids::ObjectId;
use vos_types::Result;

use crate::container::Container;
use crate::iod::{Iod, IoUnit};

impl Container {
    /// Applies every entry in `iod` to `oid` under one transaction.
    pub fn update(&mut self, oid: ObjectId, iod: &Iod) -> Result<()> {
        iod.validate()?;
        let epoch = iod.epoch;

        self.handle_cache.hold(oid)?;
        let result = self.apply_update(oid, epoch, iod);
        // Always release the handle, even on failure: the transaction
        // itself aborted, but the hold/release balance is independent of
        // whether the update committed.
        self.handle_cache.release(oid)?;

        match &result {
            Ok(()) => vos_telemetry::metrics().inc_updates_total(),
            Err(e) => {
                let mnemonic = e.mnemonic();
                tracing::warn!(object = ?oid, %epoch, error = mnemonic, "update failed");
                vos_telemetry::metrics().inc_error(mnemonic);
            }
        }
        result
    }

    fn apply_update(&mut self, oid: ObjectId, epoch: Epoch, iod: &Iod) -> Result<()> {
        let threshold = self.inline_threshold_bytes;
        let record = self.object_index.find_or_alloc(oid, epoch, DtxIntent::Update)?;
        record.earliest = record.earliest.min(epoch);
        record.latest = record.latest.max(epoch);

        for entry in &iod.entries {
            let dkey_rec = record
                .dkeys
                .entry(entry.dkey.as_bytes().to_vec())
                .or_insert_with(|| KeyRecord::new_akey_parent(epoch));
            dkey_rec.touch(epoch);
            let akeys = dkey_rec.akeys_mut()?;
            let akey_rec = akeys
                .entry(entry.akey.as_bytes().to_vec())
                .or_insert_with(|| KeyRecord::new_leaf(epoch));
            akey_rec.touch(epoch);

            match &entry.unit {
                IoUnit::Punch => {
                    akey_rec.punch_at(epoch);
                }
                IoUnit::Single(payload) => {
                    let tree = akey_rec.ensure_single(oid.features().akey_class())?;
                    tree.insert_or_update(&entry.akey, epoch, payload.clone())?;
                }
                IoUnit::Array(recxs) => {
                    let tree = akey_rec.ensure_array()?;
                    for recx in recxs {
                        let total_bytes = recx.payload.len();
                        let addr = self.stage_array_write(&recx.payload, total_bytes, threshold)?;
                        tree.insert(EvtEntry {
                            epoch,
                            lo: recx.lo,
                            hi: recx.hi,
                            rec_size: recx.rec_size,
                            version: epoch,
                            addr,
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stages `payload` through BIO, placing it on SCM if it fits under the
    /// inline threshold, else on the NVMe blob (§4.6.1 / §6.4).
    fn stage_array_write(&mut self, payload: &[u8], len: usize, threshold: usize) -> Result<RecAddr> {
        crate::fault::check(crate::fault::NVME_SUBMIT_PATH, VosError::Io("injected NVMe submit failure".into()))?;

        let addr = if len <= threshold {
            RecAddr::Scm(vos_storage::PmAddr::from_raw(self.alloc_scm_offset(len as u64)))
        } else {
            RecAddr::Nvme(self.alloc_nvme_offset(len as u64))
        };

        let mut desc = self.bio.prep(
            Direction::Update,
            vec![SgEntry {
                addr,
                len,
            }],
        )?;
        desc.buffers()[0].copy_from_slice(payload);
        self.bio.post(desc)?;
        Ok(addr)
    }

    fn alloc_nvme_offset(&mut self, len: u64) -> u64 {
        let offset = self.nvme_cursor;
        self.nvme_cursor += len;
        offset
    }

    pub(crate) fn alloc_scm_offset(&mut self, len: u64) -> u64 {
        let offset = self.scm_cursor;
        self.scm_cursor += len;
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::open_test_container;
    use crate::iod::{IodEntry, RecxUnit};
    use vos_types::ids::ObjectFeatureBits;
    use vos_types::key::KeyClass;

    fn oid() -> ObjectId {
        ObjectId::new(0, 1, ObjectFeatureBits::empty()).expect("valid oid")
    }

    fn key(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn single_value_update_creates_dkey_and_akey_records() {
        let (mut container, _dir) = open_test_container();
        let iod = Iod {
            epoch: 1,
            entries: vec![IodEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: IoUnit::Single(b"hello".to_vec()),
            }],
        };
        container.update(oid(), &iod).expect("update");

        let record = container.object_index.lookup(oid(), 1).expect("lookup");
        assert_eq!(record.dkeys.len(), 1);
    }

    #[test]
    fn array_update_routes_small_payloads_to_scm() {
        let (mut container, _dir) = open_test_container();
        let iod = Iod {
            epoch: 1,
            entries: vec![IodEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: IoUnit::Array(vec![RecxUnit {
                    lo: 0,
                    hi: 3,
                    rec_size: 1,
                    payload: vec![1, 2, 3, 4],
                }]),
            }],
        };
        container.update(oid(), &iod).expect("update");
    }
}
