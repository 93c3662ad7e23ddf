//! Fetch pipeline (§4.6.2) and single-value epoch expressions (§4.6.4).

use vos_storage::bio::{Direction, SgEntry};
use vos_storage::evt::{Filter, IterFlags, RecAddr};
use vos_storage::kbtr::Kbtr;
use vos_types::epoch::Epoch;
use vos_types::error::{ErrorCode, VosError};
use vos_types::ids::ObjectId;
use vos_types::key::Key;
use vos_types::Result;

use crate::container::Container;
use crate::ops::{resolve_key_record, EpochExpr};

/// One `(dkey, akey, probe)` entry in a fetch request.
pub struct FetchEntry {
    pub dkey: Key,
    pub akey: Key,
    pub unit: FetchUnit,
}

pub enum FetchUnit {
    Single {
        expr: EpochExpr,
        epr_lo: Epoch,
        epr_hi: Epoch,
    },
    Array {
        lo: u64,
        hi: u64,
        rec_size: u32,
        skip_holes: bool,
    },
}

pub struct FetchRequest {
    pub epoch: Epoch,
    pub entries: Vec<FetchEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedValue {
    /// `None` when the akey is absent, tombstoned, or the exact/GE/LE epoch
    /// expression had nothing to select.
    Single(Option<Vec<u8>>),
    /// Always `(hi - lo + 1) * rec_size` bytes; holes are zero-filled.
    Array(Vec<u8>),
}

impl Container {
    /// Runs `request` against `oid`, returning one [`FetchedValue`] per
    /// entry in order. `NONEXIST` propagates only for the object itself
    /// being absent or tombstoned; per-entry absence resolves to an empty
    /// value instead, per §4.6.2.
    pub fn fetch(&mut self, oid: ObjectId, request: &FetchRequest) -> Result<Vec<FetchedValue>> {
        self.handle_cache.hold(oid)?;
        let result = self.run_fetch(oid, request);
        self.handle_cache.release(oid)?;

        match &result {
            Ok(_) => vos_telemetry::metrics().inc_fetches_total(),
            Err(e) => {
                let mnemonic = e.mnemonic();
                tracing::warn!(object = ?oid, error = mnemonic, "fetch failed");
                vos_telemetry::metrics().inc_error(mnemonic);
            }
        }
        result
    }

    fn run_fetch(&mut self, oid: ObjectId, request: &FetchRequest) -> Result<Vec<FetchedValue>> {
        enum Plan {
            Single(Option<Vec<u8>>),
            Array {
                lo: u64,
                hi: u64,
                rec_size: u32,
                reads: Vec<(u64, u64, RecAddr)>,
            },
        }

        let epoch = request.epoch;
        let mut plans = Vec::with_capacity(request.entries.len());
        {
            let record = self.object_index.lookup(oid, epoch)?;
            for entry in &request.entries {
                let akey_rec = resolve_key_record(&record.dkeys, entry.dkey.as_bytes(), epoch)
                    .and_then(|dkey_rec| {
                        dkey_rec
                            .akeys()
                            .ok()
                            .and_then(|akeys| resolve_key_record(akeys, entry.akey.as_bytes(), epoch))
                    });

                let plan = match (&entry.unit, akey_rec) {
                    (FetchUnit::Single { .. }, None) => Plan::Single(None),
                    (FetchUnit::Single { expr, epr_lo, epr_hi }, Some(akey_rec)) => {
                        match &akey_rec.attachment {
                            vos_storage::keyrec::KeyAttachment::Single(tree) => {
                                Plan::Single(select_single(tree, &entry.akey, *expr, *epr_lo, *epr_hi)?)
                            }
                            vos_storage::keyrec::KeyAttachment::Empty => Plan::Single(None),
                            vos_storage::keyrec::KeyAttachment::Array(_) => {
                                return Err(VosError::Invalid(
                                    "single-value fetch against an array-attached akey".into(),
                                ));
                            }
                            vos_storage::keyrec::KeyAttachment::Akeys(_) => {
                                return Err(VosError::Invalid("akey record is dkey-shaped".into()));
                            }
                        }
                    }
                    (FetchUnit::Array { lo, hi, rec_size, .. }, None) => Plan::Array {
                        lo: *lo,
                        hi: *hi,
                        rec_size: *rec_size,
                        reads: Vec::new(),
                    },
                    (
                        FetchUnit::Array {
                            lo,
                            hi,
                            rec_size,
                            skip_holes,
                        },
                        Some(akey_rec),
                    ) => match &akey_rec.attachment {
                        vos_storage::keyrec::KeyAttachment::Array(tree) => {
                            let reads = probe_array(tree, *lo, *hi, *rec_size, *skip_holes, epoch)?;
                            Plan::Array {
                                lo: *lo,
                                hi: *hi,
                                rec_size: *rec_size,
                                reads,
                            }
                        }
                        vos_storage::keyrec::KeyAttachment::Empty => Plan::Array {
                            lo: *lo,
                            hi: *hi,
                            rec_size: *rec_size,
                            reads: Vec::new(),
                        },
                        vos_storage::keyrec::KeyAttachment::Single(_) => {
                            return Err(VosError::Invalid(
                                "array fetch against a single-value-attached akey".into(),
                            ));
                        }
                        vos_storage::keyrec::KeyAttachment::Akeys(_) => {
                            return Err(VosError::Invalid("akey record is dkey-shaped".into()));
                        }
                    },
                };
                plans.push(plan);
            }
        }

        let mut out = Vec::with_capacity(plans.len());
        for plan in plans {
            match plan {
                Plan::Single(value) => out.push(FetchedValue::Single(value)),
                Plan::Array { lo, hi, rec_size, reads } => {
                    out.push(FetchedValue::Array(self.materialize_array(lo, hi, rec_size, reads)?))
                }
            }
        }
        Ok(out)
    }

    fn materialize_array(
        &mut self,
        lo: u64,
        hi: u64,
        rec_size: u32,
        reads: Vec<(u64, u64, RecAddr)>,
    ) -> Result<Vec<u8>> {
        let total_len = (hi - lo + 1) as usize * rec_size as usize;
        let mut buf = vec![0u8; total_len];
        for (seg_lo, seg_hi, addr) in reads {
            let seg_len = (seg_hi - seg_lo + 1) as usize * rec_size as usize;
            let mut desc = self.bio.prep(Direction::Fetch, vec![SgEntry { addr, len: seg_len }])?;
            let bytes = desc.buffers()[0].clone();
            self.bio.post(desc)?;
            let dest_off = (seg_lo - lo) as usize * rec_size as usize;
            buf[dest_off..dest_off + seg_len].copy_from_slice(&bytes);
        }
        Ok(buf)
    }
}

/// Selects a record by epoch expression over a single-value key's own
/// versions (§4.6.4). `Re`/`Rr` enumerate a range and are rejected here; use
/// the SINGLE iterator (`ops::iter`) for those.
fn select_single(
    tree: &Kbtr,
    key: &Key,
    expr: EpochExpr,
    epr_lo: Epoch,
    _epr_hi: Epoch,
) -> Result<Option<Vec<u8>>> {
    let versions = tree.versions(key);
    let found = match expr {
        EpochExpr::Eq => versions.iter().find(|(e, _)| *e == epr_lo),
        EpochExpr::Ge => versions.iter().find(|(e, _)| *e >= epr_lo),
        EpochExpr::Le => versions.iter().rev().find(|(e, _)| *e <= epr_lo),
        EpochExpr::Re | EpochExpr::Rr => {
            return Err(VosError::Invalid(
                "RE/RR enumerate a range; fetch only accepts EQ/GE/LE".into(),
            ));
        }
    };
    Ok(found.and_then(|(_, record)| if record.punched { None } else { Some(record.value.clone()) }))
}

/// Probes an EVT tree over `[lo,hi]` at `epoch`, returning the `(seg_lo,
/// seg_hi, addr)` triples to materialize. Fails `INVAL` on a record-size
/// disagreement across the visible run (§4.6.6).
fn probe_array(
    tree: &vos_storage::evt::Evt,
    lo: u64,
    hi: u64,
    rec_size: u32,
    skip_holes: bool,
    epoch: Epoch,
) -> Result<Vec<(u64, u64, RecAddr)>> {
    let mut flags = IterFlags::VISIBLE;
    if skip_holes {
        flags |= IterFlags::SKIP_HOLES;
    }
    let mut iter = vos_storage::evt::Iter::default();
    let filter = Filter {
        lo_range: lo,
        hi_range: hi,
        reader_epoch: epoch,
    };
    match tree.probe(&mut iter, flags, filter) {
        Err(VosError::NonExistent) => return Ok(Vec::new()),
        Err(e) => return Err(e),
        Ok(()) => {}
    }

    let mut reads = Vec::new();
    loop {
        let slice = tree.fetch(&iter)?;
        match slice.entry {
            None => reads.push((slice.lo, slice.hi, RecAddr::Hole)),
            Some(entry) => {
                if entry.rec_size != rec_size {
                    return Err(VosError::Invalid(
                        "record size disagreement across a visible extent run".into(),
                    ));
                }
                reads.push((slice.lo, slice.hi, entry.addr));
            }
        }
        if tree.next(&mut iter).is_err() {
            break;
        }
    }
    Ok(reads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::open_test_container;
    use crate::iod::{IodEntry, Iod, IoUnit, RecxUnit};
    use vos_types::ids::ObjectFeatureBits;
    use vos_types::key::KeyClass;

    fn oid() -> ObjectId {
        ObjectId::new(0, 1, ObjectFeatureBits::empty()).expect("valid oid")
    }

    fn key(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn single_value_ge_selects_first_epoch_at_or_after_lo() {
        let (mut container, _dir) = open_test_container();
        for epoch in [2, 4, 6, 8] {
            let iod = Iod {
                epoch,
                entries: vec![IodEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: IoUnit::Single(vec![epoch as u8]),
                }],
            };
            container.update(oid(), &iod).expect("update");
        }

        let request = FetchRequest {
            epoch: 8,
            entries: vec![FetchEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: FetchUnit::Single {
                    expr: EpochExpr::Ge,
                    epr_lo: 5,
                    epr_hi: Epoch::MAX,
                },
            }],
        };
        let out = container.fetch(oid(), &request).expect("fetch");
        assert_eq!(out, vec![FetchedValue::Single(Some(vec![6]))]);
    }

    #[test]
    fn fetch_of_absent_dkey_yields_empty_single() {
        let (mut container, _dir) = open_test_container();
        let iod = Iod {
            epoch: 1,
            entries: vec![IodEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: IoUnit::Single(b"x".to_vec()),
            }],
        };
        container.update(oid(), &iod).expect("update");

        let request = FetchRequest {
            epoch: 1,
            entries: vec![FetchEntry {
                dkey: key(b"missing"),
                akey: key(b"a0"),
                unit: FetchUnit::Single {
                    expr: EpochExpr::Eq,
                    epr_lo: 1,
                    epr_hi: 1,
                },
            }],
        };
        let out = container.fetch(oid(), &request).expect("fetch");
        assert_eq!(out, vec![FetchedValue::Single(None)]);
    }

    #[test]
    fn array_fetch_above_inline_threshold_round_trips_through_nvme() {
        let (mut container, _dir) = open_test_container();
        let len = crate::iod::DEFAULT_INLINE_THRESHOLD_BYTES + 1024;
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let iod = Iod {
            epoch: 1,
            entries: vec![IodEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: IoUnit::Array(vec![RecxUnit {
                    lo: 0,
                    hi: (len - 1) as u64,
                    rec_size: 1,
                    payload: payload.clone(),
                }]),
            }],
        };
        container.update(oid(), &iod).expect("update");

        let request = FetchRequest {
            epoch: 1,
            entries: vec![FetchEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: FetchUnit::Array {
                    lo: 0,
                    hi: (len - 1) as u64,
                    rec_size: 1,
                    skip_holes: false,
                },
            }],
        };
        let out = container.fetch(oid(), &request).expect("fetch");
        assert_eq!(out, vec![FetchedValue::Array(payload)]);
    }

    #[test]
    fn array_fetch_zero_fills_gaps() {
        let (mut container, _dir) = open_test_container();
        let iod = Iod {
            epoch: 1,
            entries: vec![IodEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: IoUnit::Array(vec![RecxUnit {
                    lo: 0,
                    hi: 1,
                    rec_size: 2,
                    payload: vec![9, 9, 9, 9],
                }]),
            }],
        };
        container.update(oid(), &iod).expect("update");

        let request = FetchRequest {
            epoch: 1,
            entries: vec![FetchEntry {
                dkey: key(b"d0"),
                akey: key(b"a0"),
                unit: FetchUnit::Array {
                    lo: 0,
                    hi: 3,
                    rec_size: 2,
                    skip_holes: false,
                },
            }],
        };
        let out = container.fetch(oid(), &request).expect("fetch");
        match &out[0] {
            FetchedValue::Array(bytes) => {
                assert_eq!(bytes, &vec![9, 9, 9, 9, 0, 0, 0, 0]);
            }
            _ => panic!("expected array value"),
        }
    }
}
