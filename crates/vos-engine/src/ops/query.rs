//! Query MIN/MAX (§4.6.5).

use bitflags::bitflags;
use vos_storage::evt::{Evt, Filter, Iter as EvtIter, IterFlags};
use vos_storage::keyrec::{KeyAttachment, KeyRecord};
use vos_types::epoch::Epoch;
use vos_types::error::VosError;
use vos_types::ids::ObjectId;
use vos_types::key::Key;
use vos_types::Result;

use crate::container::Container;
use crate::ops::resolve_key_record;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueryFlags: u32 {
        const GET_DKEY = 0b0000_0001;
        const GET_AKEY = 0b0000_0010;
        const GET_MIN  = 0b0000_0100;
        const GET_MAX  = 0b0000_1000;
        const GET_RECX = 0b0001_0000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub dkey: Option<Vec<u8>>,
    pub akey: Option<Vec<u8>>,
    pub recx: Option<(u64, u64)>,
}

impl Container {
    /// `dkey` is required (and only used) when `flags` carries `GET_AKEY`
    /// without `GET_DKEY`: a per-dkey min/max akey lookup.
    pub fn query_key(
        &self,
        oid: ObjectId,
        flags: QueryFlags,
        epoch: Epoch,
        dkey: Option<&Key>,
    ) -> Result<QueryResult> {
        let want_min = flags.contains(QueryFlags::GET_MIN);
        let want_max = flags.contains(QueryFlags::GET_MAX);
        if want_min == want_max {
            return Err(VosError::Invalid(
                "exactly one of GET_MIN/GET_MAX must be set".into(),
            ));
        }

        let record = self.object_index.lookup(oid, epoch)?;

        if flags.contains(QueryFlags::GET_DKEY) && flags.contains(QueryFlags::GET_AKEY) {
            let mut candidates: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
            for (dkey_bytes, dkey_rec) in &record.dkeys {
                if resolve_key_record(&record.dkeys, dkey_bytes, epoch).is_none() {
                    continue;
                }
                let Ok(akeys) = dkey_rec.akeys() else {
                    continue;
                };
                for (akey_bytes, akey_rec) in akeys {
                    if resolve_key_record(akeys, akey_bytes, epoch).is_none() {
                        continue;
                    }
                    if akey_is_live(akey_rec) {
                        candidates.push((dkey_bytes.clone(), akey_bytes.clone()));
                    }
                }
            }
            let dkey_class = oid.features().dkey_class();
            let akey_class = oid.features().akey_class();
            let cmp = |a: &(Vec<u8>, Vec<u8>), b: &(Vec<u8>, Vec<u8>)| {
                Key::cmp_bytes(dkey_class, &a.0, &b.0).then_with(|| Key::cmp_bytes(akey_class, &a.1, &b.1))
            };
            let picked = if want_min {
                candidates.iter().min_by(|a, b| cmp(a, b))
            } else {
                candidates.iter().max_by(|a, b| cmp(a, b))
            };
            let Some((dkey_bytes, akey_bytes)) = picked else {
                return Err(VosError::NonExistent);
            };

            let recx = if flags.contains(QueryFlags::GET_RECX) {
                let akey_rec = &record.dkeys[dkey_bytes].akeys()?[akey_bytes];
                Some(min_max_recx(akey_rec, want_min, epoch)?)
            } else {
                None
            };
            return Ok(QueryResult {
                dkey: Some(dkey_bytes.clone()),
                akey: Some(akey_bytes.clone()),
                recx,
            });
        }

        if flags.contains(QueryFlags::GET_AKEY) {
            let dkey = dkey.ok_or_else(|| VosError::Invalid("GET_AKEY alone requires a dkey".into()))?;
            let dkey_rec = resolve_key_record(&record.dkeys, dkey.as_bytes(), epoch)
                .ok_or(VosError::NonExistent)?;
            let akeys = dkey_rec.akeys()?;
            let mut live: Vec<&Vec<u8>> = akeys
                .iter()
                .filter(|entry| resolve_key_record(akeys, entry.0, epoch).is_some() && akey_is_live(entry.1))
                .map(|entry| entry.0)
                .collect();
            let akey_class = oid.features().akey_class();
            live.sort_by(|a, b| Key::cmp_bytes(akey_class, a, b));
            let picked = if want_min { live.first() } else { live.last() };
            let Some(akey_bytes) = picked.copied() else {
                return Err(VosError::NonExistent);
            };

            let recx = if flags.contains(QueryFlags::GET_RECX) {
                Some(min_max_recx(&akeys[akey_bytes], want_min, epoch)?)
            } else {
                None
            };
            return Ok(QueryResult {
                dkey: None,
                akey: Some(akey_bytes.clone()),
                recx,
            });
        }

        Err(VosError::Invalid(
            "query_key requires GET_AKEY or GET_DKEY|GET_AKEY".into(),
        ))
    }
}

fn akey_is_live(rec: &KeyRecord) -> bool {
    match &rec.attachment {
        KeyAttachment::Empty | KeyAttachment::Akeys(_) => false,
        KeyAttachment::Single(tree) => !tree.is_empty(),
        KeyAttachment::Array(tree) => !tree.is_empty(),
    }
}

fn min_max_recx(rec: &KeyRecord, want_min: bool, epoch: Epoch) -> Result<(u64, u64)> {
    let KeyAttachment::Array(tree) = &rec.attachment else {
        return Err(VosError::Invalid(
            "GET_RECX requires an array-attached akey".into(),
        ));
    };
    scan_min_max(tree, want_min, epoch)
}

fn scan_min_max(tree: &Evt, want_min: bool, epoch: Epoch) -> Result<(u64, u64)> {
    let mut iter = EvtIter::default();
    let filter = Filter {
        lo_range: 0,
        hi_range: u64::MAX - 1,
        reader_epoch: epoch,
    };
    if tree.probe(&mut iter, IterFlags::VISIBLE, filter).is_err() {
        return Err(VosError::NonExistent);
    }

    let mut best: Option<(u64, u64)> = None;
    loop {
        let slice = tree.fetch(&iter)?;
        if !slice.is_hole() {
            best = Some(match best {
                None => (slice.lo, slice.hi),
                Some(cur) => {
                    if want_min {
                        if slice.lo < cur.0 {
                            (slice.lo, slice.hi)
                        } else {
                            cur
                        }
                    } else if slice.hi > cur.1 {
                        (slice.lo, slice.hi)
                    } else {
                        cur
                    }
                }
            });
        }
        if tree.next(&mut iter).is_err() {
            break;
        }
    }
    best.ok_or(VosError::NonExistent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::open_test_container;
    use crate::iod::{Iod, IodEntry, IoUnit};
    use crate::ops::punch::PunchTarget;
    use vos_types::ids::ObjectFeatureBits;
    use vos_types::key::KeyClass;

    fn oid() -> ObjectId {
        ObjectId::new(0, 1, ObjectFeatureBits::empty()).expect("valid oid")
    }

    fn key(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn get_min_max_akey_after_punching_the_extremes() {
        let (mut container, _dir) = open_test_container();
        let mut entries = Vec::new();
        for n in 1u8..=5 {
            entries.push(IodEntry {
                dkey: key(b"d0"),
                akey: key(&[n]),
                unit: IoUnit::Single(vec![n]),
            });
        }
        container.update(oid(), &Iod { epoch: 1, entries }).expect("update");

        container
            .punch(oid(), 2, PunchTarget::Akey(key(b"d0"), key(&[1])))
            .expect("punch min");
        container
            .punch(oid(), 2, PunchTarget::Akey(key(b"d0"), key(&[5])))
            .expect("punch max");

        let min = container
            .query_key(oid(), QueryFlags::GET_AKEY | QueryFlags::GET_MIN, 2, Some(&key(b"d0")))
            .expect("min");
        assert_eq!(min.akey, Some(vec![2]));

        let max = container
            .query_key(oid(), QueryFlags::GET_AKEY | QueryFlags::GET_MAX, 2, Some(&key(b"d0")))
            .expect("max");
        assert_eq!(max.akey, Some(vec![4]));
    }

    #[test]
    fn get_min_max_akey_honors_the_numeric_comparator_class() {
        let (mut container, _dir) = open_test_container();
        let numeric_oid = ObjectId::new(0, 2, ObjectFeatureBits::AKEY_UINT64).expect("valid oid");

        // Native-endian u64 encodings of 1, 2, 256: on a little-endian host
        // `256u64.to_ne_bytes()` is `[0,1,0,...]`, which sorts *before*
        // `1u64.to_ne_bytes()` (`[1,0,0,...]`) under plain byte-lexical
        // comparison, so this only passes min/max if the numeric comparator
        // is actually consulted.
        let mut entries = Vec::new();
        for n in [1u64, 2, 256] {
            entries.push(IodEntry {
                dkey: key(b"d0"),
                akey: Key::new(n.to_ne_bytes().to_vec(), KeyClass::NumericU64).expect("valid akey"),
                unit: IoUnit::Single(n.to_ne_bytes().to_vec()),
            });
        }
        container
            .update(numeric_oid, &Iod { epoch: 1, entries })
            .expect("update");

        let min = container
            .query_key(numeric_oid, QueryFlags::GET_AKEY | QueryFlags::GET_MIN, 1, Some(&key(b"d0")))
            .expect("min");
        assert_eq!(min.akey, Some(1u64.to_ne_bytes().to_vec()));

        let max = container
            .query_key(numeric_oid, QueryFlags::GET_AKEY | QueryFlags::GET_MAX, 1, Some(&key(b"d0")))
            .expect("max");
        assert_eq!(max.akey, Some(256u64.to_ne_bytes().to_vec()));
    }

    #[test]
    fn conflicting_min_max_flags_are_invalid() {
        let (mut container, _dir) = open_test_container();
        let err = container
            .query_key(oid(), QueryFlags::GET_AKEY, 1, Some(&key(b"d0")))
            .unwrap_err();
        assert!(matches!(err, VosError::Invalid(_)));
    }

    #[test]
    fn get_recx_returns_the_min_visible_extent() {
        let (mut container, _dir) = open_test_container();
        container
            .update(
                oid(),
                &Iod {
                    epoch: 1,
                    entries: vec![
                        IodEntry {
                            dkey: key(b"d0"),
                            akey: key(b"a0"),
                            unit: IoUnit::Array(vec![crate::iod::RecxUnit {
                                lo: 10,
                                hi: 11,
                                rec_size: 1,
                                payload: vec![1, 2],
                            }]),
                        },
                        IodEntry {
                            dkey: key(b"d0"),
                            akey: key(b"a0"),
                            unit: IoUnit::Array(vec![crate::iod::RecxUnit {
                                lo: 0,
                                hi: 1,
                                rec_size: 1,
                                payload: vec![9, 9],
                            }]),
                        },
                    ],
                },
            )
            .expect("update");

        let result = container
            .query_key(
                oid(),
                QueryFlags::GET_AKEY | QueryFlags::GET_MIN | QueryFlags::GET_RECX,
                1,
                Some(&key(b"d0")),
            )
            .expect("query");
        assert_eq!(result.recx, Some((0, 1)));
    }
}
