//! DKEY/AKEY/SINGLE/RECX iteration (§4.6.3).
//!
//! Each iterator snapshots its accepted entries eagerly at construction time
//! (the same "compute slices once, walk them with a cursor" approach
//! `vos_storage::evt::Evt` already uses for its own probe), rather than
//! holding a live borrow into the container. A child iterator is built from
//! the parent's currently-accepted key, so the natural Rust drop order
//! (innermost local first) already matches the spec's children-before-
//! parents teardown rule.

use vos_storage::evt::{Filter, Iter as EvtIter, IterFlags};
use vos_storage::keyrec::{KeyAttachment, KeyRecord};
use vos_types::epoch::Epoch;
use vos_types::error::VosError;
use vos_types::ids::ObjectId;
use vos_types::key::{Key, KeyClass};
use vos_types::Result;

use crate::container::Container;
use crate::ops::{resolve_key_record, EpochExpr};

fn accepted_in_range(rec: &KeyRecord, epr_lo: Epoch, epr_hi: Epoch) -> bool {
    if rec.earliest > epr_hi {
        return false;
    }
    if rec.latest <= epr_lo {
        return false;
    }
    true
}

/// A snapshot cursor over a sorted `Vec<Vec<u8>>` of accepted key bytes,
/// shared by the DKEY and AKEY iterators.
pub struct KeyCursor {
    keys: Vec<Vec<u8>>,
    pos: usize,
}

impl KeyCursor {
    fn new(mut keys: Vec<Vec<u8>>, class: KeyClass) -> Result<Self> {
        keys.sort_by(|a, b| Key::cmp_bytes(class, a, b));
        if keys.is_empty() {
            return Err(VosError::NonExistent);
        }
        Ok(Self { keys, pos: 0 })
    }

    pub fn current(&self) -> &[u8] {
        &self.keys[self.pos]
    }

    pub fn advance(&mut self) -> Result<()> {
        if self.pos + 1 >= self.keys.len() {
            self.pos = self.keys.len();
            return Err(VosError::NonExistent);
        }
        self.pos += 1;
        Ok(())
    }
}

pub type DkeyIterator = KeyCursor;
pub type AkeyIterator = KeyCursor;

/// One selected epoch's payload, in the order `expr` enumerates them.
pub struct SingleIterator {
    versions: Vec<(Epoch, Vec<u8>)>,
    pos: usize,
}

impl SingleIterator {
    pub fn current(&self) -> (Epoch, &[u8]) {
        let (epoch, value) = &self.versions[self.pos];
        (*epoch, value.as_slice())
    }

    pub fn advance(&mut self) -> Result<()> {
        if self.pos + 1 >= self.versions.len() {
            self.pos = self.versions.len();
            return Err(VosError::NonExistent);
        }
        self.pos += 1;
        Ok(())
    }
}

/// One enumerated extent: its `[lo,hi]` range and whether it is a hole.
pub struct RecxIterator {
    slices: Vec<(u64, u64, bool)>,
    pos: usize,
}

impl RecxIterator {
    pub fn current(&self) -> (u64, u64, bool) {
        self.slices[self.pos]
    }

    pub fn advance(&mut self) -> Result<()> {
        if self.pos + 1 >= self.slices.len() {
            self.pos = self.slices.len();
            return Err(VosError::NonExistent);
        }
        self.pos += 1;
        Ok(())
    }
}

impl Container {
    /// Opens a DKEY iterator over `[epr_lo, epr_hi]`. `conditional_akey`
    /// restricts acceptance to dkeys under which that exact akey exists at
    /// `epr_lo`; per §4.6.3 this requires `epr_lo == epr_hi`.
    pub fn dkey_iter(
        &self,
        oid: ObjectId,
        epr_lo: Epoch,
        epr_hi: Epoch,
        conditional_akey: Option<&Key>,
    ) -> Result<DkeyIterator> {
        if conditional_akey.is_some() && epr_lo != epr_hi {
            return Err(VosError::Invalid(
                "conditional akey iteration requires epr.lo == epr.hi".into(),
            ));
        }
        let record = self.object_index.lookup(oid, epr_hi)?;
        let keys: Vec<Vec<u8>> = record
            .dkeys
            .iter()
            .filter(|(_, rec)| accepted_in_range(rec, epr_lo, epr_hi))
            .filter(|(_, rec)| match conditional_akey {
                None => true,
                // Existence at the exact epoch, not the windowed enumeration
                // rule above: `epr_lo == epr_hi` here is a point lookup.
                Some(target) => rec
                    .akeys()
                    .ok()
                    .map(|akeys| resolve_key_record(akeys, target.as_bytes(), epr_lo).is_some())
                    .unwrap_or(false),
            })
            .map(|(bytes, _)| bytes.clone())
            .collect();
        KeyCursor::new(keys, oid.features().dkey_class())
    }

    /// Opens an AKEY iterator nested under `dkey`.
    pub fn akey_iter(
        &self,
        oid: ObjectId,
        dkey: &[u8],
        epr_lo: Epoch,
        epr_hi: Epoch,
    ) -> Result<AkeyIterator> {
        let record = self.object_index.lookup(oid, epr_hi)?;
        let dkey_rec = record.dkeys.get(dkey).ok_or(VosError::NonExistent)?;
        let akeys = dkey_rec.akeys()?;
        let keys: Vec<Vec<u8>> = akeys
            .iter()
            .filter(|(_, rec)| accepted_in_range(rec, epr_lo, epr_hi))
            .map(|(bytes, _)| bytes.clone())
            .collect();
        KeyCursor::new(keys, oid.features().akey_class())
    }

    /// Opens a SINGLE iterator over a single-value akey's own epochs.
    /// `Eq`/`Ge`/`Le` each select at most one epoch; `Re`/`Rr` enumerate the
    /// whole `[epr_lo, epr_hi]` range ascending/descending.
    pub fn single_iter(
        &self,
        oid: ObjectId,
        dkey: &[u8],
        akey: &[u8],
        expr: EpochExpr,
        epr_lo: Epoch,
        epr_hi: Epoch,
    ) -> Result<SingleIterator> {
        let record = self.object_index.lookup(oid, epr_hi)?;
        let dkey_rec = record.dkeys.get(dkey).ok_or(VosError::NonExistent)?;
        let akeys = dkey_rec.akeys()?;
        let akey_rec = akeys.get(akey).ok_or(VosError::NonExistent)?;
        let KeyAttachment::Single(tree) = &akey_rec.attachment else {
            return Err(VosError::Invalid(
                "SINGLE iterator requires a single-value-attached akey".into(),
            ));
        };
        let key = Key::new(akey.to_vec(), tree.class())?;
        let versions: Vec<(Epoch, Vec<u8>)> = tree
            .versions(&key)
            .into_iter()
            .filter(|(_, record)| !record.punched)
            .map(|(epoch, record)| (epoch, record.value))
            .collect();

        let selected: Vec<(Epoch, Vec<u8>)> = match expr {
            EpochExpr::Re => versions
                .into_iter()
                .filter(|(e, _)| *e >= epr_lo && *e <= epr_hi)
                .collect(),
            EpochExpr::Rr => {
                let mut v: Vec<(Epoch, Vec<u8>)> = versions
                    .into_iter()
                    .filter(|(e, _)| *e >= epr_lo && *e <= epr_hi)
                    .collect();
                v.reverse();
                v
            }
            EpochExpr::Eq => versions.into_iter().filter(|(e, _)| *e == epr_lo).collect(),
            EpochExpr::Ge => versions
                .into_iter()
                .find(|(e, _)| *e >= epr_lo)
                .into_iter()
                .collect(),
            EpochExpr::Le => versions.into_iter().filter(|(e, _)| *e <= epr_lo).last().into_iter().collect(),
        };

        if selected.is_empty() {
            return Err(VosError::NonExistent);
        }
        Ok(SingleIterator { versions: selected, pos: 0 })
    }

    /// Opens a RECX iterator over `[lo, hi]` at `epoch`.
    pub fn recx_iter(
        &self,
        oid: ObjectId,
        dkey: &[u8],
        akey: &[u8],
        lo: u64,
        hi: u64,
        epoch: Epoch,
        skip_holes: bool,
    ) -> Result<RecxIterator> {
        let record = self.object_index.lookup(oid, epoch)?;
        let dkey_rec = record.dkeys.get(dkey).ok_or(VosError::NonExistent)?;
        let akeys = dkey_rec.akeys()?;
        let akey_rec = akeys.get(akey).ok_or(VosError::NonExistent)?;
        let KeyAttachment::Array(tree) = &akey_rec.attachment else {
            return Err(VosError::Invalid(
                "RECX iterator requires an array-attached akey".into(),
            ));
        };

        let mut flags = IterFlags::VISIBLE;
        if skip_holes {
            flags |= IterFlags::SKIP_HOLES;
        }
        let mut cursor = EvtIter::default();
        tree.probe(
            &mut cursor,
            flags,
            Filter {
                lo_range: lo,
                hi_range: hi,
                reader_epoch: epoch,
            },
        )?;

        let mut slices = Vec::new();
        loop {
            let slice = tree.fetch(&cursor)?;
            slices.push((slice.lo, slice.hi, slice.is_hole()));
            if tree.next(&mut cursor).is_err() {
                break;
            }
        }
        Ok(RecxIterator { slices, pos: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::open_test_container;
    use crate::iod::{Iod, IodEntry, IoUnit, RecxUnit};
    use vos_types::ids::ObjectFeatureBits;
    use vos_types::key::KeyClass;

    fn oid() -> ObjectId {
        ObjectId::new(0, 1, ObjectFeatureBits::empty()).expect("valid oid")
    }

    fn key(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn dkey_then_akey_iteration_nests() {
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
                            unit: IoUnit::Single(b"x".to_vec()),
                        },
                        IodEntry {
                            dkey: key(b"d1"),
                            akey: key(b"a0"),
                            unit: IoUnit::Single(b"y".to_vec()),
                        },
                    ],
                },
            )
            .expect("update");

        let mut dkeys = container.dkey_iter(oid(), 0, 1, None).expect("dkey iter");
        let mut seen_dkeys = Vec::new();
        loop {
            seen_dkeys.push(dkeys.current().to_vec());
            let akeys = container
                .akey_iter(oid(), dkeys.current(), 0, 1)
                .expect("akey iter");
            assert_eq!(akeys.current(), b"a0");
            if dkeys.advance().is_err() {
                break;
            }
        }
        assert_eq!(seen_dkeys, vec![b"d0".to_vec(), b"d1".to_vec()]);
    }

    #[test]
    fn dkey_iter_honors_the_numeric_comparator_class() {
        let (mut container, _dir) = open_test_container();
        let numeric_oid = ObjectId::new(0, 2, ObjectFeatureBits::DKEY_UINT64).expect("valid oid");

        // Same native-endian-vs-numeric mismatch as the query MIN/MAX test:
        // plain byte order would visit 256 before 1.
        for n in [1u64, 2, 256] {
            container
                .update(
                    numeric_oid,
                    &Iod {
                        epoch: 1,
                        entries: vec![IodEntry {
                            dkey: Key::new(n.to_ne_bytes().to_vec(), KeyClass::NumericU64).expect("valid dkey"),
                            akey: key(b"a0"),
                            unit: IoUnit::Single(n.to_ne_bytes().to_vec()),
                        }],
                    },
                )
                .expect("update");
        }

        let mut dkeys = container
            .dkey_iter(numeric_oid, 0, 1, None)
            .expect("dkey iter");
        let mut seen = Vec::new();
        loop {
            seen.push(dkeys.current().to_vec());
            if dkeys.advance().is_err() {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                1u64.to_ne_bytes().to_vec(),
                2u64.to_ne_bytes().to_vec(),
                256u64.to_ne_bytes().to_vec(),
            ]
        );
    }

    #[test]
    fn single_iterator_rr_enumerates_descending() {
        let (mut container, _dir) = open_test_container();
        for epoch in [2, 4, 6, 8] {
            container
                .update(
                    oid(),
                    &Iod {
                        epoch,
                        entries: vec![IodEntry {
                            dkey: key(b"d0"),
                            akey: key(b"a0"),
                            unit: IoUnit::Single(vec![epoch as u8]),
                        }],
                    },
                )
                .expect("update");
        }

        let mut iter = container
            .single_iter(oid(), b"d0", b"a0", EpochExpr::Rr, 3, 7)
            .expect("single iter");
        let mut seen = Vec::new();
        loop {
            seen.push(iter.current().0);
            if iter.advance().is_err() {
                break;
            }
        }
        assert_eq!(seen, vec![6, 4]);
    }

    #[test]
    fn recx_iterator_surfaces_holes_between_extents() {
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
                            unit: IoUnit::Array(vec![RecxUnit {
                                lo: 0,
                                hi: 1,
                                rec_size: 1,
                                payload: vec![1, 2],
                            }]),
                        },
                        IodEntry {
                            dkey: key(b"d0"),
                            akey: key(b"a0"),
                            unit: IoUnit::Array(vec![RecxUnit {
                                lo: 4,
                                hi: 5,
                                rec_size: 1,
                                payload: vec![3, 4],
                            }]),
                        },
                    ],
                },
            )
            .expect("update");

        let mut iter = container
            .recx_iter(oid(), b"d0", b"a0", 0, 5, 1, false)
            .expect("recx iter");
        let mut slices = Vec::new();
        loop {
            slices.push(iter.current());
            if iter.advance().is_err() {
                break;
            }
        }
        assert_eq!(slices, vec![(0, 1, false), (2, 3, true), (4, 5, false)]);
    }
}
