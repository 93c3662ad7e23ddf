//! Punch: the distinguished update that tombstones an object, dkey, or akey
//! (§4.6.1, §4.4).

use vos_storage::keyrec::KeyRecord;
use vos_types::epoch::{DtxIntent, Epoch};
use vos_types::ids::ObjectId;
use vos_types::key::Key;
use vos_types::Result;

use crate::container::Container;

/// What a punch applies to.
pub enum PunchTarget {
    /// Tombstones the whole object; evicts it from the handle cache so the
    /// next fetch observes the new empty incarnation (§4.4).
    Object,
    Dkey(Key),
    Akey(Key, Key),
}

impl Container {
    pub fn punch(&mut self, oid: ObjectId, epoch: Epoch, target: PunchTarget) -> Result<()> {
        let result = self.apply_punch(oid, epoch, target);
        match &result {
            Ok(()) => vos_telemetry::metrics().inc_punches_total(),
            Err(e) => {
                use vos_types::error::ErrorCode;
                vos_telemetry::metrics().inc_error(e.mnemonic());
            }
        }
        result
    }

    fn apply_punch(&mut self, oid: ObjectId, epoch: Epoch, target: PunchTarget) -> Result<()> {
        match target {
            PunchTarget::Object => {
                self.object_index.punch(oid, epoch)?;
                self.handle_cache.evict(oid);
                Ok(())
            }
            PunchTarget::Dkey(dkey) => {
                let record = self.object_index.find_or_alloc(oid, epoch, DtxIntent::Punch)?;
                let dkey_rec = record
                    .dkeys
                    .entry(dkey.as_bytes().to_vec())
                    .or_insert_with(|| KeyRecord::new_akey_parent(epoch));
                dkey_rec.punch_at(epoch);
                Ok(())
            }
            PunchTarget::Akey(dkey, akey) => {
                let record = self.object_index.find_or_alloc(oid, epoch, DtxIntent::Punch)?;
                let dkey_rec = record
                    .dkeys
                    .entry(dkey.as_bytes().to_vec())
                    .or_insert_with(|| KeyRecord::new_akey_parent(epoch));
                dkey_rec.touch(epoch);
                let akeys = dkey_rec.akeys_mut()?;
                let akey_rec = akeys
                    .entry(akey.as_bytes().to_vec())
                    .or_insert_with(|| KeyRecord::new_leaf(epoch));
                akey_rec.punch_at(epoch);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::test_support::open_test_container;
    use crate::iod::{Iod, IodEntry, IoUnit};
    use crate::ops::fetch::{FetchEntry, FetchRequest, FetchUnit, FetchedValue};
    use crate::ops::EpochExpr;
    use vos_types::ids::ObjectFeatureBits;
    use vos_types::key::KeyClass;

    fn oid() -> ObjectId {
        ObjectId::new(0, 1, ObjectFeatureBits::empty()).expect("valid oid")
    }

    fn key(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn akey_punch_hides_it_without_touching_siblings() {
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
                            unit: IoUnit::Single(b"keep".to_vec()),
                        },
                        IodEntry {
                            dkey: key(b"d0"),
                            akey: key(b"a1"),
                            unit: IoUnit::Single(b"gone".to_vec()),
                        },
                    ],
                },
            )
            .expect("update");

        container
            .punch(oid(), 2, PunchTarget::Akey(key(b"d0"), key(b"a1")))
            .expect("punch a1");

        let request = FetchRequest {
            epoch: 2,
            entries: vec![
                FetchEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: FetchUnit::Single {
                        expr: EpochExpr::Le,
                        epr_lo: 2,
                        epr_hi: 2,
                    },
                },
                FetchEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a1"),
                    unit: FetchUnit::Single {
                        expr: EpochExpr::Le,
                        epr_lo: 2,
                        epr_hi: 2,
                    },
                },
            ],
        };
        let out = container.fetch(oid(), &request).expect("fetch");
        assert_eq!(out[0], FetchedValue::Single(Some(b"keep".to_vec())));
        assert_eq!(out[1], FetchedValue::Single(None));
    }

    #[test]
    fn object_punch_evicts_the_handle_cache_entry() {
        let (mut container, _dir) = open_test_container();
        container
            .update(
                oid(),
                &Iod {
                    epoch: 1,
                    entries: vec![IodEntry {
                        dkey: key(b"d0"),
                        akey: key(b"a0"),
                        unit: IoUnit::Single(b"x".to_vec()),
                    }],
                },
            )
            .expect("update");

        container.punch(oid(), 5, PunchTarget::Object).expect("object punch");
        assert!(container.object_index.lookup(oid(), 3).is_ok());
        assert!(container.object_index.lookup(oid(), 5).is_err());
        assert!(container.handle_cache.is_empty());
    }
}
