//! Object index (OI).
//!
//! A per-container map from `object_id` to an in-PM object record, carrying
//! the object's attribute bits, its (earliest, latest) epoch pair, and the
//! root of its dkey tree.

use std::collections::HashMap;
use vos_types::attrs::ObjectAttrs;
use vos_types::epoch::{DtxIntent, Epoch};
use vos_types::error::VosError;
use vos_types::ids::ObjectId;
use vos_types::Result;

use crate::keyrec::KeyRecord;
use std::collections::HashMap as DkeyMap;

/// The PM-resident record an OI entry wraps. `dkeys` is the in-memory
/// stand-in for the persisted dkey-tree root pointer (see `keyrec`'s own
/// doc comment on the PM-paging simplification).
#[derive(Debug)]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    pub earliest: Epoch,
    pub latest: Epoch,
    pub attrs: ObjectAttrs,
    pub dkeys: DkeyMap<Vec<u8>, KeyRecord>,
}

impl ObjectRecord {
    fn new(object_id: ObjectId, epoch: Epoch) -> Self {
        Self {
            object_id,
            earliest: epoch,
            latest: epoch,
            attrs: ObjectAttrs::empty(),
            dkeys: DkeyMap::new(),
        }
    }
}

/// Per-container map from `object_id` to [`ObjectRecord`].
#[derive(Debug, Default)]
pub struct ObjectIndex {
    objects: HashMap<ObjectId, ObjectRecord>,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `oid`, allocating an empty one at `epoch` if
    /// absent. `intent` is accepted for API symmetry with the KBTR/EVT
    /// lookups the caller composes this with; the DTX layer is the actual
    /// consumer of intent-aware blocking (§6.5).
    pub fn find_or_alloc(
        &mut self,
        oid: ObjectId,
        epoch: Epoch,
        intent: DtxIntent,
    ) -> Result<&mut ObjectRecord> {
        let _ = intent;
        Ok(self
            .objects
            .entry(oid)
            .or_insert_with(|| ObjectRecord::new(oid, epoch)))
    }

    /// Looks up `oid` without creating it; `NONEXIST` if absent or if the
    /// object is tombstoned for a reader at `epoch`.
    pub fn lookup(&self, oid: ObjectId, epoch: Epoch) -> Result<&ObjectRecord> {
        let record = self.objects.get(&oid).ok_or(VosError::NonExistent)?;
        match crate::epoch_visibility::classify(
            record.earliest,
            record.latest,
            record.attrs.contains(ObjectAttrs::PUNCHED),
            epoch,
        ) {
            crate::epoch_visibility::Visibility::Visible { .. } => Ok(record),
            _ => Err(VosError::NonExistent),
        }
    }

    /// Marks `oid` tombstoned at `epoch`. Later reads at `E >= epoch`
    /// observe an empty object; per §4.4, the object must also be evicted
    /// from the handle cache by the caller so the next fetch sees the new
    /// empty incarnation.
    pub fn punch(&mut self, oid: ObjectId, epoch: Epoch) -> Result<()> {
        let record = self.objects.get_mut(&oid).ok_or(VosError::NonExistent)?;
        record.latest = record.latest.max(epoch);
        record.attrs |= ObjectAttrs::PUNCHED;
        Ok(())
    }

    /// Bitmask accessors. `PUNCHED`/`REMOVED` cannot be set or cleared
    /// through the public API.
    pub fn set_attr(&mut self, oid: ObjectId, bits: ObjectAttrs) -> Result<()> {
        bits.validate_user_mask()?;
        let record = self.objects.get_mut(&oid).ok_or(VosError::NonExistent)?;
        record.attrs |= bits;
        Ok(())
    }

    pub fn clear_attr(&mut self, oid: ObjectId, bits: ObjectAttrs) -> Result<()> {
        bits.validate_user_mask()?;
        let record = self.objects.get_mut(&oid).ok_or(VosError::NonExistent)?;
        record.attrs &= !bits;
        Ok(())
    }

    /// Unlike the other accessors, a nonexistent object succeeds here with
    /// `attr=0` (§4.4 invariant).
    pub fn get_attr(&self, oid: ObjectId) -> ObjectAttrs {
        self.objects
            .get(&oid)
            .map(|r| r.attrs)
            .unwrap_or_else(ObjectAttrs::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vos_types::ids::ObjectFeatureBits;

    fn oid(lo: u64) -> ObjectId {
        ObjectId::new(0, lo, ObjectFeatureBits::empty()).expect("valid oid")
    }

    #[test]
    fn get_attr_on_nonexistent_object_is_zero() {
        let index = ObjectIndex::new();
        assert!(index.get_attr(oid(1)).is_empty());
    }

    #[test]
    fn reserved_bits_cannot_be_set_through_public_api() {
        let mut index = ObjectIndex::new();
        index.find_or_alloc(oid(1), 1, DtxIntent::Default).expect("alloc");
        let err = index.set_attr(oid(1), ObjectAttrs::PUNCHED).unwrap_err();
        assert!(matches!(err, VosError::Invalid(_)));
    }

    #[test]
    fn punch_hides_object_for_readers_at_or_after_epoch() {
        let mut index = ObjectIndex::new();
        index.find_or_alloc(oid(1), 1, DtxIntent::Default).expect("alloc");
        index.punch(oid(1), 5).expect("punch");

        assert!(index.lookup(oid(1), 3).is_ok());
        assert!(matches!(
            index.lookup(oid(1), 5).unwrap_err(),
            VosError::NonExistent
        ));
    }
}
