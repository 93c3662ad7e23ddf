//! Pool, container, and object identifiers.

use crate::error::VosError;
use crate::key::KeyClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pool identifier. A pool is a single PM file plus an NVMe blob; exactly
/// one open handle may exist per process-thread for a given pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub Uuid);

/// A container identifier, unique within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub Uuid);

bitflags::bitflags! {
    /// Feature bits packed into `ObjectId::hi`. These select the dkey/akey
    /// comparator classes; everything else about object identity lives in
    /// `lo`/the low bits of `hi`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectFeatureBits: u32 {
        /// dkey comparator uses native u64 ordering.
        const DKEY_UINT64  = 0b0000_0001;
        /// dkey comparator uses lexicographic ordering over a fixed-width u64.
        const DKEY_LEXICAL = 0b0000_0010;
        /// akey comparator uses native u64 ordering.
        const AKEY_UINT64  = 0b0000_0100;
        /// akey comparator uses lexicographic ordering over a fixed-width u64.
        const AKEY_LEXICAL = 0b0000_1000;
    }
}

impl ObjectFeatureBits {
    /// Rejects feature-bit combinations the spec calls out as invalid:
    /// a key kind cannot be both native-numeric and lexical at once.
    pub fn validate(self) -> Result<(), VosError> {
        let dkey_both = self.contains(Self::DKEY_UINT64) && self.contains(Self::DKEY_LEXICAL);
        let akey_both = self.contains(Self::AKEY_UINT64) && self.contains(Self::AKEY_LEXICAL);
        if dkey_both || akey_both {
            return Err(VosError::Invalid(
                "an object id cannot set both UINT64 and LEXICAL for the same key kind".into(),
            ));
        }
        Ok(())
    }

    /// The comparator class the dkey tree under an object with these
    /// feature bits should use: numeric if `DKEY_UINT64` is set, lexical
    /// over a fixed-width encoding if `DKEY_LEXICAL` is set, opaque
    /// otherwise.
    pub fn dkey_class(self) -> KeyClass {
        if self.contains(Self::DKEY_UINT64) {
            KeyClass::NumericU64
        } else if self.contains(Self::DKEY_LEXICAL) {
            KeyClass::U64Lexical
        } else {
            KeyClass::Opaque
        }
    }

    /// The akey-tree analogue of [`Self::dkey_class`].
    pub fn akey_class(self) -> KeyClass {
        if self.contains(Self::AKEY_UINT64) {
            KeyClass::NumericU64
        } else if self.contains(Self::AKEY_LEXICAL) {
            KeyClass::U64Lexical
        } else {
            KeyClass::Opaque
        }
    }
}

/// A 128-bit object identifier: `hi` carries feature flags (see
/// [`ObjectFeatureBits`]), `lo` is an opaque caller-assigned discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    /// High 64 bits: feature bits plus caller-reserved high bits.
    pub hi: u64,
    /// Low 64 bits: opaque, caller-assigned.
    pub lo: u64,
}

impl ObjectId {
    /// Builds an object id with the given feature bits set in `hi`'s low 32 bits.
    pub fn new(hi: u64, lo: u64, features: ObjectFeatureBits) -> Result<Self, VosError> {
        features.validate()?;
        Ok(Self {
            hi: hi | features.bits() as u64,
            lo,
        })
    }

    /// Extracts the feature bits packed into `hi`.
    pub fn features(&self) -> ObjectFeatureBits {
        ObjectFeatureBits::from_bits_truncate(self.hi as u32)
    }

    /// Serializes the object id to its canonical 16-byte big-endian form,
    /// used as a prefix for every PM key derived from this object.
    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_conflicting_dkey_feature_bits() {
        let err = ObjectId::new(
            0,
            1,
            ObjectFeatureBits::DKEY_UINT64 | ObjectFeatureBits::DKEY_LEXICAL,
        )
        .unwrap_err();
        assert!(matches!(err, VosError::Invalid(_)));
    }

    #[test]
    fn roundtrips_feature_bits() {
        let oid = ObjectId::new(0, 42, ObjectFeatureBits::AKEY_UINT64).unwrap();
        assert!(oid.features().contains(ObjectFeatureBits::AKEY_UINT64));
        assert!(!oid.features().contains(ObjectFeatureBits::AKEY_LEXICAL));
    }
}
