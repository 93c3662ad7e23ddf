//! Key classes and comparators shared by the dkey, akey, and single-value trees.

use crate::error::VosError;
use std::cmp::Ordering;

/// Selects how two keys of the same kind (both dkeys, or both akeys) are
/// ordered. The class is picked once per object via [`crate::ids::ObjectFeatureBits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    /// Variable-length byte strings, compared lexicographically.
    Opaque,
    /// Fixed-width (8-byte) keys, compared as raw bytes. Distinct from
    /// [`KeyClass::NumericU64`]: callers who want byte-sortable keys that
    /// also happen to be a meaningful integer encode big-endian themselves
    /// and use this class; VOS never reinterprets the bytes as a number.
    U64Lexical,
    /// Fixed-width (8-byte) keys interpreted as a native-endian `u64` and
    /// compared numerically, independent of the host's byte order.
    NumericU64,
}

/// An owned key: its raw bytes plus the class that determines its ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    bytes: Vec<u8>,
    class: KeyClass,
}

impl Key {
    /// Maximum key length VOS will accept; beyond this the PM node encoding
    /// could no longer guarantee an embedded (pointer-chase-free) leaf.
    pub const MAX_LEN: usize = 4096;

    /// Constructs a key, validating length and (for fixed-width classes) width.
    pub fn new(bytes: Vec<u8>, class: KeyClass) -> Result<Self, VosError> {
        if bytes.is_empty() {
            return Err(VosError::Invalid("key length must be nonzero".into()));
        }
        if bytes.len() > Self::MAX_LEN {
            return Err(VosError::Invalid(format!(
                "key length {} exceeds maximum {}",
                bytes.len(),
                Self::MAX_LEN
            )));
        }
        if matches!(class, KeyClass::U64Lexical | KeyClass::NumericU64) && bytes.len() != 8 {
            return Err(VosError::Invalid(
                "u64-lexical and numeric-u64 keys must be exactly 8 bytes".into(),
            ));
        }
        Ok(Self { bytes, class })
    }

    /// The raw key bytes as supplied by the caller.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The key's comparator class.
    pub fn class(&self) -> KeyClass {
        self.class
    }

    /// Compares two keys of the same class; classes must agree because a
    /// single tree never mixes comparators within one object.
    pub fn cmp_bytes(class: KeyClass, a: &[u8], b: &[u8]) -> Ordering {
        match class {
            KeyClass::Opaque | KeyClass::U64Lexical => a.cmp(b),
            KeyClass::NumericU64 => {
                let av = u64_from_slice(a);
                let bv = u64_from_slice(b);
                av.cmp(&bv)
            }
        }
    }
}

fn u64_from_slice(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    let n = bytes.len().min(8);
    arr[..n].copy_from_slice(&bytes[..n]);
    u64::from_ne_bytes(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(
            Key::new(vec![], KeyClass::Opaque),
            Err(VosError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_oversized_key() {
        let bytes = vec![0u8; Key::MAX_LEN + 1];
        assert!(matches!(
            Key::new(bytes, KeyClass::Opaque),
            Err(VosError::Invalid(_))
        ));
    }

    #[test]
    fn numeric_class_orders_by_value_not_bytes() {
        let a = 1u64.to_ne_bytes().to_vec();
        let b = 2u64.to_ne_bytes().to_vec();
        assert_eq!(
            Key::cmp_bytes(KeyClass::NumericU64, &a, &b),
            Ordering::Less
        );
    }

    #[test]
    fn lexical_class_orders_by_bytes() {
        let a = [0u8, 0, 0, 0, 0, 0, 0, 2];
        let b = [0u8, 0, 0, 0, 0, 0, 0, 1];
        assert_eq!(
            Key::cmp_bytes(KeyClass::U64Lexical, &a, &b),
            Ordering::Greater
        );
    }
}
