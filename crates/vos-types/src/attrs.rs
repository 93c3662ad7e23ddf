//! Bit-flag attachments for object records and key records.

use crate::error::VosError;

bitflags::bitflags! {
    /// User- and system-visible object attribute bits.
    ///
    /// `PUNCHED` and `REMOVED` are reserved for VOS's own bookkeeping: the
    /// public `set_attr`/`clear_attr` API refuses to touch them (§4.4).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectAttrs: u64 {
        /// The object has been punched (tombstoned) as a whole.
        const PUNCHED = 1 << 0;
        /// The object has been fully removed and its record reclaimed.
        const REMOVED = 1 << 1;
        /// First user-assignable bit; everything below `USER_BASE` is reserved.
        const USER_BASE = 1 << 8;
    }
}

/// Bits the public API may never set or clear directly.
pub const OBJECT_ATTRS_RESERVED: ObjectAttrs =
    ObjectAttrs::PUNCHED.union(ObjectAttrs::REMOVED);

impl ObjectAttrs {
    /// Validates a caller-supplied attribute mask for `set_attr`/`clear_attr`,
    /// rejecting any attempt to touch the reserved bits (§4.4).
    pub fn validate_user_mask(self) -> Result<(), VosError> {
        if self.intersects(OBJECT_ATTRS_RESERVED) {
            return Err(VosError::Invalid(
                "PUNCHED and REMOVED bits cannot be set or cleared through the public API".into(),
            ));
        }
        Ok(())
    }
}

/// Which subtree, if any, a key record has attached. A key record is either
/// `Evt`-bearing (array values) XOR `Btr`-bearing (single values); `Empty`
/// is the transient state between `insert-if-missing` and attaching a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyBodyKind {
    /// No subtree attached yet.
    #[default]
    Empty,
    /// An extent tree (array value) is attached.
    Evt,
    /// A single-value btree is attached.
    Btr,
}

bitflags::bitflags! {
    /// Per-key-record bits orthogonal to [`KeyBodyKind`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyRecordFlags: u8 {
        /// The key has been punched (tombstoned) at `latest`.
        const PUNCHED = 1 << 0;
    }
}
