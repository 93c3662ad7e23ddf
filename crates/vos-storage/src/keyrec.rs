//! Key records: the dkey- and akey-level entities of the data model.
//!
//! Unlike [`crate::kbtr::Kbtr`] (an epoch-versioned map of *values*), a key
//! record is a single per-key entity carrying its own `(earliest, latest,
//! punched)` triple and exactly one attached subtree — the sum type the
//! Design Notes (§9) call for in place of bit-packed key flags.

use vos_types::attrs::KeyBodyKind;
use vos_types::epoch::Epoch;
use vos_types::error::VosError;
use vos_types::key::KeyClass;
use vos_types::Result;
use std::collections::HashMap;

use crate::evt::Evt;
use crate::kbtr::Kbtr;

/// What a key record has attached. A dkey's attachment is always
/// [`KeyAttachment::Akeys`]; an akey's is [`KeyAttachment::Single`] or
/// [`KeyAttachment::Array`], chosen by the first write and fixed thereafter
/// (a key record is `Evt`-bearing XOR `Btr`-bearing, never both).
pub enum KeyAttachment {
    Empty,
    Akeys(HashMap<Vec<u8>, KeyRecord>),
    Single(Kbtr),
    Array(Evt),
}

impl std::fmt::Debug for KeyAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyAttachment::Empty => write!(f, "Empty"),
            KeyAttachment::Akeys(m) => write!(f, "Akeys({} entries)", m.len()),
            KeyAttachment::Single(t) => write!(f, "Single({} entries)", t.len()),
            KeyAttachment::Array(t) => write!(f, "Array({} entries)", t.len()),
        }
    }
}

impl KeyAttachment {
    pub fn kind(&self) -> KeyBodyKind {
        match self {
            KeyAttachment::Empty => KeyBodyKind::Empty,
            KeyAttachment::Akeys(_) => KeyBodyKind::Empty,
            KeyAttachment::Single(_) => KeyBodyKind::Btr,
            KeyAttachment::Array(_) => KeyBodyKind::Evt,
        }
    }
}

/// A single dkey or akey record.
#[derive(Debug)]
pub struct KeyRecord {
    pub earliest: Epoch,
    pub latest: Epoch,
    pub punched: bool,
    pub attachment: KeyAttachment,
}

impl KeyRecord {
    pub fn new_akey_parent(epoch: Epoch) -> Self {
        Self {
            earliest: epoch,
            latest: epoch,
            punched: false,
            attachment: KeyAttachment::Akeys(HashMap::new()),
        }
    }

    pub fn new_leaf(epoch: Epoch) -> Self {
        Self {
            earliest: epoch,
            latest: epoch,
            punched: false,
            attachment: KeyAttachment::Empty,
        }
    }

    pub fn touch(&mut self, epoch: Epoch) {
        self.earliest = self.earliest.min(epoch);
        self.latest = self.latest.max(epoch);
    }

    pub fn punch_at(&mut self, epoch: Epoch) {
        self.latest = self.latest.max(epoch);
        self.punched = true;
    }

    /// Attaches a single-value tree under `class` (the akey's own comparator
    /// class, per the object's feature bits), failing `INVAL` if an extent
    /// tree was already attached (a key record is `Evt`-bearing XOR
    /// `Btr`-bearing).
    pub fn ensure_single(&mut self, class: KeyClass) -> Result<&mut Kbtr> {
        if matches!(self.attachment, KeyAttachment::Empty) {
            self.attachment = KeyAttachment::Single(Kbtr::new(class));
        }
        match &mut self.attachment {
            KeyAttachment::Single(tree) => Ok(tree),
            _ => Err(VosError::Invalid(
                "akey already carries an array attachment".into(),
            )),
        }
    }

    /// Attaches an extent tree, failing `INVAL` if a single-value tree was
    /// already attached.
    pub fn ensure_array(&mut self) -> Result<&mut Evt> {
        if matches!(self.attachment, KeyAttachment::Empty) {
            self.attachment = KeyAttachment::Array(Evt::new());
        }
        match &mut self.attachment {
            KeyAttachment::Array(tree) => Ok(tree),
            _ => Err(VosError::Invalid(
                "akey already carries a single-value attachment".into(),
            )),
        }
    }

    pub fn akeys_mut(&mut self) -> Result<&mut HashMap<Vec<u8>, KeyRecord>> {
        match &mut self.attachment {
            KeyAttachment::Akeys(map) => Ok(map),
            _ => Err(VosError::Invalid("not a dkey-shaped key record".into())),
        }
    }

    pub fn akeys(&self) -> Result<&HashMap<Vec<u8>, KeyRecord>> {
        match &self.attachment {
            KeyAttachment::Akeys(map) => Ok(map),
            _ => Err(VosError::Invalid("not a dkey-shaped key record".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_single_then_array_is_rejected() {
        let mut rec = KeyRecord::new_leaf(1);
        rec.ensure_single(KeyClass::Opaque).expect("attach single");
        assert!(rec.ensure_array().is_err());
    }

    #[test]
    fn ensure_array_then_single_is_rejected() {
        let mut rec = KeyRecord::new_leaf(1);
        rec.ensure_array().expect("attach array");
        assert!(rec.ensure_single(KeyClass::Opaque).is_err());
    }

    #[test]
    fn akeys_accessor_rejects_leaf_records() {
        let rec = KeyRecord::new_leaf(1);
        assert!(rec.akeys().is_err());
    }
}
