//! KBTR — ordered key btree.
//!
//! A generic ordered map keyed by the composite `(key_bytes, epoch)` pair,
//! with a class-aware comparator (opaque / u64-lexical / numeric-u64). Used
//! for dkey trees, akey trees, and single-value trees alike.
//!
//! The composite key is encoded as `key_bytes ++ be64(EPOCH_MAX - epoch)`
//! (see SPEC_FULL §3a) so that ascending byte order over the encoded key
//! yields the class comparator order first, then epoch *descending* — a
//! `GE` probe therefore lands on the most recent version at or before the
//! requested epoch, mirroring the teacher's own big-endian prefix encoding
//! in `redb_epoch_store.rs` (`k_versions`/`k_changes`).

use crate::epoch_visibility::{classify, Visibility};
use std::collections::BTreeMap;
use vos_types::epoch::{DtxIntent, Epoch, EPOCH_MAX};
use vos_types::error::VosError;
use vos_types::key::{Key, KeyClass};
use vos_types::Result;

/// A single KBTR record: the payload plus the (earliest, latest, punched)
/// triple the visibility rule in §4.8 operates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub earliest: Epoch,
    pub latest: Epoch,
    pub punched: bool,
    pub value: Vec<u8>,
}

impl Record {
    fn new_at(epoch: Epoch, value: Vec<u8>) -> Self {
        Self {
            earliest: epoch,
            latest: epoch,
            punched: false,
            value,
        }
    }
}

/// Maps `key` to the byte string whose lexical order matches `class`'s
/// comparator, so the `BTreeMap`'s natural ascending order realizes the
/// class-specific ordering of §4.2. `Opaque`/`U64Lexical` are already
/// byte-sortable by construction; `NumericU64` keys are stored
/// native-endian (`Key::cmp_bytes`) and need a big-endian re-encoding to
/// sort numerically instead of by host byte order.
fn sort_key_bytes(class: KeyClass, key: &[u8]) -> Vec<u8> {
    match class {
        KeyClass::Opaque | KeyClass::U64Lexical => key.to_vec(),
        KeyClass::NumericU64 => {
            let mut arr = [0u8; 8];
            let n = key.len().min(8);
            arr[..n].copy_from_slice(&key[..n]);
            u64::from_ne_bytes(arr).to_be_bytes().to_vec()
        }
    }
}

fn encode_key(class: KeyClass, key: &[u8], epoch: Epoch) -> Vec<u8> {
    let sort_bytes = sort_key_bytes(class, key);
    let mut out = Vec::with_capacity(sort_bytes.len() + 8);
    out.extend_from_slice(&sort_bytes);
    out.extend_from_slice(&(EPOCH_MAX - epoch).to_be_bytes());
    out
}

fn decode_epoch(encoded: &[u8]) -> Epoch {
    let tail = &encoded[encoded.len() - 8..];
    let mut buf = [0u8; 8];
    buf.copy_from_slice(tail);
    EPOCH_MAX - u64::from_be_bytes(buf)
}

/// The class-sorted key bytes a composite entry was stored under (see
/// `sort_key_bytes`) — for `NumericU64` this is the big-endian re-encoding,
/// not the caller's original native-endian bytes.
fn decode_key_bytes(encoded: &[u8]) -> &[u8] {
    &encoded[..encoded.len() - 8]
}

/// An in-process ordered map over composite keys. Backed by a `BTreeMap`
/// whose natural ascending-byte-order iteration already realizes the
/// ordering rule of §4.2 thanks to the encoding above; a real PM-resident
/// tree would instead page this through `vos_storage::pm`, but the ordering
/// and visibility semantics are identical either way.
#[derive(Debug, Default)]
pub struct Kbtr {
    class: KeyClassCell,
    entries: BTreeMap<Vec<u8>, Record>,
}

/// `KeyClass` does not implement `Default`; this newtype lets `Kbtr` derive
/// one while defaulting to `Opaque`, the class used whenever a tree has not
/// yet observed an insert (and hence has no fixed class commitment).
#[derive(Debug, Clone, Copy)]
struct KeyClassCell(KeyClass);
impl Default for KeyClassCell {
    fn default() -> Self {
        KeyClassCell(KeyClass::Opaque)
    }
}

/// Cursor positioning operations for [`Kbtr::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOp {
    First,
    Last,
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

/// An embedded cursor over a [`Kbtr`]. Holds the currently-positioned
/// encoded key, if any.
#[derive(Debug, Default)]
pub struct Iter {
    current: Option<Vec<u8>>,
}

impl Kbtr {
    pub fn new(class: KeyClass) -> Self {
        Self {
            class: KeyClassCell(class),
            entries: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> KeyClass {
        self.class.0
    }

    /// Upserts `(key, epoch) -> value`. A duplicate `(key, epoch)` replaces
    /// the prior record's payload but not its `earliest` (an update of a
    /// value already written at this exact epoch is corrective, not a new
    /// creation).
    pub fn insert_or_update(&mut self, key: &Key, epoch: Epoch, value: Vec<u8>) -> Result<()> {
        let encoded = encode_key(self.class.0, key.as_bytes(), epoch);
        match self.entries.get_mut(&encoded) {
            Some(existing) => {
                existing.latest = existing.latest.max(epoch);
                existing.value = value;
                existing.punched = false;
            }
            None => {
                self.entries.insert(encoded, Record::new_at(epoch, value));
            }
        }
        Ok(())
    }

    /// Marks the record at `(key, epoch)` as punched, creating it first if
    /// absent so a punch of a never-written key still records a tombstone.
    pub fn punch(&mut self, key: &Key, epoch: Epoch) -> Result<()> {
        let encoded = encode_key(self.class.0, key.as_bytes(), epoch);
        let record = self
            .entries
            .entry(encoded)
            .or_insert_with(|| Record::new_at(epoch, Vec::new()));
        record.latest = record.latest.max(epoch);
        record.punched = true;
        Ok(())
    }

    /// Returns the record whose key equals `key` and whose epoch is the
    /// greatest `<= epoch`, honoring `intent` (DTX-aware probing is a
    /// collaborator concern; VOS only tags the lookup — see §6.5).
    pub fn lookup(&self, key: &Key, epoch: Epoch, intent: DtxIntent) -> Result<Record> {
        let _ = intent;
        let probe_key = encode_key(self.class.0, key.as_bytes(), epoch);
        let sort_bytes = sort_key_bytes(self.class.0, key.as_bytes());
        let candidate = self
            .entries
            .range(..=probe_key)
            .rev()
            .find(|(encoded, _)| decode_key_bytes(encoded) == sort_bytes.as_slice());

        let Some((_, record)) = candidate else {
            return Err(VosError::NonExistent);
        };

        match classify(record.earliest, record.latest, record.punched, epoch) {
            Visibility::NotYetCreated | Visibility::Tombstoned => Err(VosError::NonExistent),
            Visibility::Visible { .. } => Ok(record.clone()),
        }
    }

    /// Positions `iter` per `opc`, returning `NONEXIST` when no matching
    /// entry exists.
    pub fn probe(&self, iter: &mut Iter, opc: ProbeOp, anchor: Option<&[u8]>) -> Result<()> {
        let found = match opc {
            ProbeOp::First => self.entries.keys().next().cloned(),
            ProbeOp::Last => self.entries.keys().next_back().cloned(),
            ProbeOp::Ge => {
                let anchor = anchor.ok_or_else(|| VosError::Invalid("GE requires anchor".into()))?;
                self.entries
                    .range(anchor.to_vec()..)
                    .next()
                    .map(|(k, _)| k.clone())
            }
            ProbeOp::Le => {
                let anchor = anchor.ok_or_else(|| VosError::Invalid("LE requires anchor".into()))?;
                self.entries
                    .range(..=anchor.to_vec())
                    .next_back()
                    .map(|(k, _)| k.clone())
            }
            ProbeOp::Eq => {
                let anchor = anchor.ok_or_else(|| VosError::Invalid("EQ requires anchor".into()))?;
                self.entries.get_key_value(anchor).map(|(k, _)| k.clone())
            }
            ProbeOp::Gt => {
                let anchor = anchor.ok_or_else(|| VosError::Invalid("GT requires anchor".into()))?;
                self.entries
                    .range((
                        std::ops::Bound::Excluded(anchor.to_vec()),
                        std::ops::Bound::Unbounded,
                    ))
                    .next()
                    .map(|(k, _)| k.clone())
            }
            ProbeOp::Lt => {
                let anchor = anchor.ok_or_else(|| VosError::Invalid("LT requires anchor".into()))?;
                self.entries
                    .range((
                        std::ops::Bound::Unbounded,
                        std::ops::Bound::Excluded(anchor.to_vec()),
                    ))
                    .next_back()
                    .map(|(k, _)| k.clone())
            }
        };
        iter.current = found;
        if iter.current.is_none() {
            return Err(VosError::NonExistent);
        }
        Ok(())
    }

    /// Advances `iter` to the next entry in ascending encoded-key order.
    pub fn iter_next(&self, iter: &mut Iter, intent: DtxIntent) -> Result<()> {
        let _ = intent;
        let Some(current) = iter.current.clone() else {
            return Err(VosError::NonExistent);
        };
        let next = self
            .entries
            .range((
                std::ops::Bound::Excluded(current),
                std::ops::Bound::Unbounded,
            ))
            .next()
            .map(|(k, _)| k.clone());
        iter.current = next;
        if iter.current.is_none() {
            return Err(VosError::NonExistent);
        }
        Ok(())
    }

    /// Returns the `(key_bytes, epoch, record)` the iterator is positioned
    /// over.
    pub fn iter_fetch(&self, iter: &Iter) -> Result<(Vec<u8>, Epoch, Record)> {
        let current = iter.current.as_ref().ok_or(VosError::NonExistent)?;
        let record = self.entries.get(current).ok_or(VosError::NonExistent)?;
        Ok((
            decode_key_bytes(current).to_vec(),
            decode_epoch(current),
            record.clone(),
        ))
    }

    /// Removes the entry the iterator is positioned over. Reserved for
    /// aggregation/compaction of tombstones past any active reader.
    pub fn delete(&mut self, iter: &Iter) -> Result<()> {
        let current = iter.current.as_ref().ok_or(VosError::NonExistent)?;
        self.entries
            .remove(current)
            .map(|_| ())
            .ok_or(VosError::NonExistent)
    }

    /// All records for `key`, ascending by epoch. Grounds the single-value
    /// epoch expressions of §4.6.4, which select among a key's own epochs
    /// rather than probing by the composite encoded key directly.
    pub fn versions(&self, key: &Key) -> Vec<(Epoch, Record)> {
        let sort_bytes = sort_key_bytes(self.class.0, key.as_bytes());
        let mut out: Vec<(Epoch, Record)> = self
            .entries
            .iter()
            .filter(|(encoded, _)| decode_key_bytes(encoded) == sort_bytes.as_slice())
            .map(|(encoded, record)| (decode_epoch(encoded), record.clone()))
            .collect();
        out.sort_by_key(|(epoch, _)| *epoch);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(bytes: &[u8]) -> Key {
        Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
    }

    #[test]
    fn ge_probe_lands_on_latest_version_at_or_before_epoch() {
        let mut tree = Kbtr::new(KeyClass::Opaque);
        let key = k(b"alpha");
        tree.insert_or_update(&key, 2, vec![2]).expect("insert e2");
        tree.insert_or_update(&key, 4, vec![4]).expect("insert e4");
        tree.insert_or_update(&key, 6, vec![6]).expect("insert e6");

        let rec = tree.lookup(&key, 5, DtxIntent::Default).expect("lookup");
        assert_eq!(rec.value, vec![4]);
    }

    #[test]
    fn lookup_before_earliest_is_nonexistent() {
        let mut tree = Kbtr::new(KeyClass::Opaque);
        let key = k(b"alpha");
        tree.insert_or_update(&key, 5, vec![5]).expect("insert");
        let err = tree.lookup(&key, 1, DtxIntent::Default).unwrap_err();
        assert!(matches!(err, VosError::NonExistent));
    }

    #[test]
    fn punch_hides_key_for_readers_at_or_after_punch_epoch() {
        let mut tree = Kbtr::new(KeyClass::Opaque);
        let key = k(b"alpha");
        tree.insert_or_update(&key, 1, vec![1]).expect("insert");
        tree.punch(&key, 5).expect("punch");

        assert!(tree.lookup(&key, 3, DtxIntent::Default).is_ok());
        assert!(matches!(
            tree.lookup(&key, 5, DtxIntent::Default).unwrap_err(),
            VosError::NonExistent
        ));
        assert!(matches!(
            tree.lookup(&key, 9, DtxIntent::Default).unwrap_err(),
            VosError::NonExistent
        ));
    }

    #[test]
    fn iteration_visits_entries_in_encoded_ascending_order() {
        let mut tree = Kbtr::new(KeyClass::Opaque);
        tree.insert_or_update(&k(b"alpha"), 1, vec![1]).expect("a1");
        tree.insert_or_update(&k(b"alpha"), 2, vec![2]).expect("a2");
        tree.insert_or_update(&k(b"beta"), 1, vec![1]).expect("b1");

        let mut iter = Iter::default();
        tree.probe(&mut iter, ProbeOp::First, None).expect("first");
        let mut seen = Vec::new();
        loop {
            let (key_bytes, epoch, _) = tree.iter_fetch(&iter).expect("fetch");
            seen.push((key_bytes, epoch));
            if tree.iter_next(&mut iter, DtxIntent::Default).is_err() {
                break;
            }
        }
        // alpha@2 sorts before alpha@1 (epoch descending within equal key bytes).
        assert_eq!(
            seen,
            vec![
                (b"alpha".to_vec(), 2),
                (b"alpha".to_vec(), 1),
                (b"beta".to_vec(), 1),
            ]
        );
    }

    #[test]
    fn versions_are_returned_ascending_by_epoch() {
        let mut tree = Kbtr::new(KeyClass::Opaque);
        let key = k(b"alpha");
        tree.insert_or_update(&key, 8, vec![8]).expect("e8");
        tree.insert_or_update(&key, 2, vec![2]).expect("e2");
        tree.insert_or_update(&key, 4, vec![4]).expect("e4");

        let versions = tree.versions(&key);
        let epochs: Vec<Epoch> = versions.iter().map(|(e, _)| *e).collect();
        assert_eq!(epochs, vec![2, 4, 8]);
    }
}
