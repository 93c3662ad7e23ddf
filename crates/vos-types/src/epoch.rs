//! Epoch versioning primitives shared by every VOS index.

/// An unsigned, monotonically increasing versioning timestamp. Every write
/// carries one; every reader names one to define what it can see.
pub type Epoch = u64;

/// Sentinel denoting "unbounded future" — a reader at `EPOCH_MAX` observes
/// every committed write.
pub const EPOCH_MAX: Epoch = u64::MAX;

/// Governs whether a lookup observes entries staged by an in-flight,
/// not-yet-committed distributed transaction (DTX).
///
/// VOS itself does not resolve DTX state; it only tags lookups with the
/// caller's intent so the (external) DTX layer can decide how to treat
/// in-progress entries it encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DtxIntent {
    /// Ordinary reads: uncommitted entries from other transactions are
    /// invisible, and return `INPROGRESS` so the caller can retry or skip.
    #[default]
    Default,
    /// The lookup is itself part of an update path and may need to observe
    /// (and replace) an entry it previously staged in the same transaction.
    Update,
    /// The lookup is part of a punch path; skips committed tombstones that
    /// would otherwise shadow the entry being probed for.
    Punch,
}
