//! The operation engine: update, fetch, punch, query, and iteration
//! pipelines (§4.6), each an `impl Container` block composing the object
//! index, BIO bridge, and PM transaction shim.

pub mod fetch;
pub mod iter;
pub mod punch;
pub mod query;
pub mod update;

use std::collections::HashMap;
use vos_storage::epoch_visibility::{classify, Visibility};
use vos_storage::keyrec::KeyRecord;
use vos_types::epoch::Epoch;

/// Drives KBTR probing along the epoch dimension of a single-value akey
/// (§4.6.4). `Re`/`Rr` enumerate a range and belong to the SINGLE iterator
/// (§4.6.3); a one-shot `fetch` only accepts `Eq`/`Ge`/`Le`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochExpr {
    Eq,
    Re,
    Rr,
    Ge,
    Le,
}

/// Looks up `key_bytes` in a dkey or akey map, applying the uniform
/// visibility rule (§4.8). Returns `None` for "not yet created",
/// "tombstoned", and "never written" alike — callers that need to
/// distinguish absence from tombstoning use `map.get` directly.
pub(crate) fn resolve_key_record<'a>(
    map: &'a HashMap<Vec<u8>, KeyRecord>,
    key_bytes: &[u8],
    epoch: Epoch,
) -> Option<&'a KeyRecord> {
    let record = map.get(key_bytes)?;
    match classify(record.earliest, record.latest, record.punched, epoch) {
        Visibility::Visible { .. } => Some(record),
        Visibility::NotYetCreated | Visibility::Tombstoned => None,
    }
}
