//! PM allocator & transaction shim.
//!
//! Persistent memory is modeled as a single `redb` database file. `redb`'s
//! [`redb::WriteTransaction`] already provides the "commit-or-abort on every
//! exit path" discipline the spec requires: a transaction dropped without
//! `commit()` rolls every staged mutation back and never becomes visible to
//! other readers. `scoped_tx` builds on that by installing the active
//! transaction in a scoped thread-local slot (see [`scoped_tls`]) so nested
//! calls on the same task join the outer transaction instead of opening a
//! second one, mirroring the teacher's `redb_epoch_store.rs` `read_txn`/
//! `write_txn` helpers.

use redb::{Database, ReadableTable, TableDefinition};
use scoped_tls::scoped_thread_local;
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;
use vos_types::error::VosError;
use vos_types::Result;

/// The table backing the monotonic arena allocator. A single row at key `0`
/// holds the next free offset.
const ALLOC_TABLE: TableDefinition<u64, u64> = TableDefinition::new("PM_ALLOC");
const ALLOC_CURSOR_KEY: u64 = 0;

/// An opaque, persistable offset identifying a byte range within the PM pool
/// file. Two explicit conversions exist: [`PmAddr::persist`] to obtain one
/// for a freshly-written record, and [`PmAddr::materialize`] to read the
/// bytes back. The two are never interchangeable with a raw `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PmAddr(u64);

impl PmAddr {
    /// The sentinel meaning "no record" (analogous to a null pointer).
    pub const NIL: PmAddr = PmAddr(0);

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// The raw offset, exposed only for on-disk encoding of composite keys
    /// that embed a `PmAddr` (e.g. a dkey record's subtree root).
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        PmAddr(raw)
    }
}

scoped_thread_local!(static ACTIVE_TX: RefCell<PmTxState>);

/// The record table backing typed allocations: `PmAddr -> bincode bytes`.
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("PM_RECORDS");

struct PmTxState {
    next_addr: u64,
    /// Pending writes, flushed to `redb` tables on commit. Keeping them
    /// buffered in memory (rather than writing directly through the
    /// `redb::WriteTransaction`) lets nested `scoped_tx` calls observe their
    /// own writes without re-opening tables recursively.
    pending: Vec<(PmAddr, Vec<u8>)>,
    freed: Vec<PmAddr>,
    committed: bool,
}

/// A handle to the currently active transaction, obtainable only from
/// within a `scoped_tx` closure (directly, or via a nested call that joined
/// the outer one).
pub struct PmTx<'a> {
    pm: &'a Pm,
}

impl<'a> PmTx<'a> {
    /// Registers an intended byte-range mutation for undo/commit. The
    /// record only becomes visible to other readers at `commit()`; there is
    /// no separate undo log to replay on abort, since an uncommitted
    /// `redb::WriteTransaction` is never exposed to readers in the first
    /// place.
    pub fn tx_add(&self, addr: PmAddr, bytes: Vec<u8>) -> Result<()> {
        if addr.is_nil() {
            return Err(VosError::Invalid("tx_add on nil PmAddr".into()));
        }
        ACTIVE_TX.with(|state| {
            state.borrow_mut().pending.push((addr, bytes));
        });
        Ok(())
    }

    /// Allocates a stable offset from the monotonic arena counter. Freeing
    /// within the same transaction is idempotent (a double free of the same
    /// address is a no-op, not an error).
    pub fn alloc(&self) -> Result<PmAddr> {
        ACTIVE_TX.with(|state| {
            let mut state = state.borrow_mut();
            let addr = PmAddr(state.next_addr);
            state.next_addr += 1;
            Ok(addr)
        })
    }

    pub fn free(&self, addr: PmAddr) -> Result<()> {
        if addr.is_nil() {
            return Ok(());
        }
        ACTIVE_TX.with(|state| {
            let mut state = state.borrow_mut();
            if !state.freed.contains(&addr) {
                state.freed.push(addr);
            }
        });
        Ok(())
    }

    /// Reads a previously persisted record back. Sees this transaction's
    /// own uncommitted writes (read-your-writes) before falling through to
    /// the durable table.
    pub fn materialize(&self, addr: PmAddr) -> Result<Vec<u8>> {
        if addr.is_nil() {
            return Err(VosError::NonExistent);
        }
        let pending_hit = ACTIVE_TX.with(|state| {
            state
                .borrow()
                .pending
                .iter()
                .rev()
                .find(|(a, _)| *a == addr)
                .map(|(_, bytes)| bytes.clone())
        });
        if let Some(bytes) = pending_hit {
            return Ok(bytes);
        }
        let r = self
            .pm
            .db
            .begin_read()
            .map_err(|e| VosError::Io(e.to_string()))?;
        let table = r
            .open_table(RECORDS)
            .map_err(|e| VosError::Io(e.to_string()))?;
        table
            .get(addr.raw())
            .map_err(|e| VosError::Io(e.to_string()))?
            .map(|v| v.value().to_vec())
            .ok_or(VosError::NonExistent)
    }

    /// Serializes `value` with `bincode` and stages it for the allocated
    /// address, returning the address for convenience.
    pub fn persist<T: serde::Serialize>(&self, addr: PmAddr, value: &T) -> Result<PmAddr> {
        let bytes = bincode::serialize(value).map_err(|e| VosError::IoInvalid(e.to_string()))?;
        self.tx_add(addr, bytes)?;
        Ok(addr)
    }

    /// Reads and deserializes a previously persisted record.
    pub fn fetch<T: serde::de::DeserializeOwned>(&self, addr: PmAddr) -> Result<T> {
        let bytes = self.materialize(addr)?;
        bincode::deserialize(&bytes).map_err(|e| VosError::IoInvalid(e.to_string()))
    }
}

/// The PM pool: a `redb` database plus the arena allocator state.
pub struct Pm {
    db: Arc<Database>,
}

impl Pm {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Database::create(path).map_err(|e| VosError::Io(e.to_string()))?;
        {
            let w = db.begin_write().map_err(|e| VosError::Io(e.to_string()))?;
            {
                w.open_table(ALLOC_TABLE)
                    .map_err(|e| VosError::Io(e.to_string()))?;
                w.open_table(RECORDS)
                    .map_err(|e| VosError::Io(e.to_string()))?;
            }
            w.commit().map_err(|e| VosError::Io(e.to_string()))?;
        }
        Ok(Self { db: Arc::new(db) })
    }

    fn load_alloc_cursor(&self) -> Result<u64> {
        let r = self
            .db
            .begin_read()
            .map_err(|e| VosError::Io(e.to_string()))?;
        let table = r
            .open_table(ALLOC_TABLE)
            .map_err(|e| VosError::Io(e.to_string()))?;
        Ok(table
            .get(ALLOC_CURSOR_KEY)
            .map_err(|e| VosError::Io(e.to_string()))?
            .map(|v| v.value())
            // offset 0 is reserved for PmAddr::NIL
            .unwrap_or(1))
    }

    /// Runs `f` under a transaction, guaranteeing commit on `Ok` and abort
    /// on `Err` (or on panic unwinding past this frame). Nested calls on the
    /// same thread join the already-active transaction instead of starting
    /// a new one.
    pub fn scoped_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&PmTx<'_>) -> Result<T>,
    {
        if ACTIVE_TX.is_set() {
            let tx = PmTx { pm: self };
            return f(&tx);
        }

        // Only the outermost call times the transaction; a nested call
        // joins the already-active one above and returns before this point.
        let _timer = vos_telemetry::time::Timer::start();

        let next_addr = self.load_alloc_cursor()?;
        let state = RefCell::new(PmTxState {
            next_addr,
            pending: Vec::new(),
            freed: Vec::new(),
            committed: false,
        });

        let result = ACTIVE_TX.set(&state, || {
            let tx = PmTx { pm: self };
            f(&tx)
        });

        let mut state = state.into_inner();
        match result {
            Ok(value) => {
                self.commit(&mut state)?;
                vos_telemetry::metrics().inc_tx_commits();
                Ok(value)
            }
            Err(e) => {
                // Dropping `state` without writing it back is the abort: no
                // pending byte range ever reached the `redb` tables.
                vos_telemetry::metrics().inc_tx_aborts();
                Err(e)
            }
        }
    }

    fn commit(&self, state: &mut PmTxState) -> Result<()> {
        if state.committed {
            return Ok(());
        }
        let w = self
            .db
            .begin_write()
            .map_err(|e| VosError::Io(e.to_string()))?;
        {
            let mut records = w
                .open_table(RECORDS)
                .map_err(|e| VosError::Io(e.to_string()))?;
            for (addr, bytes) in state.pending.drain(..) {
                records
                    .insert(addr.raw(), bytes.as_slice())
                    .map_err(|e| VosError::Io(e.to_string()))?;
            }
            for addr in state.freed.drain(..) {
                records
                    .remove(addr.raw())
                    .map_err(|e| VosError::Io(e.to_string()))?;
            }
            let mut alloc = w
                .open_table(ALLOC_TABLE)
                .map_err(|e| VosError::Io(e.to_string()))?;
            alloc
                .insert(ALLOC_CURSOR_KEY, state.next_addr)
                .map_err(|e| VosError::Io(e.to_string()))?;
        }
        w.commit().map_err(|e| VosError::Io(e.to_string()))?;
        state.committed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        value: u64,
    }

    fn open_temp() -> (Pm, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pm = Pm::open(dir.path().join("pool.redb")).expect("open pm");
        (pm, dir)
    }

    #[test]
    fn alloc_is_monotonic_across_committed_transactions() {
        let (pm, _dir) = open_temp();
        let a = pm.scoped_tx(|tx| tx.alloc()).expect("tx1");
        let b = pm.scoped_tx(|tx| tx.alloc()).expect("tx2");
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn aborted_transaction_does_not_advance_allocator() {
        let (pm, _dir) = open_temp();
        let before = pm.scoped_tx(|tx| tx.alloc()).expect("tx1");
        let result: Result<()> = pm.scoped_tx(|tx| {
            let _ = tx.alloc()?;
            Err(VosError::Invalid("forced abort".into()))
        });
        assert!(result.is_err());
        let after = pm.scoped_tx(|tx| tx.alloc()).expect("tx3");
        assert_eq!(after.raw(), before.raw() + 1);
    }

    #[test]
    fn persist_then_fetch_round_trips() {
        let (pm, _dir) = open_temp();
        let addr = pm
            .scoped_tx(|tx| {
                let addr = tx.alloc()?;
                tx.persist(addr, &Payload { value: 42 })
            })
            .expect("commit");
        let loaded: Payload = pm.scoped_tx(|tx| tx.fetch(addr)).expect("fetch");
        assert_eq!(loaded, Payload { value: 42 });
    }

    #[test]
    fn nested_scoped_tx_joins_outer_transaction() {
        let (pm, _dir) = open_temp();
        let (outer_addr, inner_addr) = pm
            .scoped_tx(|outer| {
                let outer_addr = outer.alloc()?;
                let inner_addr = pm.scoped_tx(|inner| inner.alloc())?;
                Ok((outer_addr, inner_addr))
            })
            .expect("nested commit");
        assert!(inner_addr.raw() > outer_addr.raw());
    }

    #[test]
    fn materialize_before_commit_sees_own_writes() {
        let (pm, _dir) = open_temp();
        pm.scoped_tx(|tx| {
            let addr = tx.alloc()?;
            tx.persist(addr, &Payload { value: 7 })?;
            let seen: Payload = tx.fetch(addr)?;
            assert_eq!(seen, Payload { value: 7 });
            Ok(())
        })
        .expect("read-your-writes");
    }
}
