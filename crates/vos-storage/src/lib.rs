#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

//! # VOS Storage
//!
//! The PM-resident index structures of the Versioned Object Store: the
//! transaction shim over the PM pool ([`pm`]), the ordered key btree
//! ([`kbtr`]), the extent tree ([`evt`]), the per-container object index
//! ([`oi`]), and the BIO bridge that binds PM/NVMe media to I/O descriptors
//! ([`bio`]).

/// BIO bridge: scatter-gather I/O over SCM (mmap) and NVMe (staged) media.
pub mod bio;
/// The epoch/visibility rule shared by KBTR and EVT.
pub mod epoch_visibility;
/// EVT — epoch-versioned extent tree for array values.
pub mod evt;
/// KBTR — ordered key btree keyed by `(key_bytes, epoch)`.
pub mod kbtr;
/// Key records: the dkey/akey entities that own a KBTR or EVT subtree.
pub mod keyrec;
/// Per-container object index.
pub mod oi;
/// PM allocator and transaction shim, backed by `redb`.
pub mod pm;

pub use pm::{Pm, PmAddr};
