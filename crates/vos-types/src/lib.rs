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

//! # VOS Types
//!
//! Foundational data structures, error taxonomy, and configuration for the
//! Versioned Object Store (VOS): the per-target, single-node, transactional,
//! multiversion key-value engine that DAOS-style layers build on.
//!
//! As the base crate, `vos-types` has minimal dependencies and is a
//! dependency for every other crate in the workspace, which keeps the
//! object/key/epoch vocabulary canonical in one place.

/// Epoch arithmetic, the sentinel `EPOCH_MAX`, and DTX intent tags.
pub mod epoch;
/// The stable error taxonomy (`VosError`) and its numeric/string codes.
pub mod error;
/// Object, container, and pool identifiers, and the object-id feature bits.
pub mod ids;
/// Key classes, comparators, and the `Key` newtype.
pub mod key;

/// Bit-flag definitions for object and key-record attributes.
pub mod attrs;
/// Per-instance configuration (`VosConfig`) for a VOS pool.
pub mod config;

/// A crate-wide `Result` alias with the default error type.
pub type Result<T, E = error::VosError> = std::result::Result<T, E>;

pub use epoch::{DtxIntent, Epoch, EPOCH_MAX};
pub use error::{ErrorCode, VosError};
pub use ids::{ContainerId, ObjectId, PoolId};
pub use key::{Key, KeyClass};
