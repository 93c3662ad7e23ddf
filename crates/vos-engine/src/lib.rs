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

//! # VOS Engine
//!
//! Composes [`vos_storage`]'s index structures into the externally
//! observable object operations: update, fetch, punch, query, and
//! iteration, plus the object handle cache, the I/O descriptor pipeline,
//! fault injection, and pool/container lifecycle glue.

/// Pool/container lifecycle: open, close, bootstrap.
pub mod container;
/// A process-global deterministic fault injection controller.
pub mod fault;
/// A bounded LRU cache of hydrated object handles.
pub mod handle_cache;
/// The I/O descriptor types shared by the update/fetch pipelines.
pub mod iod;
/// update/fetch/punch/query/iter operations.
pub mod ops;
/// Pool lifecycle glue.
pub mod pool;

pub use container::Container;
pub use pool::Pool;
