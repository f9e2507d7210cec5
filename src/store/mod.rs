//! # Resource Store
//!
//! Versioned record storage with optimistic concurrency control. Every
//! mutable record carries a version stamp starting at 1; an update commits
//! only if the caller's version matches the stored version at write time,
//! otherwise the write is rejected as an edit conflict and nothing changes.
//!
//! All operations run under a mandatory short timeout so a single request
//! cannot hold a store resource indefinitely.

pub mod errors;
pub mod filters;
pub mod movie;
pub mod runtime;
pub mod user;
pub mod versioned;

pub use errors::{StoreError, StoreResult};
pub use filters::{Filters, Metadata, SortField, SortKey};
pub use movie::{Movie, MovieStore};
pub use runtime::Runtime;
pub use user::{User, UserStore};
pub use versioned::{Versioned, VersionedTable, OP_TIMEOUT};
