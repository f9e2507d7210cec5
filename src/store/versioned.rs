//! Versioned records and the optimistic update protocol
//!
//! [`VersionedTable`] holds records behind a single `RwLock`. The safety of
//! the protocol rests entirely on the atomic check-and-increment performed
//! under the write guard in [`VersionedTable::update`]: the read a caller did
//! earlier is *not* part of the atomic span, and callers must never respond
//! to a conflict by re-reading and blindly overwriting.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::timeout;

use super::errors::{StoreError, StoreResult};

/// Mandatory per-operation deadline for every store call
pub const OP_TIMEOUT: Duration = Duration::from_secs(3);

/// A persisted record with an identity and a version stamp
pub trait Versioned: Clone + Send + Sync {
    type Key: Eq + Hash + Copy + Send + Sync;

    fn key(&self) -> Self::Key;
    fn version(&self) -> i32;
    fn set_version(&mut self, version: i32);
}

/// In-process table of versioned records
pub struct VersionedTable<T: Versioned> {
    rows: RwLock<HashMap<T::Key, T>>,
}

impl<T: Versioned> Default for VersionedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Versioned> VersionedTable<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh record at version 1.
    ///
    /// The caller allocates the key; inserting over an existing key is a
    /// programming error, not a runtime condition.
    pub async fn insert(&self, row: &mut T) -> StoreResult<()> {
        row.set_version(1);
        let stored = row.clone();
        timed(async {
            let mut rows = self.rows.write().await;
            debug_assert!(
                !rows.contains_key(&stored.key()),
                "insert with an already-used key"
            );
            rows.insert(stored.key(), stored);
            Ok(())
        })
        .await
    }

    /// Fetch a record by key
    pub async fn get(&self, key: T::Key) -> StoreResult<T> {
        timed(async {
            self.rows
                .read()
                .await
                .get(&key)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    /// Apply an optimistic update.
    ///
    /// Atomically, under the write guard: match the record's key AND the
    /// caller-held version; on match, persist the new field values with the
    /// version incremented by exactly 1 (reflected back into `row`). A
    /// missing record or a version mismatch is an [`StoreError::EditConflict`]
    /// and leaves the table untouched.
    pub async fn update(&self, row: &mut T) -> StoreResult<()> {
        let candidate = row.clone();
        let committed = timed(async {
            let mut rows = self.rows.write().await;
            match rows.get_mut(&candidate.key()) {
                Some(stored) if stored.version() == candidate.version() => {
                    let mut next = candidate;
                    next.set_version(next.version() + 1);
                    *stored = next.clone();
                    Ok(next)
                }
                _ => Err(StoreError::EditConflict),
            }
        })
        .await?;

        *row = committed;
        Ok(())
    }

    /// Delete a record; deleting a missing key reports `NotFound` so callers
    /// can tell "already gone" from "deleted"
    pub async fn delete(&self, key: T::Key) -> StoreResult<()> {
        timed(async {
            self.rows
                .write()
                .await
                .remove(&key)
                .map(|_| ())
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    /// Snapshot of all records (listing happens over a point-in-time copy)
    pub async fn snapshot(&self) -> StoreResult<Vec<T>> {
        timed(async { Ok(self.rows.read().await.values().cloned().collect()) }).await
    }
}

/// Bound a store operation by [`OP_TIMEOUT`]
pub(crate) async fn timed<F, T>(op: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    timeout(OP_TIMEOUT, op)
        .await
        .map_err(|_| StoreError::Timeout(OP_TIMEOUT))?
}
