// Path: crates/storage/src/view.rs

//! The buffered write view the engine materializes deltas into.
//!
//! A `WriteView` accumulates one commit window's mutations in an ordered
//! overlay and presents read-your-writes semantics on top of the committed
//! store. `commit()` turns the overlay into a single atomic batch; a failed
//! commit leaves the overlay intact so nothing is half-applied.

use crate::kv::{KvStore, StorageError, WriteBatch};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// A buffered, committable overlay on top of a [`KvStore`].
///
/// `None` in the overlay marks a pending delete.
pub struct WriteView {
    store: Arc<dyn KvStore>,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteView {
    /// Creates an empty view over `store`.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store, pending: BTreeMap::new() }
    }

    /// Returns the value visible at `key`: a pending write if one exists,
    /// otherwise the committed store value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(pending) = self.pending.get(key) {
            return Ok(pending.clone());
        }
        self.store.get(key)
    }

    /// Enqueues an insert-or-replace. No store I/O happens until commit.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, Some(value));
    }

    /// Enqueues a delete. No store I/O happens until commit.
    pub fn erase(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Returns the pairs with `start <= key < end` as they would appear
    /// after a commit, in key order. The result is a consistent snapshot:
    /// committed state merged with the pending overlay.
    pub fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan(start, end)?.into_iter().collect();

        let upper = match end {
            Some(end) => Bound::Excluded(end.to_vec()),
            None => Bound::Unbounded,
        };
        for (key, pending) in self.pending.range((Bound::Included(start.to_vec()), upper)) {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Number of pending mutations.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Atomically applies all pending mutations to the store, then clears
    /// the overlay. On failure the overlay is left intact and the store is
    /// unchanged; the view remains usable for a retry.
    pub fn commit(&mut self) -> Result<(), StorageError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        for (key, pending) in &self.pending {
            match pending {
                Some(value) => batch.put(key.clone(), value.clone()),
                None => batch.delete(key.clone()),
            }
        }
        self.store.write_batch(batch)?;
        self.pending.clear();
        Ok(())
    }

    /// Forwards a flush to the store. `sync = true` blocks until everything
    /// previously committed is durable.
    pub fn flush(&self, sync: bool) -> Result<(), StorageError> {
        self.store.flush(sync)
    }
}
