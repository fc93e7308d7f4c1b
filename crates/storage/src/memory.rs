// Path: crates/storage/src/memory.rs

//! An in-memory [`KvStore`] used by the engine's tests.
//!
//! Mirrors the redb store's semantics (atomic batches, ordered scans) over a
//! `BTreeMap`, and adds failure injection so commit-failure paths can be
//! exercised deterministically.

use crate::kv::{KvStore, StorageError, WriteBatch};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// A [`KvStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    batches: AtomicUsize,
    flushes: AtomicUsize,
    fail_next_batch: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successfully applied write batches, i.e. commit events.
    pub fn write_batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of flush calls observed.
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Makes the next `write_batch` call fail with a backend error, leaving
    /// the store contents untouched.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    /// Returns a copy of the full committed contents.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StorageError::Backend("lock poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StorageError::Backend("lock poisoned".to_string()))?;
        let upper = match end {
            Some(end) => Bound::Excluded(end.to_vec()),
            None => Bound::Unbounded,
        };
        Ok(guard
            .range((Bound::Included(start.to_vec()), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StorageError::Backend("lock poisoned".to_string()))?;
        for (key, value) in batch.puts {
            guard.insert(key, value);
        }
        for key in batch.deletes {
            guard.remove(&key);
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&self, _sync: bool) -> Result<(), StorageError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
