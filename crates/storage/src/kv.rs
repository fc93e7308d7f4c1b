// Path: crates/storage/src/kv.rs

//! The store interface the engine is written against.

use thiserror::Error;

/// Represents errors that can occur within the durable storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A generic error originating from the underlying key-value store
    /// backend (e.g. redb).
    #[error("backend error: {0}")]
    Backend(String),
    /// An error occurred while serializing data for storage.
    #[error("encode error: {0}")]
    Encode(String),
    /// An error occurred while deserializing data from storage.
    #[error("decode error: {0}")]
    Decode(String),
}

/// An atomic set of mutations. Either every put and delete in the batch
/// becomes visible, or none do.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    /// Key/value pairs to insert or replace.
    pub puts: Vec<(Vec<u8>, Vec<u8>)>,
    /// Keys to remove.
    pub deletes: Vec<Vec<u8>>,
}

impl WriteBatch {
    /// Queues an insert-or-replace.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.puts.push((key, value));
    }

    /// Queues a removal.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.deletes.push(key);
    }

    /// True when the batch carries no mutations.
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Number of mutations in the batch.
    pub fn len(&self) -> usize {
        self.puts.len() + self.deletes.len()
    }
}

/// An ordered key-value store with atomic batched writes.
///
/// Keys and values are arbitrary byte strings; keys are totally ordered
/// lexicographically. The filler is the sole writer; the store must provide
/// snapshot isolation for concurrent readers so an in-flight batch is never
/// observed partially applied.
pub trait KvStore: Send + Sync {
    /// Gets the committed value for a key, if it exists.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns the committed pairs with `start <= key < end`, in key order.
    /// `end = None` means unbounded.
    ///
    /// The result is materialized from a single read snapshot.
    fn scan(&self, start: &[u8], end: Option<&[u8]>)
        -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Atomically applies a batch of mutations.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Flushes buffered writes toward the storage medium. With `sync = true`
    /// the call blocks until everything previously committed is durable.
    fn flush(&self, sync: bool) -> Result<(), StorageError>;
}
