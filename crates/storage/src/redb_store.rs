// Path: crates/storage/src/redb_store.rs

//! redb-backed implementation of [`KvStore`].
//!
//! A single table holds the whole key space (the fill-status singleton under
//! its reserved prefix, table rows under their schema prefixes). Each write
//! batch is one redb write transaction committed with eventual durability;
//! `flush(sync = true)` commits an empty transaction with immediate
//! durability, which redb guarantees persists every prior eventual commit.

use crate::kv::{KvStore, StorageError, WriteBatch};
use redb::{Database, Durability, ReadableTable, TableDefinition};
use std::path::Path;

const STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("STATE");

/// A [`KvStore`] stored in a single redb database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens (or creates) the database at `path` and ensures the state table
    /// exists, so that reads on a fresh store see an empty table rather than
    /// a missing one.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;

        let txn = db
            .begin_write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        txn.open_table(STATE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        txn.commit()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::info!(target: "storage", path = %path.display(), "opened store");
        Ok(Self { db })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = txn
            .open_table(STATE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = txn
            .open_table(STATE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let range = match end {
            Some(end) => table.range(start..end),
            None => table.range(start..),
        }
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut out = Vec::new();
        for entry in range {
            let (key, value) = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            out.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(out)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        txn.set_durability(Durability::Eventual);
        {
            let mut table = txn
                .open_table(STATE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for (key, value) in &batch.puts {
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
            for key in &batch.deletes {
                table
                    .remove(key.as_slice())
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
        }
        txn.commit()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn flush(&self, sync: bool) -> Result<(), StorageError> {
        if !sync {
            // Eventual-durability commits already queue their fsync; nothing
            // to forward for a non-blocking flush.
            return Ok(());
        }
        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        txn.set_durability(Durability::Immediate);
        txn.open_table(STATE)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        txn.commit()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
