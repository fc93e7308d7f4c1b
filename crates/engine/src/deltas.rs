// Path: crates/engine/src/deltas.rs

//! Materialization of a block's delta batch into the write view.

use crate::error::FillError;
use statefill_storage::WriteView;
use statefill_types::codec::from_bytes_canonical;
use statefill_types::wire::TableDelta;
use statefill_upstream::SchemaRegistry;

/// Progress (and, during bootstrap, intermediate-write) cadence for table
/// deltas larger than this many rows.
pub const BULK_TABLE_ROWS: usize = 10_000;

/// Applies one block's delta batch to the view.
///
/// Borrowed per block; holds nothing across blocks.
pub struct Materializer<'a> {
    /// The session's view. Mutations accumulate here until the session
    /// commits.
    pub view: &'a mut WriteView,
    /// The registry built from this connection's schema announcement.
    pub registry: &'a SchemaRegistry,
    /// True during genesis bootstrap (`head == 0`). Only then may the
    /// materializer write the view out mid-table, without a fill-status
    /// update, to cap memory on the initial snapshot tables.
    pub genesis: bool,
}

impl Materializer<'_> {
    /// Decodes `bytes` and applies every row mutation the operator's
    /// filters admit, in source order. Returns the number of rows
    /// materialized.
    ///
    /// Any decode failure or unknown table aborts the whole block; the
    /// caller drops the view's pending window without committing it.
    pub fn apply(&mut self, block_num: u32, bytes: &[u8]) -> Result<usize, FillError> {
        let batch: Vec<TableDelta> = from_bytes_canonical(bytes)?;
        let mut applied = 0usize;

        for delta in &batch {
            let codec = self.registry.codec_for(&delta.name)?;
            let bulk = delta.rows.len() > BULK_TABLE_ROWS;

            for (index, row) in delta.rows.iter().enumerate() {
                if bulk && index % BULK_TABLE_ROWS == 0 {
                    tracing::info!(
                        target: "fill",
                        block = block_num,
                        table = %delta.name,
                        row = index,
                        rows = delta.rows.len(),
                        "bulk load"
                    );
                    if self.genesis {
                        self.view.commit()?;
                    }
                }

                let decoded = codec.decode_row(&row.payload)?;
                if !codec.admits(&decoded) {
                    tracing::trace!(
                        target: "fill",
                        table = %delta.name,
                        row = %decoded.summary(),
                        "row filtered"
                    );
                    continue;
                }
                tracing::trace!(
                    target: "fill",
                    table = %delta.name,
                    present = row.present,
                    row = %decoded.summary(),
                    "row"
                );
                if row.present {
                    self.view.put(decoded.key, decoded.value);
                } else {
                    self.view.erase(decoded.key);
                }
                applied += 1;
            }
        }
        Ok(applied)
    }
}
