// Path: crates/upstream/src/schema.rs

//! The schema registry, built once per connection from the upstream's
//! self-describing announcement.
//!
//! The announcement is a JSON document naming every table the stream may
//! mutate together with its key prefix in the materialized store:
//!
//! ```json
//! { "version": 1,
//!   "tables": [ { "name": "contract_row", "prefix": "01" } ] }
//! ```
//!
//! Row payloads decode as a canonical-codec [`RowPayload`]; the resulting
//! store key is `<table-prefix> || <row-key>`. Prefix `0x00` is reserved for
//! the fill-status singleton and rejected here, so table rows can never
//! collide with it.
//!
//! The operator's transaction filters are distributed to the per-table
//! codecs at build time: each codec keeps the filters naming its table and
//! answers [`TableCodec::admits`] for every decoded row, so the
//! materializer never stores a row the operator filtered out.

use serde::Deserialize;
use statefill_types::codec::from_bytes_canonical;
use statefill_types::config::TrxFilter;
use statefill_types::error::{SchemaError, WireError};
use statefill_types::wire::RowPayload;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[allow(dead_code)]
    version: u32,
    tables: Vec<TableSchema>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    name: String,
    prefix: String,
}

/// Decodes one table's rows into key/value pairs for the store, and applies
/// the operator's row filters for that table.
#[derive(Debug, Clone)]
pub struct TableCodec {
    name: String,
    prefix: Vec<u8>,
    /// The operator filters naming this table.
    filters: Vec<TrxFilter>,
    /// Admission verdict for rows no filter covers: `false` as soon as any
    /// include filter is configured (include filters whitelist).
    default_admit: bool,
}

/// A row decoded under a [`TableCodec`]: the full store key and the value
/// bytes to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// `<table-prefix> || <row-key>`.
    pub key: Vec<u8>,
    /// The serialized row value.
    pub value: Vec<u8>,
}

impl DecodedRow {
    /// A short structured description for progress and debug logging.
    pub fn summary(&self) -> String {
        format!("key={} value_len={}", hex::encode(&self.key), self.value.len())
    }
}

impl TableCodec {
    /// The table this codec decodes.
    pub fn table(&self) -> &str {
        &self.name
    }

    /// The table's key prefix in the store.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Decodes a row payload into the store key/value pair it maps to.
    pub fn decode_row(&self, payload: &[u8]) -> Result<DecodedRow, WireError> {
        let row: RowPayload = from_bytes_canonical(payload)?;
        let mut key = Vec::with_capacity(self.prefix.len() + row.key.len());
        key.extend_from_slice(&self.prefix);
        key.extend_from_slice(&row.key);
        Ok(DecodedRow { key, value: row.value })
    }

    /// Whether a decoded row should be materialized under the operator's
    /// filters.
    ///
    /// With no include filters configured, every row is admitted unless an
    /// exclude filter covers it. Once any include filter exists, rows are
    /// dropped unless an include filter for this table covers them; a
    /// matching exclude filter always wins.
    pub fn admits(&self, row: &DecodedRow) -> bool {
        let row_key = row.key.get(self.prefix.len()..).unwrap_or_default();
        let mut admitted = self.default_admit;
        for filter in &self.filters {
            if filter.matches_key(row_key) {
                if filter.include {
                    admitted = true;
                } else {
                    return false;
                }
            }
        }
        admitted
    }
}

/// Resolves table names to codecs for the lifetime of one connection.
pub struct SchemaRegistry {
    tables: HashMap<String, TableCodec>,
}

impl SchemaRegistry {
    /// Parses and validates the announcement document, distributing the
    /// operator's filters onto the tables they name.
    pub fn from_announcement(
        bytes: &[u8],
        trx_filters: Vec<TrxFilter>,
    ) -> Result<Self, SchemaError> {
        let doc: SchemaDocument =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let default_admit = !trx_filters.iter().any(|filter| filter.include);
        let mut tables: HashMap<String, TableCodec> = HashMap::with_capacity(doc.tables.len());
        let mut by_prefix: HashMap<Vec<u8>, String> = HashMap::with_capacity(doc.tables.len());

        for table in doc.tables {
            let prefix = hex::decode(&table.prefix).map_err(|e| SchemaError::InvalidPrefix {
                table: table.name.clone(),
                reason: e.to_string(),
            })?;
            if prefix.is_empty() {
                return Err(SchemaError::InvalidPrefix {
                    table: table.name,
                    reason: "empty".to_string(),
                });
            }
            if prefix.first() == Some(&0x00) {
                return Err(SchemaError::ReservedPrefix(table.name));
            }
            if let Some(holder) = by_prefix.insert(prefix.clone(), table.name.clone()) {
                return Err(SchemaError::DuplicatePrefix(holder, table.name));
            }
            let filters = trx_filters
                .iter()
                .filter(|filter| filter.applies_to(&table.name))
                .cloned()
                .collect();
            let codec = TableCodec { name: table.name.clone(), prefix, filters, default_admit };
            if tables.insert(table.name.clone(), codec).is_some() {
                return Err(SchemaError::DuplicateTable(table.name));
            }
        }

        Ok(Self { tables })
    }

    /// Resolves a table name. Unknown tables during delta application are a
    /// hard error.
    pub fn codec_for(&self, name: &str) -> Result<&TableCodec, SchemaError> {
        self.tables
            .get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Number of tables the upstream announced.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
