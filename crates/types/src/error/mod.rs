// Path: crates/types/src/error/mod.rs
//! Core error types for the statefill workspace.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Codes end up in structured log output and must never change once shipped;
/// operators alert on them.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors in the framed wire protocol's message layer.
#[derive(Debug, Error)]
pub enum WireError {
    /// A frame failed to decode under the canonical codec.
    #[error("decode error: {0}")]
    Decode(String),
    /// The upstream sent a well-formed message of the wrong kind for the
    /// current session state.
    #[error("unexpected message: expected {expected}")]
    UnexpectedMessage {
        /// The message kind the session was waiting for.
        expected: &'static str,
    },
}

impl ErrorCode for WireError {
    fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "WIRE_DECODE_FAILED",
            Self::UnexpectedMessage { .. } => "WIRE_UNEXPECTED_MESSAGE",
        }
    }
}

/// Errors in the upstream's schema announcement or its use.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema announcement document failed to parse.
    #[error("schema announcement parse error: {0}")]
    Parse(String),
    /// A delta referenced a table the announcement did not declare.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// The announcement declared the same table twice.
    #[error("duplicate table in schema: {0}")]
    DuplicateTable(String),
    /// A table carried an empty or non-hex key prefix.
    #[error("invalid key prefix for table {table}: {reason}")]
    InvalidPrefix {
        /// The offending table.
        table: String,
        /// Why the prefix was rejected.
        reason: String,
    },
    /// A table claimed the `0x00` prefix, which is reserved for the
    /// fill-status singleton.
    #[error("table {0} uses the reserved 0x00 key prefix")]
    ReservedPrefix(String),
    /// Two tables declared the same key prefix.
    #[error("tables {0} and {1} share a key prefix")]
    DuplicatePrefix(String, String),
}

impl ErrorCode for SchemaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "SCHEMA_PARSE_FAILED",
            Self::UnknownTable(_) => "SCHEMA_UNKNOWN_TABLE",
            Self::DuplicateTable(_) => "SCHEMA_DUPLICATE_TABLE",
            Self::InvalidPrefix { .. } => "SCHEMA_INVALID_PREFIX",
            Self::ReservedPrefix(_) => "SCHEMA_RESERVED_PREFIX",
            Self::DuplicatePrefix(_, _) => "SCHEMA_DUPLICATE_PREFIX",
        }
    }
}

/// Chain-consistency violations. These are never retried; they require
/// operator intervention.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The upstream delivered a block at or below our head, which would
    /// require rewinding the store.
    #[error("switch forks at block {received}: truncate not implemented (head {head})")]
    ForkBeforeHead {
        /// Height of the received block.
        received: u32,
        /// Our durably applied head.
        head: u32,
    },
    /// The received block does not extend the block we last applied.
    #[error("prev_block does not match: expected {expected}, got {got}")]
    MismatchedPrevBlock {
        /// Digest of our head, which the block should have named as parent.
        expected: String,
        /// The parent digest the block actually named, or `none`.
        got: String,
    },
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::ForkBeforeHead { .. } => "CHAIN_FORK_BEFORE_HEAD",
            Self::MismatchedPrevBlock { .. } => "CHAIN_MISMATCHED_PREV_BLOCK",
        }
    }
}

/// Errors detected while assembling the operator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No upstream endpoint was supplied.
    #[error("no upstream endpoint configured (set --connect-to)")]
    MissingEndpoint,
    /// The endpoint is not of the form `host:port`.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// A transaction filter string failed to parse.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingEndpoint => "CONFIG_MISSING_ENDPOINT",
            Self::InvalidEndpoint(_) => "CONFIG_INVALID_ENDPOINT",
            Self::InvalidFilter(_) => "CONFIG_INVALID_FILTER",
        }
    }
}
