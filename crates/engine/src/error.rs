// Path: crates/engine/src/error.rs

//! The engine's error taxonomy.
//!
//! Every failure inside a session is tagged transient or fatal, and the
//! supervisor decides from the tag alone: transient errors schedule a
//! reconnect, fatal errors stop the process for the operator.

use statefill_storage::StorageError;
use statefill_types::error::{ChainError, ConfigError, ErrorCode, SchemaError, WireError};
use statefill_upstream::TransportError;
use thiserror::Error;

/// Whether a failure warrants a reconnect or operator intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Close the session and retry after the reconnect delay.
    Transient,
    /// Stop the process; retrying cannot help.
    Fatal,
}

/// Any error that can end a fill session.
#[derive(Debug, Error)]
pub enum FillError {
    /// The connection to the upstream failed. Transient.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    /// The upstream violated the message protocol. Fatal.
    #[error("wire: {0}")]
    Wire(#[from] WireError),
    /// The schema announcement was unusable, or a delta referenced an
    /// unannounced table. Fatal.
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),
    /// The stream broke chain continuity. Fatal.
    #[error("chain: {0}")]
    Chain(#[from] ChainError),
    /// The store failed. Fatal: a silent retry could hide data loss.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    /// The configuration handed to the supervisor was invalid. Fatal.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl FillError {
    /// Classifies this error for the supervisor.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transient,
            Self::Wire(_)
            | Self::Schema(_)
            | Self::Chain(_)
            | Self::Storage(_)
            | Self::Config(_) => ErrorKind::Fatal,
        }
    }

    /// True when the supervisor should reconnect.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl ErrorCode for FillError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "FILL_TRANSPORT",
            Self::Wire(e) => e.code(),
            Self::Schema(e) => e.code(),
            Self::Chain(e) => e.code(),
            Self::Storage(_) => "FILL_STORAGE",
            Self::Config(e) => e.code(),
        }
    }
}
