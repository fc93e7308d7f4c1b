// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Statefill Telemetry
//!
//! Observability infrastructure for the filler. The filler's observability
//! surface is structured logging only; progress is reported through per-commit
//! log lines rather than a metrics endpoint.

/// The initialization routine for global structured logging.
pub mod init;
