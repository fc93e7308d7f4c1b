// Path: crates/engine/src/lib.rs
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

//! The fill engine.
//!
//! A [`Supervisor`](supervisor::Supervisor) owns at most one live
//! [`Session`](session::Session) at a time. The session drives the upstream
//! protocol (schema, status, block stream), materializes each block's table
//! deltas into a buffered write view, and commits the view together with the
//! fill-status record so that the persisted prefix of the chain is always a
//! valid chain ending at a known `(head, head_id)`.
//!
//! Everything here runs on one task: a block is applied to completion between
//! two transport reads, so an observable store state is always at a block
//! boundary.

pub mod deltas;
pub mod error;
pub mod session;
pub mod status;
pub mod supervisor;

pub use error::{ErrorKind, FillError};
pub use session::Session;
pub use supervisor::Supervisor;
