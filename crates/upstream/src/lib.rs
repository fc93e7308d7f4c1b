// Path: crates/upstream/src/lib.rs
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

//! The upstream side of the filler: a framed TCP transport for the
//! state-history protocol and the schema registry built from the upstream's
//! self-describing announcement.
//!
//! The transport is deliberately narrow: the session pulls frames one at a
//! time and pushes requests; there are no callbacks, so the session owns the
//! connection outright and a dropped session tears the connection down with
//! it.

pub mod schema;
pub mod transport;

pub use schema::{SchemaRegistry, TableCodec};
pub use transport::{TcpTransport, Transport, TransportError};
