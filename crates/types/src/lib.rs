// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Statefill Types
//!
//! This crate is the foundational library for the statefill workspace,
//! containing the data structures shared by every other crate: block
//! positions, the state-history wire messages, the persisted fill status,
//! operator configuration, and the error taxonomy.
//!
//! ## Architectural Role
//!
//! As the base crate, `statefill-types` has minimal dependencies and is itself
//! a dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `BlockPosition`, `FillStatus`, and the error enums.

/// Block identity: 32-byte digests and `(block_num, block_id)` positions.
pub mod block;
/// The canonical, deterministic binary codec for wire and persisted records.
pub mod codec;
/// Operator configuration structures and transaction filters.
pub mod config;
/// A unified set of the error types used across the workspace.
pub mod error;
/// The persisted fill-status record that makes restart deterministic.
pub mod fill;
/// The state-history wire messages exchanged with the upstream node.
pub mod wire;

pub use block::{BlockId, BlockPosition};
pub use fill::FillStatus;
