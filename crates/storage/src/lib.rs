// Path: crates/storage/src/lib.rs
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

//! Ordered key-value storage for the filler.
//!
//! This crate provides the `KvStore` abstraction the engine writes through
//! (point get, ordered range scan, atomic write batches, durability-controlled
//! flush), a redb-based implementation for production, an in-memory
//! implementation for tests, and the buffered `WriteView` that accumulates a
//! commit window's mutations and applies them as a single batch.

pub mod kv;
pub mod memory;
pub mod redb_store;
pub mod view;

pub use kv::{KvStore, StorageError, WriteBatch};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use view::WriteView;
