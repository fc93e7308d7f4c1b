// Path: crates/types/src/fill.rs

//! The persisted fill-status record.

use crate::block::BlockId;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The singleton progress record, rewritten on every commit.
///
/// After any successful commit the persisted record reflects exactly the set
/// of block mutations durably present in the store, because it is written
/// through the same view and batch as the mutations it describes.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct FillStatus {
    /// Highest block durably applied.
    pub head: u32,
    /// Digest of `head`.
    pub head_id: BlockId,
    /// Highest block the upstream declared final at the time of the last
    /// commit, clamped so it never exceeds `head`.
    pub irreversible: u32,
    /// Digest of `irreversible`.
    pub irreversible_id: BlockId,
    /// Lowest block number ever applied since the store was initialized.
    /// Monotone non-decreasing; reset only by operator truncation.
    pub first: u32,
}

impl FillStatus {
    /// Builds the record to persist for the given in-memory session state,
    /// clamping the finality watermark.
    ///
    /// The upstream may report `irreversible > head` while we are still
    /// catching up; we never claim finality for blocks we have not stored,
    /// so the persisted watermark is clamped to `(head, head_id)` in that
    /// case.
    pub fn clamped(
        head: u32,
        head_id: BlockId,
        irreversible: u32,
        irreversible_id: BlockId,
        first: u32,
    ) -> Self {
        if irreversible < head {
            Self { head, head_id, irreversible, irreversible_id, first }
        } else {
            Self { head, head_id, irreversible: head, irreversible_id: head_id, first }
        }
    }
}
