// Path: crates/types/src/block.rs

//! Block identity types shared across the workspace.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A 32-byte block digest, as assigned by the upstream chain.
///
/// The filler never recomputes or validates these digests; they are carried
/// opaquely and compared for equality to enforce chain continuity.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct BlockId(
    /// The raw digest bytes.
    pub [u8; 32],
);

impl BlockId {
    /// Returns true if this is the all-zero digest, the sentinel for "no
    /// block applied yet" in a fresh store.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockId({})", hex::encode(self.0))
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The identity of a block in the chain: its height and its digest.
///
/// Equality of `id` at the same `num` means "same block".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct BlockPosition {
    /// The block height.
    pub num: u32,
    /// The 32-byte block digest.
    pub id: BlockId,
}

impl BlockPosition {
    /// Convenience constructor.
    pub fn new(num: u32, id: BlockId) -> Self {
        Self { num, id }
    }
}
