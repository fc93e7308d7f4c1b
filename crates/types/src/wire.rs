// Path: crates/types/src/wire.rs

//! The state-history wire messages.
//!
//! The upstream node speaks a framed binary protocol: after the connection is
//! established it sends one schema announcement (a JSON document, handled by
//! the upstream crate), and from then on every frame is a canonical-codec
//! message. The client sends [`UpstreamRequest`] frames and receives
//! [`UpstreamReply`] frames.

use crate::block::BlockPosition;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Sentinel for an unbounded `end_block_num` in [`GetBlocksRequest`].
pub const END_BLOCK_UNBOUNDED: u32 = u32::MAX;

/// Default request-window size for the block stream.
pub const DEFAULT_MAX_MESSAGES_IN_FLIGHT: u32 = 4096;

/// A request frame sent by the filler to the upstream node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum UpstreamRequest {
    /// Ask for the upstream's chain tip information.
    GetStatus,
    /// Begin streaming block results.
    GetBlocks(GetBlocksRequest),
}

/// The body of [`UpstreamRequest::GetBlocks`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GetBlocksRequest {
    /// First block to stream.
    pub start_block_num: u32,
    /// One past the last block to stream; [`END_BLOCK_UNBOUNDED`] for an
    /// endless stream.
    pub end_block_num: u32,
    /// Upper bound on unacknowledged result messages the upstream may have
    /// in flight.
    pub max_messages_in_flight: u32,
    /// Known block positions in the client's unconfirmed range, for fork
    /// alignment. The filler always sends this empty; the upstream then
    /// streams from `start_block_num` with no prior-block continuity check.
    pub have_positions: Vec<BlockPosition>,
}

/// A reply frame received from the upstream node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum UpstreamReply {
    /// Reply to [`UpstreamRequest::GetStatus`].
    Status(StatusResult),
    /// One element of the block stream.
    Blocks(BlocksResult),
}

/// Chain tip information, sufficient to initiate streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct StatusResult {
    /// The upstream's current head.
    pub head: BlockPosition,
    /// The upstream's finality watermark.
    pub last_irreversible: BlockPosition,
    /// Identifier of the chain the upstream serves.
    pub chain_id: [u8; 32],
}

/// One block result from the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BlocksResult {
    /// The block this message carries. Absent means "no data, heartbeat
    /// only".
    pub this_block: Option<BlockPosition>,
    /// The expected parent of `this_block`.
    pub prev_block: Option<BlockPosition>,
    /// The finality watermark at the time this message was produced.
    pub last_irreversible: BlockPosition,
    /// The encoded delta batch (a canonical-codec `Vec<TableDelta>`), if the
    /// block mutated any tables.
    pub deltas: Option<Vec<u8>>,
}

/// The per-block diff of one logical table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TableDelta {
    /// Table identifier, resolved through the schema registry.
    pub name: String,
    /// Row mutations, in source order. Last write wins within a block.
    pub rows: Vec<DeltaRow>,
}

/// A single row mutation within a [`TableDelta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DeltaRow {
    /// `true` means upsert, `false` means delete.
    pub present: bool,
    /// The encoded row, including its key, under the table's codec.
    pub payload: Vec<u8>,
}

/// The row encoding understood by the default table codec: the row key and
/// the serialized row value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RowPayload {
    /// The row key, without the table prefix.
    pub key: Vec<u8>,
    /// The serialized row value.
    pub value: Vec<u8>,
}
