// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic binary codec for wire messages and
//! persisted records.
//!
//! This module provides simple wrappers around `parity-scale-codec` (SCALE).
//! SCALE is a good fit for the state-history protocol: integers are encoded
//! little-endian, sequence lengths are compact unsigned varints, and fixed
//! 32-byte digests are encoded verbatim. By centralizing the codec logic here
//! in the base `types` crate, we ensure the request/reply messages, the delta
//! batches, and the persisted fill status all use the exact same binary
//! representation.

use crate::error::WireError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation.
///
/// Fails fast on any decoding error, including trailing bytes. Malformed
/// input from the upstream must never be partially accepted.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, WireError> {
    T::decode_all(&mut &*b).map_err(|e| WireError::Decode(format!("canonical decode failed: {e}")))
}
