// Path: crates/engine/src/status.rs

//! Persistence of the fill-status singleton.
//!
//! The record lives under a fixed key in the reserved `0x00` prefix and is
//! always written through the session's view, so it commits in the same batch
//! as the block mutations it describes.

use crate::error::FillError;
use statefill_storage::WriteView;
use statefill_types::codec::{from_bytes_canonical, to_bytes_canonical};
use statefill_types::FillStatus;

/// The fixed key of the fill-status singleton.
pub const FILL_STATUS_KEY: &[u8] = b"\x00fill.status";

/// Reads the persisted fill status, if the store has ever committed one.
pub fn load(view: &WriteView) -> Result<Option<FillStatus>, FillError> {
    match view.get(FILL_STATUS_KEY)? {
        Some(bytes) => Ok(Some(from_bytes_canonical(&bytes)?)),
        None => Ok(None),
    }
}

/// Queues the fill status into the view's pending batch.
pub fn write(view: &mut WriteView, status: &FillStatus) {
    view.put(FILL_STATUS_KEY.to_vec(), to_bytes_canonical(status));
}
