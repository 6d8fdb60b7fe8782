//! Frame sync detection in either word order.
//!
//! This is a shallow filter: only the sync word and the bitstream identifier
//! are inspected. Full header validation happens in the packetizer.

use crate::process::byte_order::ByteOrder;

/// Bytes inspected by [`check_sync`].
pub const SYNC_CHECK_SIZE: usize = 6;

/// Bitstream identifiers at or above 12 (`0x60` once shifted into its byte)
/// denote bitstream revisions this demuxer does not handle.
const BSID_CEILING: u8 = 0x60;

/// A position in a buffer where a sync pattern was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCandidate {
    pub offset: usize,
    pub byte_order: ByteOrder,
}

/// Checks whether a frame sync pattern starts at the first byte of `window`.
pub fn check_sync(window: &[u8]) -> Option<ByteOrder> {
    if window.len() < SYNC_CHECK_SIZE {
        return None;
    }

    match window {
        [0x77, 0x0B, _, _, bsid, ..] if *bsid < BSID_CEILING => Some(ByteOrder::NativeLittle),
        [0x0B, 0x77, _, _, _, bsid, ..] if *bsid < BSID_CEILING => Some(ByteOrder::NativeBig),
        _ => None,
    }
}

/// Scans `buffer` at every 16-bit aligned offset in `start..end` and returns the
/// first sync found. Offsets whose window would run past `buffer` are skipped.
pub fn scan(buffer: &[u8], start: usize, end: usize) -> Option<SyncCandidate> {
    let end = end.min(buffer.len());

    (start..end).step_by(2).find_map(|offset| {
        check_sync(&buffer[offset..]).map(|byte_order| SyncCandidate { offset, byte_order })
    })
}
