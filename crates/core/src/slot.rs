//! Slot-key arithmetic and data-slot derivation.
//!
//! Storage slot keys are 32-byte values interpreted as unsigned 256-bit
//! big-endian integers. All arithmetic is modular 2^256 so a key near the top
//! of the address space wraps instead of truncating. Dynamic data (array
//! payloads, long byte-strings) lives at `keccak256(head_slot)` and onward;
//! the hash here is the original Keccak, not NIST SHA-3.

use alloy::primitives::{B256, U256};
use sha3::{Digest, Keccak256};

/// Interprets a slot key as an unsigned 256-bit big-endian integer.
#[inline]
pub fn to_u256(slot: &B256) -> U256 {
    U256::from_be_bytes(slot.0)
}

/// Converts an unsigned 256-bit integer back into a slot key.
#[inline]
pub fn from_u256(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Adds `delta` to a slot key, wrapping modulo 2^256.
#[inline]
pub fn add(slot: &B256, delta: U256) -> B256 {
    from_u256(to_u256(slot).wrapping_add(delta))
}

/// Returns the slot where a head slot's dynamic data begins.
///
/// The platform places dynamic-array payloads and long byte-string payloads
/// at `keccak256(head_slot_bytes)`, continuing into consecutive slots.
pub fn data_head(slot: &B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(slot.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Maps a byte offset to its position inside a 32-byte slot.
///
/// Storage is big-endian: offset 0 is the rightmost byte of the slot, so a
/// packed field of width `w` at offset `o` occupies positions
/// `31 - o - w + 1 ..= 31 - o`.
#[inline]
pub fn byte_position(offset: u64) -> usize {
    31 - (offset % 32) as usize
}
