//! Bitfield extraction
//!
//! Extracts signal values from a 64-bit CAN payload. Bit numbering is
//! big-endian: bit 0 is the MSB of the first transmitted byte, and the first
//! transmitted byte is the most significant byte of the payload.

use crate::signals::CanSignal;
use byteorder::{BigEndian, ByteOrder};

/// Decode a signal's engineering value from a frame payload
///
/// The extracted bits are treated as an unsigned integer and scaled with
/// `raw * factor + offset`.
pub fn decode_signal(signal: &CanSignal, payload: u64) -> f64 {
    let raw = get_bit_field(payload, signal.bit_position, signal.bit_size);
    raw as f64 * signal.factor + signal.offset
}

/// Extract `size` bits starting at `position` from `payload`
///
/// Bits beyond the end of the payload read as zero.
pub fn get_bit_field(payload: u64, position: u8, size: u8) -> u64 {
    let mut data = [0u8; 8];
    BigEndian::write_u64(&mut data, payload);
    extract_big_endian(&data, position as usize, size as usize)
}

/// Walk the field MSB first, one bit at a time
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length.min(64) {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = 7 - (bit_pos % 8);

        let bit_value = match data.get(byte_idx) {
            Some(byte) => (byte >> bit_in_byte) & 0x01,
            None => 0,
        };
        result = (result << 1) | bit_value as u64;
    }

    result
}
