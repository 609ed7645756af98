//! Variable-length quantities.
//!
//! Unsigned values are written in 7-bit groups, least-significant group first,
//! with the high bit of each byte set when another group follows. Signed
//! deltas are zigzag-mapped onto unsigned values first.

use bytes::BufMut;

/// Longest encoding of a `u64` (ten 7-bit groups).
pub const MAX_VLQ_LEN: usize = 10;

/// Append `value` to `buf` as a VLQ.
pub fn encode_vlq(value: u64, buf: &mut impl BufMut) {
    let mut scratch = [0u8; MAX_VLQ_LEN];
    let len = encode_vlq_into(value, &mut scratch);
    buf.put_slice(&scratch[..len]);
}

/// Encode `value` into `scratch`, returning the number of bytes used.
pub fn encode_vlq_into(mut value: u64, scratch: &mut [u8; MAX_VLQ_LEN]) -> usize {
    let mut len = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        scratch[len] = byte;
        len += 1;
        if value == 0 {
            return len;
        }
    }
}

/// Number of bytes `value` occupies once encoded.
pub fn vlq_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Zigzag-encode a signed i64 into an unsigned u64.
/// Maps: 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Zigzag-decode an unsigned u64 back to a signed i64.
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}
