//! Zig-zag variable-length coding of signed 32-bit deltas.
//!
//! Zig-zag maps small magnitudes of either sign to small unsigned codes
//! (0 to 0, -1 to 1, 1 to 2, and so on), which then serialize as 7 bits per
//! byte with the high bit as a continuation flag. Expression deltas cluster
//! near zero, so most land in a single byte.

use anyhow::Result;

/// Append the varint encoding of `value` to `out`.
pub fn encode(value: i32, out: &mut Vec<u8>) {
    // Arithmetic shift on the sign term.
    let mut zigzag = ((value << 1) ^ (value >> 31)) as u32;
    while zigzag >= 0x80 {
        out.push((zigzag as u8) | 0x80);
        zigzag >>= 7;
    }
    out.push(zigzag as u8);
}

/// Decode one varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Fails on truncated
/// input and on encodings longer than five bytes (which would overflow 32
/// bits).
pub fn decode(bytes: &[u8]) -> Result<(i32, usize)> {
    let mut zigzag = 0u32;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let Some(&byte) = bytes.get(consumed) else {
            anyhow::bail!("truncated varint: input ended after {} bytes", consumed);
        };
        consumed += 1;
        zigzag |= ((byte & 0x7F) as u32) << shift;
        if byte < 0x80 {
            break;
        }
        shift += 7;
        if shift >= 32 {
            anyhow::bail!("varint overflow: more than 5 bytes");
        }
    }

    let value = ((zigzag >> 1) as i32) ^ -((zigzag & 1) as i32);
    Ok((value, consumed))
}
