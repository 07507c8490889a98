//! Fixed-size bit array with multi-bit reads and writes.
//!
//! Backing storage is packed `u64` words; bit `p` lives in word `p / 64` at
//! in-word position `p % 64`, least-significant bit first. The serialized
//! form is the logical size as a `u32` (little-endian) followed by every word
//! as a `u64` (little-endian); the reader recomputes the word count from the
//! size.

use anyhow::{Context, Result};
use std::io::{Read, Write};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitArray {
    words: Vec<u64>,
    size: u32,
}

impl BitArray {
    /// Create a zeroed bit array holding `size` bits.
    pub fn new(size: u32) -> Self {
        let num_words = (size as usize + 63) / 64;
        Self {
            words: vec![0; num_words],
            size,
        }
    }

    /// Logical number of bits.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Set the bit at `pos`. Out-of-range positions are ignored.
    pub fn set(&mut self, pos: u32) {
        if pos >= self.size {
            return;
        }
        self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }

    /// Read the bit at `pos`. Out-of-range positions read as false.
    pub fn get(&self, pos: u32) -> bool {
        if pos >= self.size {
            return false;
        }
        (self.words[(pos / 64) as usize] >> (pos % 64)) & 1 != 0
    }

    /// Write the low `count` bits of `value` starting at `pos`, LSB first.
    ///
    /// `count` must be at most 64. Bits that would land beyond the logical
    /// size are dropped, so no stray bit past `size` is ever stored and the
    /// serialized words stay canonical.
    pub fn write_bits(&mut self, pos: u32, value: u64, count: u32) {
        debug_assert!(count <= 64);
        if count == 0 || pos >= self.size {
            return;
        }
        let count = count.min(64).min(self.size - pos);
        let value = if count == 64 {
            value
        } else {
            value & ((1u64 << count) - 1)
        };

        let word = (pos / 64) as usize;
        let bit = pos % 64;
        self.words[word] |= value << bit;
        // Spill into the next word when the run crosses a word boundary.
        if bit + count > 64 {
            self.words[word + 1] |= value >> (64 - bit);
        }
    }

    /// Read `count` bits starting at `pos`, LSB first. Bits beyond the
    /// logical size read as zero.
    pub fn read_bits(&self, pos: u32, count: u32) -> u64 {
        debug_assert!(count <= 64);
        if count == 0 || pos >= self.size {
            return 0;
        }
        let count = count.min(64).min(self.size - pos);

        let word = (pos / 64) as usize;
        let bit = pos % 64;
        let mut value = self.words[word] >> bit;
        if bit + count > 64 {
            value |= self.words[word + 1] << (64 - bit);
        }
        if count == 64 {
            value
        } else {
            value & ((1u64 << count) - 1)
        }
    }

    /// Serialize as `size: u32 LE` followed by the packed words, LE.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.size.to_le_bytes())?;
        for &word in &self.words {
            writer.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }

    /// Deserialize a bit array written by [`BitArray::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf4 = [0u8; 4];
        reader
            .read_exact(&mut buf4)
            .context("bit array truncated: missing size")?;
        let size = u32::from_le_bytes(buf4);

        let num_words = (size as usize + 63) / 64;
        let mut words = Vec::with_capacity(num_words);
        let mut buf8 = [0u8; 8];
        for _ in 0..num_words {
            reader
                .read_exact(&mut buf8)
                .context("bit array truncated: missing words")?;
            words.push(u64::from_le_bytes(buf8));
        }

        Ok(Self { words, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut bits = BitArray::new(130);
        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(129);
        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert!(!bits.get(128));
    }

    #[test]
    fn test_out_of_range_is_silent() {
        let mut bits = BitArray::new(8);
        bits.set(8);
        bits.set(1000);
        assert!(!bits.get(8));
        assert!(!bits.get(1000));
        assert_eq!(bits.read_bits(8, 4), 0);
    }

    #[test]
    fn test_write_read_bits_within_word() {
        let mut bits = BitArray::new(64);
        bits.write_bits(3, 0b1011, 4);
        assert_eq!(bits.read_bits(3, 4), 0b1011);
        assert!(!bits.get(2));
        assert!(bits.get(3));
        assert!(!bits.get(5));
        assert!(bits.get(6));
    }

    #[test]
    fn test_write_read_bits_across_word_boundary() {
        let mut bits = BitArray::new(128);
        bits.write_bits(60, 0xABCD, 16);
        assert_eq!(bits.read_bits(60, 16), 0xABCD);
        // Matches bit-by-bit semantics.
        let mut reference = BitArray::new(128);
        for i in 0..16 {
            if (0xABCDu64 >> i) & 1 != 0 {
                reference.set(60 + i);
            }
        }
        assert_eq!(bits, reference);
    }

    #[test]
    fn test_write_bits_masks_high_bits() {
        let mut bits = BitArray::new(64);
        bits.write_bits(0, u64::MAX, 3);
        assert_eq!(bits.read_bits(0, 8), 0b111);
    }

    #[test]
    fn test_write_bits_clamped_at_size() {
        let mut bits = BitArray::new(10);
        bits.write_bits(8, 0b1111, 4);
        // Only bits 8 and 9 exist.
        assert_eq!(bits.read_bits(8, 2), 0b11);
        assert_eq!(bits.words[0] >> 10, 0);
    }

    #[test]
    fn test_full_word_write() {
        let mut bits = BitArray::new(192);
        bits.write_bits(64, u64::MAX, 64);
        assert_eq!(bits.read_bits(64, 64), u64::MAX);
        assert_eq!(bits.read_bits(0, 64), 0);
        assert_eq!(bits.read_bits(128, 64), 0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut bits = BitArray::new(100);
        bits.set(0);
        bits.set(50);
        bits.set(99);
        let mut buf = Vec::new();
        bits.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 2 * 8);

        let decoded = BitArray::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn test_read_from_truncated() {
        let mut bits = BitArray::new(100);
        bits.set(99);
        let mut buf = Vec::new();
        bits.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(BitArray::read_from(&mut buf.as_slice()).is_err());
    }
}
