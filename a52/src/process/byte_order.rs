//! Bitstream word order and its normalization.
//!
//! A/52 is defined as a sequence of big-endian 16-bit words. Streams ripped
//! from S/PDIF captures or some WAVE files carry the words little-endian, so
//! the sync word shows up as `77 0B` instead of `0B 77`. The packetizer only
//! understands native order, so such streams are swapped word by word before
//! they reach it.

use std::fmt::{Display, Formatter};

/// Which sync pattern matched, fixed for the lifetime of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// `0B 77`: words are big-endian, no conversion needed.
    #[default]
    NativeBig,
    /// `77 0B`: words are little-endian and must be swapped.
    NativeLittle,
}

impl ByteOrder {
    pub fn needs_swap(self) -> bool {
        self == ByteOrder::NativeLittle
    }

    /// Converts `buffer` to native word order in place.
    pub fn normalize(self, buffer: &mut [u8]) {
        if self.needs_swap() {
            swap_words(buffer);
        }
    }
}

impl Display for ByteOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteOrder::NativeBig => write!(f, "big-endian words"),
            ByteOrder::NativeLittle => write!(f, "little-endian words (swapped)"),
        }
    }
}

/// Swaps every adjacent byte pair. A trailing odd byte is left untouched.
#[inline]
pub fn swap_words(buffer: &mut [u8]) {
    buffer.chunks_exact_mut(2).for_each(|word| word.swap(0, 1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_an_involution() {
        let original: Vec<u8> = (0..=255u8).collect();
        let mut buffer = original.clone();

        swap_words(&mut buffer);
        assert_eq!(&buffer[..4], &[1, 0, 3, 2]);
        assert_ne!(buffer, original);

        swap_words(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn odd_trailing_byte_untouched() {
        let mut buffer = [0x77, 0x0B, 0x01, 0x02, 0xAA];
        swap_words(&mut buffer);
        assert_eq!(buffer, [0x0B, 0x77, 0x02, 0x01, 0xAA]);
    }

    #[test]
    fn only_little_endian_streams_are_swapped() {
        let mut buffer = [0x0B, 0x77];
        ByteOrder::NativeBig.normalize(&mut buffer);
        assert_eq!(buffer, [0x0B, 0x77]);

        let mut buffer = [0x77, 0x0B];
        ByteOrder::NativeLittle.normalize(&mut buffer);
        assert_eq!(buffer, [0x0B, 0x77]);
    }
}
