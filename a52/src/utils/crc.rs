//! CRC validation utilities for A/52 frames.
//!
//! A/52 protects each frame with two CRC-16 words (`crc1` after the sync word,
//! `crc2` at the end of the frame). Both use the generator
//! `x^16 + x^15 + x^2 + 1` with a zero initial value, so a frame is intact when
//! the remainder over everything after the sync word is zero.

/// CRC parameters: polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-16 algorithm used by `crc1` and `crc2`.
pub const CRC_A52_ALG: Algorithm<u16> = Algorithm {
    poly: 0x8005,
    init: 0x0000,
};

/// Computes the CRC-16 of a single byte value using specified polynomial.
#[inline(always)]
pub const fn crc16(poly: u16, value: u8) -> u16 {
    let mut crc = (value as u16) << 8;

    let mut i = 0;
    while i < 8 {
        crc = (crc << 1) ^ (((crc >> 15) & 1) * poly);
        i += 1;
    }

    crc
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            let index = ((crc >> 8) as u8 ^ bytes[i]) as usize;
            crc = (crc << 8) ^ self.table[index];
            i += 1;
        }

        crc
    }

    #[inline(always)]
    pub const fn checksum(&self, bytes: &[u8]) -> u16 {
        self.update(self.init, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_check_value() {
        // CRC-16/UMTS ("BUYPASS") check value
        let crc = Crc16::new(&CRC_A52_ALG);
        assert_eq!(crc.checksum(b"123456789"), 0xFEE8);
    }

    #[test]
    fn appended_crc_leaves_zero_remainder() {
        let crc = Crc16::new(&CRC_A52_ALG);
        let mut data: Vec<u8> = (0..200u32).map(|i| (i * 31 + 7) as u8).collect();
        let sum = crc.checksum(&data);
        data.extend_from_slice(&sum.to_be_bytes());

        assert_eq!(crc.checksum(&data), 0);
    }
}
