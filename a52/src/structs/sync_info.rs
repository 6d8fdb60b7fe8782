//! A/52 synchronization information and bitstream information header.
//!
//! Every frame starts with `syncinfo()` (sync word, `crc1`, `fscod`,
//! `frmsizecod`) followed by the leading fields of `bsi()`. Only the fields
//! needed to size, time and describe a frame are parsed here.

use std::fmt::{Display, Formatter};

use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::ExtractError;

/// Frame sync word in native (big-endian word) order.
pub const SYNC_WORD: u16 = 0x0B77;

/// Bytes needed to parse the header of any frame.
pub const MAX_HEADER_SIZE: usize = 10;

/// Every A/52 frame carries six audio blocks of 256 samples.
pub const SAMPLES_PER_FRAME: u32 = 1536;

/// Highest bitstream identifier still decodable (with sample-rate halving for 9-11).
pub const MAX_BSID: u8 = 11;

const SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];

const BITRATES_KBPS: [u32; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

const ACMOD_CHANNELS: [u8; 8] = [2, 1, 2, 3, 3, 4, 4, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInfo {
    pub crc1: u16,
    pub fscod: u8,
    pub frmsizecod: u8,
    pub bsid: u8,
    pub bsmod: u8,
    pub acmod: u8,
    pub lfeon: bool,
}

impl SyncInfo {
    /// Parses the frame header at the start of `buffer`, which must be in
    /// native word order.
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, ExtractError> {
        let reader = &mut BsIoSliceReader::from_slice(buffer);

        let sync_word: u16 = reader.get_n(16)?;
        if sync_word != SYNC_WORD {
            return Err(ExtractError::InvalidSyncWord(sync_word));
        }

        let crc1: u16 = reader.get_n(16)?;
        let fscod: u8 = reader.get_n(2)?;
        let frmsizecod: u8 = reader.get_n(6)?;

        if fscod as usize >= SAMPLE_RATES.len() || frmsizecod as usize >= BITRATES_KBPS.len() * 2 {
            return Err(ExtractError::InvalidSyncInfo { fscod, frmsizecod });
        }

        let bsid: u8 = reader.get_n(5)?;
        if bsid > MAX_BSID {
            return Err(ExtractError::UnsupportedBsid(bsid));
        }

        let bsmod: u8 = reader.get_n(3)?;
        let acmod: u8 = reader.get_n(3)?;

        // cmixlev, surmixlev, dsurmod
        if acmod & 1 != 0 && acmod != 1 {
            reader.skip_n(2)?;
        }
        if acmod & 4 != 0 {
            reader.skip_n(2)?;
        }
        if acmod == 2 {
            reader.skip_n(2)?;
        }

        let lfeon = reader.get()?;

        let info = Self {
            crc1,
            fscod,
            frmsizecod,
            bsid,
            bsmod,
            acmod,
            lfeon,
        };

        trace!(
            "A/52 header: {} Hz, {} kbps, {}, bsid {}, {} bytes",
            info.sample_rate(),
            info.bitrate() / 1000,
            info.channel_mode(),
            info.bsid,
            info.frame_size()
        );

        Ok(info)
    }

    /// Shift applied to the sample rate and bitrate of reduced-rate streams.
    fn half_rate(&self) -> u32 {
        self.bsid.saturating_sub(8) as u32
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATES[self.fscod as usize] >> self.half_rate()
    }

    /// Nominal bitrate in bits per second.
    pub fn bitrate(&self) -> u32 {
        (BITRATES_KBPS[(self.frmsizecod >> 1) as usize] * 1000) >> self.half_rate()
    }

    /// Frame size in bytes, including the sync word and `crc2`.
    pub fn frame_size(&self) -> usize {
        let kbps = BITRATES_KBPS[(self.frmsizecod >> 1) as usize];
        let words = match self.fscod {
            0 => kbps * 2,
            1 => kbps * 320 / 147 + (self.frmsizecod & 1) as u32,
            _ => kbps * 3,
        };

        words as usize * 2
    }

    pub fn channels(&self) -> u8 {
        ACMOD_CHANNELS[self.acmod as usize] + self.lfeon as u8
    }

    pub fn channel_mode(&self) -> ChannelMode {
        ChannelMode {
            acmod: self.acmod,
            lfeon: self.lfeon,
        }
    }

    /// Frame duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        SAMPLES_PER_FRAME as i64 * 1_000_000 / self.sample_rate() as i64
    }
}

/// Audio coding mode plus LFE presence, displayed as e.g. `3/2.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMode {
    pub acmod: u8,
    pub lfeon: bool,
}

impl Display for ChannelMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mode = match self.acmod {
            0 => "1+1",
            1 => "1/0",
            2 => "2/0",
            3 => "3/0",
            4 => "2/1",
            5 => "3/1",
            6 => "2/2",
            _ => "3/2",
        };

        write!(f, "{mode}{}", if self.lfeon { ".1" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_5_1_header() -> anyhow::Result<()> {
        // 48 kHz, 448 kbps, bsid 8, acmod 7 (3/2), cmixlev, surmixlev, lfeon
        let header = [0x0B, 0x77, 0x12, 0x34, 0x1E, 0x40, 0xE1, 0x00, 0x00, 0x00];
        let info = SyncInfo::from_bytes(&header)?;

        assert_eq!(info.crc1, 0x1234);
        assert_eq!(info.sample_rate(), 48000);
        assert_eq!(info.bitrate(), 448_000);
        assert_eq!(info.frame_size(), 1792);
        assert_eq!(info.acmod, 7);
        assert!(info.lfeon);
        assert_eq!(info.channels(), 6);
        assert_eq!(format!("{}", info.channel_mode()), "3/2.1");
        assert_eq!(info.duration_us(), 32_000);
        Ok(())
    }

    #[test]
    fn frame_sizes_follow_sample_rate() -> anyhow::Result<()> {
        // 44.1 kHz, 32 kbps, odd frmsizecod gets the padding word
        let info = SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0x41, 0x40, 0x40, 0, 0, 0])?;
        assert_eq!(info.sample_rate(), 44100);
        assert_eq!(info.frame_size(), 140);

        // 32 kHz, 640 kbps
        let info = SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0xA4, 0x40, 0x40, 0, 0, 0])?;
        assert_eq!(info.sample_rate(), 32000);
        assert_eq!(info.frame_size(), 3840);
        Ok(())
    }

    #[test]
    fn reduced_rate_bsid_halves_sample_rate() -> anyhow::Result<()> {
        let info = SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0x00, 0x48, 0x40, 0, 0, 0])?;
        assert_eq!(info.bsid, 9);
        assert_eq!(info.sample_rate(), 24000);
        assert_eq!(info.bitrate(), 16_000);
        assert_eq!(info.frame_size(), 128);
        Ok(())
    }

    #[test]
    fn rejects_invalid_headers() {
        assert!(matches!(
            SyncInfo::from_bytes(&[0x77, 0x0B, 0, 0, 0, 0x40, 0, 0, 0, 0]),
            Err(ExtractError::InvalidSyncWord(0x770B))
        ));
        assert!(matches!(
            SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0xC0, 0x40, 0, 0, 0, 0]),
            Err(ExtractError::InvalidSyncInfo { fscod: 3, .. })
        ));
        assert!(matches!(
            SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0x26, 0x40, 0, 0, 0, 0]),
            Err(ExtractError::InvalidSyncInfo { frmsizecod: 38, .. })
        ));
        assert!(matches!(
            SyncInfo::from_bytes(&[0x0B, 0x77, 0, 0, 0x00, 0x60, 0, 0, 0, 0]),
            Err(ExtractError::UnsupportedBsid(12))
        ));
    }
}
