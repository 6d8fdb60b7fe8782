use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use a52::structs::sync_info::SyncInfo;
use a52dmx_macros::{ToBytes, riff_chunk};

use crate::join_bytes_le;

/// `WAVE_FORMAT_DVM`, the tag players expect for A/52 frames in WAVE.
pub const WAVE_FORMAT_A52: u16 = 0x2000;

pub trait RiffChunk {
    const TAG: [u8; 4];

    fn payload(&self) -> Vec<u8>;

    fn write_chunk<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let payload = self.payload();
        writer.write_all(&Self::TAG)?;
        writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        writer.write_all(&payload)?;

        let mut written = 8 + payload.len() as u64;
        if payload.len() % 2 == 1 {
            writer.write_all(&[0])?;
            written += 1;
        }

        Ok(written)
    }
}

/// `WAVEFORMATEX` describing an A/52 payload.
#[derive(Debug, Clone, PartialEq, Eq, ToBytes)]
#[riff_chunk(b"fmt ")]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub extra_size: u16,
}

impl WaveFormat {
    pub fn from_sync_info(info: &SyncInfo) -> Self {
        Self {
            format_tag: WAVE_FORMAT_A52,
            channels: info.channels() as u16,
            sample_rate: info.sample_rate(),
            avg_bytes_per_sec: info.bitrate() / 8,
            block_align: info.frame_size() as u16,
            bits_per_sample: 0,
            extra_size: 0,
        }
    }
}

/// RIFF/WAVE writer for A/52 frames in network word order.
///
/// Sizes are written as placeholders and patched by [`finish`](Self::finish).
pub struct WAVWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    header_written: bool,
}

impl<W: Write + Seek> WAVWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            header_written: false,
        }
    }

    pub fn write_header(&mut self, format: &WaveFormat) -> io::Result<()> {
        if self.header_written {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAVE header already written",
            ));
        }

        self.riff_size_position = self.writer.stream_position()? + 4;
        self.writer
            .write_all(&join_bytes_le!(*b"RIFF", 0u32, *b"WAVE"))?;

        format.write_chunk(&mut self.writer)?;

        self.data_size_position = self.writer.stream_position()? + 4;
        self.writer.write_all(&join_bytes_le!(*b"data", 0u32))?;

        self.header_written = true;
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if !self.header_written {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAVE header must be written before frames",
            ));
        }

        self.writer.write_all(frame)?;
        self.data_written += frame.len() as u64;
        Ok(())
    }

    /// Pads the data chunk and patches the RIFF and `data` sizes.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.data_written % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        self.writer.flush()?;

        let end = self.writer.stream_position()?;
        let riff_size = clamp_u32(end - self.riff_size_position - 4);
        let data_size = clamp_u32(self.data_written);

        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        self.writer.write_all(&riff_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&data_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    #[cfg(test)]
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

fn clamp_u32(size: u64) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}
