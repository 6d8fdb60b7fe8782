use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use a52::process::demux::{DemuxedFrame, FrameSink};
use a52::structs::sync_info::{MAX_HEADER_SIZE, SyncInfo};
use anyhow::{Context, Result};

use crate::cli::command::OutputFormat;
use crate::wav::{WAVWriter, WaveFormat};

pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(existing_ext) if existing_ext == expected_ext => base_path.to_path_buf(),
        Some(_) => {
            let mut name = base_path.file_name().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(expected_ext);
            base_path.with_file_name(name)
        }
        None => base_path.with_extension(expected_ext),
    }
}

/// Output path used when none is given: next to the input, never on top of it.
pub fn default_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let path = input_path.with_extension(format.extension());
    if path == input_path {
        input_path.with_extension(format!("demux.{}", format.extension()))
    } else {
        path
    }
}

pub enum FrameWriter {
    Raw(BufWriter<File>),
    Wav(WAVWriter<File>),
}

impl FrameWriter {
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

        Ok(match format {
            OutputFormat::Raw => FrameWriter::Raw(BufWriter::new(file)),
            OutputFormat::Wav => FrameWriter::Wav(WAVWriter::new(file)),
        })
    }

    /// Writes one frame. The WAVE header is derived from the first frame.
    pub fn write_frame(&mut self, frame: &DemuxedFrame, first: bool) -> Result<()> {
        match self {
            FrameWriter::Raw(w) => w.write_all(&frame.data)?,
            FrameWriter::Wav(w) => {
                if first {
                    let header = frame
                        .data
                        .get(..MAX_HEADER_SIZE)
                        .context("First frame is too short to carry a header")?;
                    let info = SyncInfo::from_bytes(header)?;
                    w.write_header(&WaveFormat::from_sync_info(&info))?;
                }
                w.write_frame(&frame.data)?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        match self {
            FrameWriter::Raw(mut w) => w.flush()?,
            FrameWriter::Wav(mut w) => {
                w.finish()?;
                log::debug!("WAVE data chunk holds {} bytes", w.data_written());
            }
        }
        Ok(())
    }
}

/// Running totals over the frames a demuxer delivered.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    pub frames: u64,
    pub bytes: u64,
    pub discontinuities: u64,
    pub first_pts: Option<i64>,
    pub last_pts: Option<i64>,
    pub last_duration: i64,
    pub mux_rate: i64,
}

impl FrameStats {
    pub fn record(&mut self, frame: &DemuxedFrame) {
        self.frames += 1;
        self.bytes += frame.data.len() as u64;
        if frame.discontinuity {
            self.discontinuities += 1;
        }

        self.first_pts.get_or_insert(frame.pts);
        self.last_pts = Some(frame.pts);
        self.last_duration = frame.duration;
    }

    /// Presentation span covered by the frames, in µs.
    pub fn span_us(&self) -> Option<i64> {
        let (first, last) = self.first_pts.zip(self.last_pts)?;
        Some(a52::clock::ticks_to_micros(last - first) + self.last_duration)
    }
}

impl FrameSink for FrameStats {
    fn send(&mut self, frame: DemuxedFrame) -> Result<()> {
        self.record(&frame);
        Ok(())
    }

    fn set_mux_rate(&mut self, rate: i64) {
        self.mux_rate = rate;
    }
}
