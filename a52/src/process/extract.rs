use crate::process::CHUNK_SIZE;
use crate::process::packetize::{Chunk, Frame, Packetize};
use crate::structs::sync_info::{MAX_HEADER_SIZE, SAMPLES_PER_FRAME, SyncInfo};
use crate::utils::crc::{CRC_A52_ALG, Crc16};
use crate::utils::errors::ExtractError;
use log::{debug, error, info, trace, warn};
use std::collections::VecDeque;

/// Reassembles A/52 frames from a continuous native-order bitstream.
///
/// Frame boundaries are found by searching for the `0x0B77` sync word and
/// sizing each frame from its header. Partial frames stay buffered until the
/// next push.
///
/// # Example
///
/// ```rust,no_run
/// use a52::process::extract::Packetizer;
///
/// let mut packetizer = Packetizer::default();
///
/// let data = std::fs::read("stream.ac3")?;
/// packetizer.push_bytes(&data);
///
/// for frame in packetizer {
///     match frame {
///         Ok(frame) => println!("{} bytes at {} us", frame.data.len(), frame.pts),
///         Err(e) => eprintln!("Skipping corrupt data: {e}"),
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Packetizer {
    buffer: VecDeque<u8>,
    locked: bool,
    date: Option<Date>,
    seed_pts: Option<i64>,
    crc: Crc16,
    check_crc: bool,
    stream_info: Option<SyncInfo>,
    error_count: usize,
    frames_processed: usize,
}

/// Sample-accurate frame clock, so 44.1 kHz durations do not drift.
#[derive(Debug, Clone, Copy)]
struct Date {
    base: i64,
    samples: i64,
    rate: u32,
}

impl Date {
    fn new(base: i64, rate: u32) -> Self {
        Self {
            base,
            samples: 0,
            rate,
        }
    }

    fn pts(&self) -> i64 {
        self.base + self.samples * 1_000_000 / self.rate as i64
    }

    fn rebase(&mut self, rate: u32) {
        self.base = self.pts();
        self.samples = 0;
        self.rate = rate;
    }
}

impl Default for Packetizer {
    fn default() -> Self {
        Self {
            buffer: VecDeque::with_capacity(2 * CHUNK_SIZE),
            locked: false,
            date: None,
            seed_pts: None,
            crc: Crc16::new(&CRC_A52_ALG),
            check_crc: true,
            stream_info: None,
            error_count: 0,
            frames_processed: 0,
        }
    }
}

impl Packetizer {
    /// Adds native-order bitstream data to the internal buffer.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Enables or disables `crc2` verification (enabled by default).
    pub fn set_crc_check(&mut self, enabled: bool) {
        self.check_crc = enabled;
    }

    /// Header of the most recently emitted frame.
    pub fn stream_info(&self) -> Option<&SyncInfo> {
        self.stream_info.as_ref()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Searches for the next valid frame header and moves it to the front of
    /// the buffer.
    fn resync(&mut self) -> Result<(), ExtractError> {
        self.locked = false;

        loop {
            if self.buffer.len() < MAX_HEADER_SIZE {
                return Err(ExtractError::InsufficientData);
            }

            let search_range = self.buffer.len() - MAX_HEADER_SIZE + 1;
            let found =
                (0..search_range).find(|&i| self.buffer[i] == 0x0B && self.buffer[i + 1] == 0x77);

            let Some(offset) = found else {
                self.consume_front(search_range);
                return Err(ExtractError::InsufficientData);
            };

            if offset > 0 {
                trace!("Skipped {offset} bytes before sync");
            }
            self.consume_front(offset);

            match self.header() {
                Ok(_) => {
                    self.locked = true;
                    return Ok(());
                }
                Err(e) => {
                    trace!("Rejected sync candidate: {e}");
                    self.consume_front(1);
                }
            }
        }
    }

    fn header(&self) -> Result<SyncInfo, ExtractError> {
        if self.buffer.len() < MAX_HEADER_SIZE {
            return Err(ExtractError::InsufficientData);
        }

        let mut header = [0u8; MAX_HEADER_SIZE];
        header
            .iter_mut()
            .zip(self.buffer.iter())
            .for_each(|(dst, src)| *dst = *src);

        SyncInfo::from_bytes(&header)
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
    }

    fn track_stream_info(&mut self, info: SyncInfo) {
        if let Some(previous) = &self.stream_info {
            if previous.sample_rate() != info.sample_rate()
                || previous.channel_mode() != info.channel_mode()
                || previous.bsid != info.bsid
            {
                info!(
                    "Stream parameters changed: {} Hz {} -> {} Hz {}",
                    previous.sample_rate(),
                    previous.channel_mode(),
                    info.sample_rate(),
                    info.channel_mode()
                );
            }
        }

        self.stream_info = Some(info);
    }
}

impl Iterator for Packetizer {
    type Item = Result<Frame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.locked && self.resync().is_err() {
            return None;
        }

        let info = match self.header() {
            Ok(info) => info,
            Err(ExtractError::InsufficientData) => return None,
            Err(e) => {
                // Lost sync: the previous frame was not followed by a header
                self.locked = false;
                self.error_count += 1;
                self.consume_front(1);
                return Some(Err(e));
            }
        };

        let size = info.frame_size();
        if self.buffer.len() < size {
            return None;
        }

        if self.check_crc {
            let frame = &self.buffer.make_contiguous()[..size];
            if self.crc.checksum(&frame[2..]) != 0 {
                self.locked = false;
                self.error_count += 1;
                self.consume_front(2);
                return Some(Err(ExtractError::CrcMismatch { size }));
            }
        }

        let data: Vec<u8> = self.buffer.drain(..size).collect();
        self.track_stream_info(info);

        let rate = info.sample_rate();
        let seed_pts = &mut self.seed_pts;
        let date = self
            .date
            .get_or_insert_with(|| Date::new(seed_pts.take().unwrap_or(0), rate));
        if date.rate != rate {
            date.rebase(rate);
        }

        let pts = date.pts();
        date.samples += SAMPLES_PER_FRAME as i64;
        let duration = date.pts() - pts;

        self.frames_processed += 1;

        Some(Ok(Frame {
            data,
            pts,
            duration,
            header: false,
        }))
    }
}

impl Packetize for Packetizer {
    fn feed(&mut self, chunk: Chunk) -> Vec<Frame> {
        if chunk.discontinuity {
            debug!("Discontinuity: restarting frame clock");
            self.date = None;
            self.seed_pts = None;
        }

        if let Some(pts) = chunk.pts {
            self.date = None;
            self.seed_pts = Some(pts);
        }

        self.push_bytes(&chunk.data);

        let mut frames = Vec::new();
        for result in self.by_ref() {
            match result {
                Ok(frame) => frames.push(frame),
                Err(e @ ExtractError::CrcMismatch { .. }) => error!("Dropping frame: {e}"),
                Err(e) => warn!("Lost sync: {e}"),
            }
        }

        frames
    }
}
