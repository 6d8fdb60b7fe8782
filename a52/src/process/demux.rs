use std::fmt::{Display, Formatter};
use std::sync::Arc;

use log::{Level, debug, info, trace};

use crate::clock::{ProgramClock, micros_to_ticks};
use crate::process::byte_order::ByteOrder;
use crate::process::control::{Control, StreamStats};
use crate::process::packetize::{Chunk, Frame, Packetize};
use crate::process::probe::{Confidence, ProbeResult, probe};
use crate::process::{CHUNK_SIZE, FOURCC};
use crate::source::ByteSource;
use crate::utils::errors::DemuxError;

/// Timestamp (µs) handed to the packetizer until the first frame comes out.
pub const START_PTS: i64 = 1;

/// The mux rate is expressed in units of 50 bytes per second.
pub const MUX_RATE_UNIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct DemuxOptions {
    /// Accept the stream even when no sync word is found.
    pub forced: bool,
    /// Bytes per read; also sizes the probe window after a `data` chunk.
    pub chunk_size: usize,
    /// Upper bound on how far the RIFF chunk walk may look.
    pub max_chunk_walk: usize,
    /// Conditions logged at this level or more severe become errors.
    pub fail_level: Level,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            forced: false,
            chunk_size: CHUNK_SIZE,
            max_chunk_walk: 1 << 20,
            fail_level: Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxStatus {
    Progress,
    EndOfStream,
}

/// Elementary stream description announced when the demuxer is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EsFormat {
    pub fourcc: [u8; 4],
    pub confidence: Confidence,
}

impl EsFormat {
    fn a52(confidence: Confidence) -> Self {
        Self {
            fourcc: FOURCC,
            confidence,
        }
    }
}

impl Display for EsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "audio/{}", String::from_utf8_lossy(&self.fourcc).trim_end())
    }
}

/// A frame as delivered to the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxedFrame {
    pub data: Vec<u8>,
    /// Presentation timestamp in 90 kHz ticks.
    pub pts: i64,
    /// Always equal to `pts`.
    pub dts: i64,
    /// Duration in µs, as reported by the packetizer.
    pub duration: i64,
    pub discontinuity: bool,
    pub header: bool,
}

/// Receives demuxed frames.
pub trait FrameSink {
    fn send(&mut self, frame: DemuxedFrame) -> anyhow::Result<()>;

    /// Called whenever the mux rate (units of 50 bytes/s) changes.
    fn set_mux_rate(&mut self, _rate: i64) {}
}

impl FrameSink for Vec<DemuxedFrame> {
    fn send(&mut self, frame: DemuxedFrame) -> anyhow::Result<()> {
        self.push(frame);
        Ok(())
    }
}

#[derive(Debug)]
struct DemuxState {
    is_first_frame: bool,
    byte_order: ByteOrder,
    mux_rate: i64,
    stats: Arc<StreamStats>,
}

/// Demultiplexer for raw A/52, optionally wrapped in RIFF/WAVE.
///
/// Each [`demux`](Demuxer::demux) call reads one chunk from the byte source,
/// puts it in native word order and forwards every frame the packetizer
/// completes to the sink.
///
/// # Example
///
/// ```rust,no_run
/// use a52::clock::ProgramClock;
/// use a52::process::demux::{DemuxOptions, DemuxStatus, DemuxedFrame, Demuxer};
/// use a52::process::extract::Packetizer;
/// use a52::source::StreamSource;
///
/// let file = std::fs::File::open("stream.ac3")?;
/// let source = StreamSource::from_seekable(file)?;
/// let mut demuxer = Demuxer::open(source, DemuxOptions::default(), |_| {
///     Ok(Packetizer::default())
/// })?;
///
/// let mut clock = ProgramClock::default();
/// let mut frames: Vec<DemuxedFrame> = Vec::new();
/// while demuxer.demux(&mut clock, &mut frames)? == DemuxStatus::Progress {}
///
/// println!("{} frames", frames.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Demuxer<S, P> {
    source: S,
    packetizer: P,
    probe: ProbeResult,
    format: EsFormat,
    options: DemuxOptions,
    state: DemuxState,
    frames_sent: u64,
}

impl<S: ByteSource, P: Packetize> Demuxer<S, P> {
    /// Probes `source` and, if it holds A/52, acquires a packetizer for it.
    ///
    /// On success the source is positioned at the first frame.
    pub fn open<F>(mut source: S, options: DemuxOptions, acquire: F) -> Result<Self, DemuxError>
    where
        F: FnOnce(&EsFormat) -> anyhow::Result<P>,
    {
        let probe = probe(&mut source, &options)?;
        let format = EsFormat::a52(probe.confidence);

        let packetizer =
            acquire(&format).map_err(|e| DemuxError::ReassemblyUnavailable(format!("{e:#}")))?;

        let offset = probe.offset as usize;
        let skipped = source.skip(offset)?;
        if skipped < offset {
            debug!("Stream ended {skipped} bytes into the {offset}-byte preamble");
        }

        let stats = Arc::new(StreamStats::new(source.size()));
        stats.set_position(source.tell());

        info!(
            "Opened {format} stream: {}, {}, first frame at {}",
            probe.container, probe.byte_order, probe.offset
        );

        Ok(Self {
            source,
            packetizer,
            probe,
            format,
            state: DemuxState {
                is_first_frame: true,
                byte_order: probe.byte_order,
                mux_rate: 0,
                stats,
            },
            options,
            frames_sent: 0,
        })
    }

    /// Reads one chunk and forwards the frames it completes.
    ///
    /// Returns [`DemuxStatus::EndOfStream`] once the source yields no more
    /// data. Frames still buffered in the packetizer at that point are not
    /// flushed.
    pub fn demux<K: FrameSink + ?Sized>(
        &mut self,
        clock: &mut ProgramClock,
        sink: &mut K,
    ) -> Result<DemuxStatus, DemuxError> {
        // Swapping works on 16-bit words, so reads must start on an even byte
        if self.source.tell() % 2 == 1 {
            self.source.skip(1)?;
        }

        let mut data = self.source.read(self.options.chunk_size)?;
        self.state.stats.set_position(self.source.tell());

        if data.is_empty() {
            debug!("End of stream after {} frames", self.frames_sent);
            return Ok(DemuxStatus::EndOfStream);
        }

        self.state.byte_order.normalize(&mut data);

        let starting = self.state.is_first_frame;
        let chunk = Chunk {
            data,
            pts: starting.then_some(START_PTS),
            discontinuity: starting,
        };

        for frame in self.packetizer.feed(chunk) {
            self.forward(frame, clock, sink)?;
        }

        Ok(DemuxStatus::Progress)
    }

    fn forward<K: FrameSink + ?Sized>(
        &mut self,
        frame: Frame,
        clock: &mut ProgramClock,
        sink: &mut K,
    ) -> Result<(), DemuxError> {
        let discontinuity = std::mem::replace(&mut self.state.is_first_frame, false);

        if frame.duration != 0 {
            let bitrate = frame.data.len() as i64 * 1_000_000 / frame.duration;
            self.state.stats.set_bitrate(bitrate);

            let mux_rate = bitrate / MUX_RATE_UNIT;
            if mux_rate != self.state.mux_rate {
                debug!("Mux rate now {mux_rate} ({bitrate} bytes/s)");
                self.state.mux_rate = mux_rate;
                sink.set_mux_rate(mux_rate);
            }
        }

        let ts = micros_to_ticks(frame.pts);
        clock.manage_ref(ts, discontinuity);
        let ts = clock.to_presentation(ts);

        trace!(
            "Frame {}: {} bytes, pts {ts}, duration {} us",
            self.frames_sent,
            frame.data.len(),
            frame.duration
        );
        self.frames_sent += 1;

        sink.send(DemuxedFrame {
            data: frame.data,
            pts: ts,
            dts: ts,
            duration: frame.duration,
            discontinuity,
            header: frame.header,
        })
        .map_err(DemuxError::Sink)
    }

    /// A handle answering time and length queries, usable from any thread.
    pub fn control(&self) -> Control {
        Control::new(self.state.stats.clone())
    }

    pub fn probe_result(&self) -> &ProbeResult {
        &self.probe
    }

    pub fn format(&self) -> &EsFormat {
        &self.format
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.state.byte_order
    }

    /// Bytes per second, from the last frame with a known duration.
    pub fn estimated_bitrate(&self) -> Option<i64> {
        Some(self.state.stats.bitrate()).filter(|&bitrate| bitrate > 0)
    }

    pub fn mux_rate(&self) -> i64 {
        self.state.mux_rate
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn packetizer(&self) -> &P {
        &self.packetizer
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.source.tell()
    }

    pub fn size(&self) -> Option<u64> {
        self.source.size()
    }
}

impl<S, P> Drop for Demuxer<S, P> {
    fn drop(&mut self) {
        debug!(
            "Closing A/52 demuxer after {} frames, releasing packetizer",
            self.frames_sent
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::control::Query;
    use crate::process::extract::Packetizer;
    use crate::process::testing::synth_stream;
    use crate::source::StreamSource;
    use crate::utils::errors::{ControlError, ProbeError};
    use std::collections::VecDeque;
    use std::io::Cursor;

    type Source = StreamSource<Cursor<Vec<u8>>>;

    /// Emits scripted frames, one batch per chunk, and records what it was fed.
    #[derive(Default)]
    struct Scripted {
        batches: VecDeque<Vec<Frame>>,
        fed: Vec<Chunk>,
    }

    impl Scripted {
        fn new(batches: Vec<Vec<Frame>>) -> Self {
            Self {
                batches: batches.into(),
                fed: Vec::new(),
            }
        }
    }

    impl Packetize for Scripted {
        fn feed(&mut self, chunk: Chunk) -> Vec<Frame> {
            self.fed.push(chunk);
            self.batches.pop_front().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<DemuxedFrame>,
        mux_rates: Vec<i64>,
    }

    impl FrameSink for RecordingSink {
        fn send(&mut self, frame: DemuxedFrame) -> anyhow::Result<()> {
            self.frames.push(frame);
            Ok(())
        }

        fn set_mux_rate(&mut self, rate: i64) {
            self.mux_rates.push(rate);
        }
    }

    fn frame(len: usize, pts: i64, duration: i64) -> Frame {
        Frame {
            data: vec![0; len],
            pts,
            duration,
            header: false,
        }
    }

    fn source(data: Vec<u8>) -> anyhow::Result<Source> {
        Ok(StreamSource::from_seekable(Cursor::new(data))?)
    }

    fn small_chunks() -> DemuxOptions {
        DemuxOptions {
            chunk_size: 1024,
            ..Default::default()
        }
    }

    #[test]
    fn first_frame_is_marked_once() -> anyhow::Result<()> {
        let packetizer = Scripted::new(vec![
            vec![],
            vec![frame(1792, 1, 32_000), frame(1792, 32_001, 32_000)],
            vec![frame(1792, 64_001, 32_000)],
        ]);
        let mut demuxer = Demuxer::open(source(synth_stream(2))?, small_chunks(), |_| {
            Ok(packetizer)
        })?;

        let mut clock = ProgramClock::default();
        let mut sink = RecordingSink::default();
        for _ in 0..3 {
            assert_eq!(demuxer.demux(&mut clock, &mut sink)?, DemuxStatus::Progress);
        }

        let fed: Vec<_> = demuxer
            .packetizer()
            .fed
            .iter()
            .map(|c| (c.pts, c.discontinuity))
            .collect();
        assert_eq!(
            fed,
            vec![
                (Some(START_PTS), true),
                (Some(START_PTS), true),
                (None, false)
            ]
        );

        let discontinuities: Vec<bool> = sink.frames.iter().map(|f| f.discontinuity).collect();
        assert_eq!(discontinuities, vec![true, false, false]);

        let pts: Vec<i64> = sink.frames.iter().map(|f| f.pts).collect();
        assert_eq!(pts, vec![0, 2880, 5760]);
        assert!(sink.frames.iter().all(|f| f.pts == f.dts));
        Ok(())
    }

    #[test]
    fn bitrate_follows_last_frame_with_duration() -> anyhow::Result<()> {
        let packetizer = Scripted::new(vec![
            vec![frame(1792, 1, 32_000)],
            vec![frame(700, 32_001, 0)],
            vec![frame(1000, 32_001, 10_000), frame(1000, 42_001, 10_000)],
        ]);
        let mut demuxer = Demuxer::open(source(synth_stream(2))?, small_chunks(), |_| {
            Ok(packetizer)
        })?;
        let control = demuxer.control();

        let mut clock = ProgramClock::default();
        let mut sink = RecordingSink::default();
        assert_eq!(demuxer.estimated_bitrate(), None);
        assert_eq!(control.time(), Err(ControlError::Unknown));

        demuxer.demux(&mut clock, &mut sink)?;
        assert_eq!(demuxer.estimated_bitrate(), Some(56_000));
        assert_eq!(control.time(), Ok(1024 * 1_000_000 / 56_000));

        demuxer.demux(&mut clock, &mut sink)?;
        assert_eq!(demuxer.estimated_bitrate(), Some(56_000));

        demuxer.demux(&mut clock, &mut sink)?;
        assert_eq!(demuxer.estimated_bitrate(), Some(100_000));
        assert_eq!(demuxer.mux_rate(), 2000);
        assert_eq!(sink.mux_rates, vec![1120, 2000]);

        let size = 2 * 1792;
        assert_eq!(
            control.query(Query::Length)?,
            crate::process::control::Reply::Micros(size * 1_000_000 / 100_000)
        );
        Ok(())
    }

    #[test]
    fn header_frames_pass_through_intact() -> anyhow::Result<()> {
        let header = Frame {
            data: (0..100u8).collect(),
            pts: 1,
            duration: 10_000,
            header: true,
        };
        let packetizer = Scripted::new(vec![vec![header.clone(), frame(1792, 10_001, 32_000)]]);
        let mut demuxer = Demuxer::open(source(synth_stream(2))?, small_chunks(), |_| {
            Ok(packetizer)
        })?;

        let mut clock = ProgramClock::default();
        let mut sink = RecordingSink::default();
        demuxer.demux(&mut clock, &mut sink)?;

        let flags: Vec<bool> = sink.frames.iter().map(|f| f.header).collect();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(sink.frames[0].data, header.data);
        assert_eq!(sink.frames[0].duration, 10_000);
        Ok(())
    }

    #[test]
    fn negative_duration_overwrites_estimate() -> anyhow::Result<()> {
        let packetizer = Scripted::new(vec![
            vec![frame(1000, 1, 10_000)],
            vec![frame(100, 10_001, -10_000)],
        ]);
        let mut demuxer = Demuxer::open(source(synth_stream(2))?, small_chunks(), |_| {
            Ok(packetizer)
        })?;
        let control = demuxer.control();

        let mut clock = ProgramClock::default();
        let mut sink = RecordingSink::default();
        demuxer.demux(&mut clock, &mut sink)?;
        assert_eq!(demuxer.estimated_bitrate(), Some(100_000));

        demuxer.demux(&mut clock, &mut sink)?;
        assert_eq!(demuxer.estimated_bitrate(), None);
        assert_eq!(control.time(), Err(ControlError::Unknown));
        assert_eq!(sink.mux_rates, vec![2000, -200]);
        Ok(())
    }

    #[test]
    fn little_endian_stream_end_to_end() -> anyhow::Result<()> {
        let mut stream = synth_stream(36);
        assert_eq!(stream.len(), 64_512);
        stream.chunks_exact_mut(2).for_each(|w| w.swap(0, 1));

        let mut demuxer = Demuxer::open(source(stream)?, DemuxOptions::default(), |format| {
            assert_eq!(format.fourcc, *b"a52 ");
            assert_eq!(format.confidence, Confidence::Verified);
            Ok(Packetizer::default())
        })?;
        assert_eq!(demuxer.byte_order(), ByteOrder::NativeLittle);

        let mut clock = ProgramClock::default();
        let mut frames: Vec<DemuxedFrame> = Vec::new();
        let mut reads = 0;
        while demuxer.demux(&mut clock, &mut frames)? == DemuxStatus::Progress {
            reads += 1;
        }

        assert_eq!(reads, 4);
        assert_eq!(frames.len(), 36);
        assert!(frames.iter().all(|f| f.data[..2] == [0x0B, 0x77]));
        assert!(frames[0].discontinuity);
        assert!(frames[1..].iter().all(|f| !f.discontinuity));
        assert!(frames.windows(2).all(|w| w[1].pts - w[0].pts == 2880));
        assert_eq!(demuxer.estimated_bitrate(), Some(56_000));

        assert_eq!(demuxer.control().time(), Ok(64_512 * 1_000_000 / 56_000));
        assert_eq!(
            demuxer.control().query(Query::Position)?,
            crate::process::control::Reply::Fraction(1.0)
        );
        Ok(())
    }

    #[test]
    fn odd_position_is_realigned_before_read() -> anyhow::Result<()> {
        let stream = synth_stream(2);

        // A one-byte fmt chunk puts the data payload at offset 29
        let mut riff = b"RIFF\0\0\0\0WAVEfmt \x01\0\0\0\0data".to_vec();
        riff.extend_from_slice(&(stream.len() as u32).to_le_bytes());
        riff.extend_from_slice(&stream);
        assert_eq!(riff.len() - stream.len(), 29);

        let mut demuxer = Demuxer::open(source(riff)?, small_chunks(), |_| {
            Ok(Scripted::default())
        })?;
        assert_eq!(demuxer.probe_result().offset, 29);
        assert_eq!(demuxer.position(), 29);

        let mut clock = ProgramClock::default();
        demuxer.demux(&mut clock, &mut Vec::<DemuxedFrame>::new())?;

        assert_eq!(demuxer.position(), 30 + 1024);
        assert_eq!(demuxer.packetizer().fed[0].data[..], stream[1..1025]);
        Ok(())
    }

    #[test]
    fn sink_errors_are_propagated() -> anyhow::Result<()> {
        struct Refusing;
        impl FrameSink for Refusing {
            fn send(&mut self, _frame: DemuxedFrame) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
        }

        let mut demuxer = Demuxer::open(
            source(synth_stream(4))?,
            DemuxOptions::default(),
            |_| Ok(Packetizer::default()),
        )?;

        let result = demuxer.demux(&mut ProgramClock::default(), &mut Refusing);
        assert!(matches!(result, Err(DemuxError::Sink(_))));
        Ok(())
    }

    #[test]
    fn open_failures() -> anyhow::Result<()> {
        let result = Demuxer::open(source(synth_stream(2))?, DemuxOptions::default(), |_| -> anyhow::Result<Packetizer> {
            anyhow::bail!("no decoder module")
        });
        assert!(matches!(result, Err(DemuxError::ReassemblyUnavailable(_))));

        let result = Demuxer::open(source(vec![0x55; 4096])?, DemuxOptions::default(), |_| {
            Ok(Packetizer::default())
        });
        assert!(matches!(
            result,
            Err(DemuxError::Probe(ProbeError::FormatNotRecognized))
        ));
        Ok(())
    }

    #[test]
    fn empty_after_preamble_is_end_of_stream() -> anyhow::Result<()> {
        let forced = DemuxOptions {
            forced: true,
            ..Default::default()
        };
        let mut demuxer = Demuxer::open(source(vec![0; 32])?, forced, |_| {
            Ok(Scripted::default())
        })?;
        assert_eq!(demuxer.format().confidence, Confidence::Forced);

        let mut clock = ProgramClock::default();
        let mut sink = RecordingSink::default();
        assert_eq!(demuxer.demux(&mut clock, &mut sink)?, DemuxStatus::Progress);
        assert_eq!(demuxer.demux(&mut clock, &mut sink)?, DemuxStatus::EndOfStream);
        assert!(sink.frames.is_empty());
        assert!(sink.mux_rates.is_empty());
        Ok(())
    }
}
