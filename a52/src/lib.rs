//! Demultiplexer for raw A/52 (AC-3) audio streams.
//!
//! ## Technical Overview
//!
//! An A/52 elementary stream is a sequence of self-delimiting frames, each
//! starting with the `0x0B77` sync word. Streams show up in a few shapes:
//!
//! - Bare, in network (big-endian) word order
//! - Bare, with every 16-bit word byte-swapped
//! - Inside a RIFF/WAVE envelope, where the `data` payload does not always
//!   start on a frame boundary
//!
//! ### Data Rate Management
//!
//! The bitrate is estimated from the size and duration of the most recent
//! frame. Elapsed time and total length are derived from that estimate and
//! the byte position, so they are approximate for variable-rate streams.
//!
//! ## Quick Start
//!
//! 1. Wrap the input in a [`source::StreamSource`]
//! 2. Open a [`process::demux::Demuxer`], which probes the stream and acquires
//!    a [`process::extract::Packetizer`]
//! 3. Call [`process::demux::Demuxer::demux`] until it reports end of stream
//!
//! ```rust,no_run
//! use a52::clock::ProgramClock;
//! use a52::process::demux::{DemuxOptions, DemuxStatus, DemuxedFrame, Demuxer};
//! use a52::process::extract::Packetizer;
//! use a52::source::StreamSource;
//!
//! let source = StreamSource::from_seekable(std::fs::File::open("movie.wav")?)?;
//! let mut demuxer = Demuxer::open(source, DemuxOptions::default(), |format| {
//!     println!("Found {format}");
//!     Ok(Packetizer::default())
//! })?;
//!
//! let control = demuxer.control();
//! let mut clock = ProgramClock::default();
//! let mut frames: Vec<DemuxedFrame> = Vec::new();
//!
//! while demuxer.demux(&mut clock, &mut frames)? == DemuxStatus::Progress {
//!     if let Ok(time) = control.time() {
//!         println!("{time} us");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Presentation clock the demuxer maps frame timestamps onto.
pub mod clock;

/// Processing stages for A/52 streams.
///
/// 1. **Probing** ([`process::probe`]): Container unwrapping, sync detection
///    and word order detection.
///
/// 2. **Demuxing** ([`process::demux`]): Chunked reads, normalization and
///    timestamp derivation.
///
/// 3. **Packetizing** ([`process::extract`]): Frame reassembly with CRC
///    validation.
pub mod process;

/// Byte sources with lookahead.
pub mod source;

/// Data structures representing A/52 format components.
///
/// - **Sync Info** ([`structs::sync_info`]): Frame header fields
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC Validation** ([`utils::crc`]): Error detection
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
