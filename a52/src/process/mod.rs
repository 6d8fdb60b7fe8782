/// Word order detection result and normalization.
pub mod byte_order;

/// Shallow frame sync detection used while probing.
pub mod sync;

/// Container detection and location of the first frame.
///
/// Provides [`probe`](probe::probe), which unwraps RIFF/WAVE envelopes and
/// determines the [`ByteOrder`](byte_order::ByteOrder) of the stream.
pub mod probe;

/// The reassembly stage contract: [`Packetize`](packetize::Packetize),
/// [`Chunk`](packetize::Chunk) and [`Frame`](packetize::Frame).
pub mod packetize;

/// Reference A/52 packetizer.
///
/// Provides the [`Packetizer`](extract::Packetizer), which reassembles
/// frames from arbitrary chunks using sync pattern detection.
pub mod extract;

/// The read/normalize/feed loop and timestamp derivation.
pub mod demux;

/// Elapsed time and duration queries.
pub mod control;

/// Size of one read from the byte source.
pub const CHUNK_SIZE: usize = 16384;

/// Codec identifier announced for the elementary stream.
pub const FOURCC: [u8; 4] = *b"a52 ";
