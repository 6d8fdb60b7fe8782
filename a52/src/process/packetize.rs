/// One read from the byte source, in native word order.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub data: Vec<u8>,
    /// Timestamp (µs) the packetizer should derive its timeline from.
    pub pts: Option<i64>,
    /// The timeline restarts with this chunk. Honored once, on entry.
    pub discontinuity: bool,
}

/// A complete frame produced by a [`Packetize`] stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    /// Nominal timestamp in µs.
    pub pts: i64,
    /// Nominal duration in µs; zero when unknown.
    pub duration: i64,
    /// Codec header rather than audio payload.
    pub header: bool,
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Frame reassembly stage driven by the demux loop.
///
/// Implementations buffer partial frames between calls. They are acquired once
/// when a stream is opened and released when it is dropped.
pub trait Packetize {
    /// Consumes a chunk and returns every frame completed by it, in order.
    fn feed(&mut self, chunk: Chunk) -> Vec<Frame>;
}

impl<P: Packetize + ?Sized> Packetize for Box<P> {
    fn feed(&mut self, chunk: Chunk) -> Vec<Frame> {
        (**self).feed(chunk)
    }
}
