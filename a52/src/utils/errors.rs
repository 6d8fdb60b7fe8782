#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("No A/52 sync found in either container or bare mode")]
    FormatNotRecognized,

    #[error("Stream too short to probe: needed {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("This doesn't look like an A/52 stream, continuing anyway")]
    ForcedOverride,

    #[error("RIFF chunk walk exceeded {limit} bytes without finding a data chunk")]
    ChunkWalkLimit { limit: usize },

    #[error("I/O error while probing: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Whether the host should try another demultiplexer rather than give up.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProbeError::Io(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Cannot acquire A/52 packetizer: {0}")]
    ReassemblyUnavailable(String),

    #[error("Failed to read from byte source: {0}")]
    Read(#[from] std::io::Error),

    #[error("Output sink rejected frame: {0}")]
    Sink(anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,

    #[error("Invalid sync word: {0:#06X}")]
    InvalidSyncWord(u16),

    #[error("Invalid sync info: fscod = {fscod}, frmsizecod = {frmsizecod}")]
    InvalidSyncInfo { fscod: u8, frmsizecod: u8 },

    #[error("Unsupported bitstream identifier: bsid = {0}")]
    UnsupportedBsid(u8),

    #[error("CRC check failed for {size}-byte frame")]
    CrcMismatch { size: usize },

    #[error("Failed to read header bits: {0}")]
    Bitstream(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ControlError {
    #[error("No bitrate estimate available yet")]
    Unknown,

    #[error("Stream size is not known")]
    UnknownSize,
}
