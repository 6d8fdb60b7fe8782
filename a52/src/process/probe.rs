use std::fmt::{Display, Formatter};

use log::{Level, debug};

use crate::log_or_err;
use crate::process::byte_order::ByteOrder;
use crate::process::demux::DemuxOptions;
use crate::process::sync::{check_sync, scan};
use crate::source::ByteSource;
use crate::structs::sync_info::MAX_HEADER_SIZE;
use crate::utils::errors::ProbeError;

/// RIFF header: `RIFF`, 32-bit size, `WAVE`.
pub const RIFF_HEADER_SIZE: usize = 12;

/// Sub-chunk header: 4-byte tag, 32-bit little-endian length.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Envelope the elementary stream was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Bare,
    /// RIFF/WAVE; `data_offset` is where the `data` chunk payload starts.
    Wave { data_offset: u64 },
}

impl Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Bare => write!(f, "none (elementary stream)"),
            Container::Wave { data_offset } => write!(f, "RIFF/WAVE (data at {data_offset})"),
        }
    }
}

/// Whether the first frame was actually verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Verified,
    /// No sync was found, but the format was requested by name.
    Forced,
}

/// Where the elementary stream starts and how its words are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub offset: u64,
    pub byte_order: ByteOrder,
    pub container: Container,
    pub confidence: Confidence,
}

/// Locates the first frame of an A/52 stream without consuming any data.
///
/// RIFF/WAVE envelopes are unwrapped by walking their chunks up to `data`.
/// Because the payload of a `data` chunk does not always begin on a frame,
/// the first two read chunks after it are scanned for a sync word.
pub fn probe<S: ByteSource + ?Sized>(
    source: &mut S,
    options: &DemuxOptions,
) -> Result<ProbeResult, ProbeError> {
    let mut offset = 0;
    let mut container = Container::Bare;
    let mut found = None;

    let head = source.peek(RIFF_HEADER_SIZE)?;
    if head.len() == RIFF_HEADER_SIZE && &head[..4] == b"RIFF" && &head[8..12] == b"WAVE" {
        let data_offset = find_data_chunk(source, options.max_chunk_walk)?;
        debug!("RIFF/WAVE container, data chunk at {data_offset}");

        container = Container::Wave {
            data_offset: data_offset as u64,
        };
        offset = data_offset;

        let window = source.peek(data_offset + 2 * options.chunk_size)?;
        let end = window.len().saturating_sub(MAX_HEADER_SIZE);

        if let Some(candidate) = scan(window, data_offset, end) {
            if candidate.offset != data_offset {
                debug!(
                    "First sync {} bytes after the declared data start",
                    candidate.offset - data_offset
                );
            }
            offset = candidate.offset;
            found = Some(candidate.byte_order);
        }
    } else {
        let needed = 2 * MAX_HEADER_SIZE;
        let window = source.peek(needed)?;

        if window.len() < needed {
            return Err(ProbeError::InsufficientData {
                needed,
                available: window.len(),
            });
        }

        found = check_sync(window);
    }

    let (byte_order, confidence) = match found {
        Some(byte_order) => (byte_order, Confidence::Verified),
        None if options.forced => {
            log_or_err!(
                options,
                Level::Warn,
                ProbeError::ForcedOverride
            );
            (ByteOrder::default(), Confidence::Forced)
        }
        None => return Err(ProbeError::FormatNotRecognized),
    };

    debug!("A/52 stream at offset {offset}, {byte_order}");

    Ok(ProbeResult {
        offset: offset as u64,
        byte_order,
        container,
        confidence,
    })
}

/// Walks the RIFF sub-chunks and returns the offset of the `data` payload.
fn find_data_chunk<S: ByteSource + ?Sized>(
    source: &mut S,
    max_walk: usize,
) -> Result<usize, ProbeError> {
    let mut cursor = RIFF_HEADER_SIZE;

    loop {
        let needed = cursor
            .checked_add(CHUNK_HEADER_SIZE)
            .filter(|&needed| needed <= max_walk)
            .ok_or(ProbeError::ChunkWalkLimit { limit: max_walk })?;

        let window = source.peek(needed)?;
        if window.len() < needed {
            return Err(ProbeError::InsufficientData {
                needed,
                available: window.len(),
            });
        }

        let header = &window[cursor..needed];
        if &header[..4] == b"data" {
            return Ok(needed);
        }

        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        debug!(
            "Skipping RIFF chunk {:?} ({length} bytes)",
            String::from_utf8_lossy(&header[..4])
        );

        cursor = needed
            .checked_add(length as usize)
            .ok_or(ProbeError::ChunkWalkLimit { limit: max_walk })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::synth_stream;
    use crate::source::StreamSource;
    use std::io::Cursor;

    fn wave(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut body = b"WAVE".to_vec();
        for (tag, payload) in chunks {
            body.extend_from_slice(*tag);
            body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            body.extend_from_slice(payload);
        }

        let mut riff = b"RIFF".to_vec();
        riff.extend_from_slice(&(body.len() as u32).to_le_bytes());
        riff.extend_from_slice(&body);
        riff
    }

    fn probe_bytes(data: Vec<u8>, options: &DemuxOptions) -> Result<ProbeResult, ProbeError> {
        let mut source = StreamSource::from_seekable(Cursor::new(data))?;
        probe(&mut source, options)
    }

    #[test]
    fn bare_stream_at_offset_zero() -> anyhow::Result<()> {
        let result = probe_bytes(synth_stream(2), &DemuxOptions::default())?;

        assert_eq!(result.offset, 0);
        assert_eq!(result.byte_order, ByteOrder::NativeBig);
        assert_eq!(result.container, Container::Bare);
        assert_eq!(result.confidence, Confidence::Verified);
        Ok(())
    }

    #[test]
    fn bare_little_endian_stream() -> anyhow::Result<()> {
        let mut stream = synth_stream(2);
        stream.chunks_exact_mut(2).for_each(|w| w.swap(0, 1));

        let result = probe_bytes(stream, &DemuxOptions::default())?;
        assert_eq!(result.byte_order, ByteOrder::NativeLittle);
        Ok(())
    }

    #[test]
    fn data_chunk_found_after_unrelated_chunk() -> anyhow::Result<()> {
        for fmt_len in [0usize, 2, 16, 18, 40, 1001] {
            let data = wave(&[(b"fmt ", vec![0xAA; fmt_len]), (b"data", synth_stream(2))]);
            let result = probe_bytes(data, &DemuxOptions::default())?;

            let data_offset = (RIFF_HEADER_SIZE + 2 * CHUNK_HEADER_SIZE + fmt_len) as u64;
            assert_eq!(
                result.container,
                Container::Wave { data_offset },
                "fmt length {fmt_len}"
            );
            assert_eq!(result.offset, data_offset);
        }
        Ok(())
    }

    #[test]
    fn misaligned_data_region_is_corrected() -> anyhow::Result<()> {
        let mut payload = vec![0u8, 0];
        payload.extend(synth_stream(2));
        let data = wave(&[(b"fmt ", vec![0; 16]), (b"data", payload)]);

        let result = probe_bytes(data, &DemuxOptions::default())?;
        assert_eq!(result.container, Container::Wave { data_offset: 44 });
        assert_eq!(result.offset, 46);
        Ok(())
    }

    #[test]
    fn missing_data_chunk_fails() {
        let data = wave(&[(b"fmt ", vec![0; 16]), (b"LIST", vec![0; 64])]);
        assert!(matches!(
            probe_bytes(data, &DemuxOptions::default()),
            Err(ProbeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn pathological_chunk_length_is_bounded() {
        let mut data = wave(&[(b"JUNK", vec![0; 8])]);
        data[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        data.extend(vec![0; 64]);

        let options = DemuxOptions {
            max_chunk_walk: 4096,
            ..Default::default()
        };
        assert!(matches!(
            probe_bytes(data, &options),
            Err(ProbeError::ChunkWalkLimit { limit: 4096 })
        ));
    }

    #[test]
    fn short_stream_is_insufficient() {
        assert!(matches!(
            probe_bytes(vec![0x0B, 0x77, 0, 0, 0x1E, 0x40], &DemuxOptions::default()),
            Err(ProbeError::InsufficientData {
                needed: 20,
                available: 6
            })
        ));
    }

    #[test]
    fn unknown_data_is_rejected_unless_forced() -> anyhow::Result<()> {
        let noise = vec![0x42u8; 4096];
        let result = probe_bytes(noise.clone(), &DemuxOptions::default());
        assert!(matches!(result, Err(ProbeError::FormatNotRecognized)));
        assert!(result.is_err_and(|e| e.is_recoverable()));

        let forced = DemuxOptions {
            forced: true,
            ..Default::default()
        };
        let result = probe_bytes(noise.clone(), &forced)?;
        assert_eq!(result.confidence, Confidence::Forced);
        assert_eq!(result.offset, 0);

        let strict = DemuxOptions {
            forced: true,
            fail_level: Level::Warn,
            ..Default::default()
        };
        assert!(matches!(
            probe_bytes(noise, &strict),
            Err(ProbeError::ForcedOverride)
        ));
        Ok(())
    }
}
