use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::utils::errors::ControlError;

const UNKNOWN_SIZE: u64 = u64::MAX;

/// Demux state that control queries read, possibly from another thread.
///
/// Each field is independently atomic; the demux loop is the only writer.
#[derive(Debug)]
pub(crate) struct StreamStats {
    bitrate: AtomicI64,
    position: AtomicU64,
    size: AtomicU64,
}

impl StreamStats {
    pub(crate) fn new(size: Option<u64>) -> Self {
        Self {
            bitrate: AtomicI64::new(0),
            position: AtomicU64::new(0),
            size: AtomicU64::new(size.unwrap_or(UNKNOWN_SIZE)),
        }
    }

    pub(crate) fn set_bitrate(&self, bitrate: i64) {
        self.bitrate.store(bitrate, Ordering::Release);
    }

    pub(crate) fn bitrate(&self) -> i64 {
        self.bitrate.load(Ordering::Acquire)
    }

    pub(crate) fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Release);
    }

    pub(crate) fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    pub(crate) fn size(&self) -> Option<u64> {
        match self.size.load(Ordering::Acquire) {
            UNKNOWN_SIZE => None,
            size => Some(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Elapsed time in µs.
    Time,
    /// Total duration in µs.
    Length,
    /// Fraction of the stream consumed.
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Micros(i64),
    Fraction(f64),
}

/// Answers time queries from the bitrate estimate of a running demuxer.
///
/// Cheap to clone and `Send + Sync`; obtained from
/// [`Demuxer::control`](crate::process::demux::Demuxer::control).
#[derive(Debug, Clone)]
pub struct Control {
    stats: Arc<StreamStats>,
}

impl Control {
    pub(crate) fn new(stats: Arc<StreamStats>) -> Self {
        Self { stats }
    }

    /// Current bitrate estimate in bytes per second.
    pub fn bitrate(&self) -> Option<i64> {
        Some(self.stats.bitrate()).filter(|&bitrate| bitrate > 0)
    }

    /// Elapsed time: `1_000_000 * position / bitrate` µs.
    pub fn time(&self) -> Result<i64, ControlError> {
        let bitrate = self.bitrate().ok_or(ControlError::Unknown)?;
        Ok(bytes_to_micros(self.stats.position(), bitrate))
    }

    /// Total duration: `1_000_000 * size / bitrate` µs.
    pub fn length(&self) -> Result<i64, ControlError> {
        let bitrate = self.bitrate().ok_or(ControlError::Unknown)?;
        let size = self.stats.size().ok_or(ControlError::UnknownSize)?;
        Ok(bytes_to_micros(size, bitrate))
    }

    pub fn query(&self, query: Query) -> Result<Reply, ControlError> {
        match query {
            Query::Time => self.time().map(Reply::Micros),
            Query::Length => self.length().map(Reply::Micros),
            other => default_control(&self.stats, other),
        }
    }
}

/// Queries that do not depend on the bitrate estimate.
fn default_control(stats: &StreamStats, query: Query) -> Result<Reply, ControlError> {
    match query {
        Query::Position => {
            let size = stats
                .size()
                .filter(|&size| size > 0)
                .ok_or(ControlError::UnknownSize)?;
            Ok(Reply::Fraction(stats.position() as f64 / size as f64))
        }
        Query::Time | Query::Length => Err(ControlError::Unknown),
    }
}

fn bytes_to_micros(bytes: u64, bitrate: i64) -> i64 {
    i64::try_from(1_000_000i128 * bytes as i128 / bitrate as i128).unwrap_or(i64::MAX)
}
