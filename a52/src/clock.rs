//! Presentation clock shared by the streams of one program.
//!
//! Stream timestamps come from the packetizer in microseconds and are
//! converted to 90 kHz ticks before they are mapped onto the presentation
//! timeline. The clock is owned by whoever composes the demuxers of a program
//! and is lent to each [`Demuxer::demux`](crate::process::demux::Demuxer::demux)
//! call.

use log::debug;

/// Ticks per second on the presentation timeline.
pub const CLOCK_FREQ: i64 = 90_000;

/// Converts a packetizer timestamp (µs) to presentation ticks.
#[inline]
pub const fn micros_to_ticks(us: i64) -> i64 {
    us * 9 / 100
}

/// Converts presentation ticks back to microseconds.
#[inline]
pub const fn ticks_to_micros(ticks: i64) -> i64 {
    ticks * 100 / 9
}

#[derive(Debug, Default, Clone)]
pub struct ProgramClock {
    origin: i64,
    reference: Option<i64>,
    last: Option<i64>,
}

impl ProgramClock {
    /// Registers a stream timestamp. The first timestamp, and any timestamp
    /// flagged as a discontinuity, anchors stream time to the origin.
    pub fn manage_ref(&mut self, ts: i64, discontinuity: bool) {
        if discontinuity || self.reference.is_none() {
            debug!(
                "Clock reference set: stream {ts} -> presentation {}",
                self.origin
            );
            self.reference = Some(ts);
        }

        self.last = Some(ts);
    }

    /// Maps a stream timestamp onto the presentation timeline.
    pub fn to_presentation(&self, ts: i64) -> i64 {
        match self.reference {
            Some(reference) => self.origin + ts - reference,
            None => self.origin + ts,
        }
    }

    /// Last registered stream timestamp, if any.
    pub fn last(&self) -> Option<i64> {
        self.last
    }
}
