//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream reading, CRC validation and error types used by the
//! prober and the packetizer.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
