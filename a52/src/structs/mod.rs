//! Data structures describing A/52 bitstream headers.

pub mod sync_info;
