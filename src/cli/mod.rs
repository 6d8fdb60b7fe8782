use std::path::Path;

use a52::process::demux::{DemuxOptions, Demuxer};
use a52::process::extract::Packetizer;
use a52::utils::errors::DemuxError;
use anyhow::Result;
use log::Level;

use crate::input::{InputSource, open_input};

pub mod command;
pub mod demux;
pub mod info;

pub type StreamDemuxer = Demuxer<InputSource, Packetizer>;

/// Opens `input_path` and probes it with the reference packetizer attached.
pub fn open_demuxer(
    input_path: &Path,
    forced: bool,
    fail_level: Level,
    check_crc: bool,
) -> Result<StreamDemuxer> {
    let source = open_input(input_path)?;
    let options = DemuxOptions {
        forced,
        fail_level,
        ..Default::default()
    };

    let demuxer = Demuxer::open(source, options, |format| {
        log::debug!("Acquiring packetizer for {format}");
        let mut packetizer = Packetizer::default();
        packetizer.set_crc_check(check_crc);
        Ok(packetizer)
    });

    match demuxer {
        Ok(demuxer) => Ok(demuxer),
        Err(DemuxError::Probe(e)) if e.is_recoverable() && !forced => Err(anyhow::anyhow!(
            "{}: {e} (use --force to demux anyway)",
            input_path.display()
        )),
        Err(e) => Err(e.into()),
    }
}
