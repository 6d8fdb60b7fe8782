use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use a52::process::control::Control;
use a52::process::demux::EsFormat;
use a52::process::probe::{Confidence, Container, ProbeResult};
use a52::structs::sync_info::SyncInfo;
use anyhow::{Context, Result};
use serde::Serialize;

use super::output::FrameStats;
use crate::timestamp::time_str;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub version: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub probe: ProbeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamReport>,
    pub statistics: Statistics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub codec: String,
    pub container: ContainerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_offset: Option<u64>,
    pub offset: u64,
    pub byte_order: String,
    pub forced: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Bare,
    Wave,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamReport {
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub channels: u8,
    pub channel_mode: String,
    pub bsid: u8,
    pub bsmod: u8,
    pub frame_size: usize,
    pub frame_duration_us: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub frames: u64,
    pub bytes: u64,
    pub crc_errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_bitrate: Option<i64>,
    pub mux_rate: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

impl ProbeReport {
    pub fn new(probe: &ProbeResult, format: &EsFormat) -> Self {
        let (container, data_offset) = match probe.container {
            Container::Bare => (ContainerKind::Bare, None),
            Container::Wave { data_offset } => (ContainerKind::Wave, Some(data_offset)),
        };

        Self {
            codec: String::from_utf8_lossy(&format.fourcc).trim_end().to_string(),
            container,
            data_offset,
            offset: probe.offset,
            byte_order: probe.byte_order.to_string(),
            forced: probe.confidence == Confidence::Forced,
        }
    }
}

impl From<&SyncInfo> for StreamReport {
    fn from(info: &SyncInfo) -> Self {
        Self {
            sample_rate: info.sample_rate(),
            bitrate_kbps: info.bitrate() / 1000,
            channels: info.channels(),
            channel_mode: info.channel_mode().to_string(),
            bsid: info.bsid,
            bsmod: info.bsmod,
            frame_size: info.frame_size(),
            frame_duration_us: info.duration_us(),
        }
    }
}

impl Statistics {
    pub fn new(stats: &FrameStats, crc_errors: usize, control: &Control) -> Self {
        Self {
            frames: stats.frames,
            bytes: stats.bytes,
            crc_errors,
            estimated_bitrate: control.bitrate(),
            mux_rate: stats.mux_rate,
            duration: stats.span_us().map(time_str),
            length: control.length().ok().map(time_str),
        }
    }
}

pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_yaml_ng::to_writer(BufWriter::new(file), report)?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
