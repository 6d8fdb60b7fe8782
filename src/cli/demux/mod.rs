use std::sync::mpsc;
use std::thread;

use a52::clock::ProgramClock;
use a52::process::control::Control;
use a52::process::demux::{DemuxStatus, DemuxedFrame, EsFormat, FrameSink};
use a52::process::probe::ProbeResult;
use a52::structs::sync_info::SyncInfo;
use anyhow::{Result, anyhow};
use indicatif::MultiProgress;

use super::command::{Cli, DemuxArgs};
use super::open_demuxer;
use crate::input::is_pipe;
use output::{FrameStats, FrameWriter, create_path_with_extension, default_output_path};
use progress::{create_progress_bar, update_progress};
use report::{ProbeReport, Report, Statistics, StreamReport, write_report};

pub mod output;
pub mod progress;
pub mod report;

/// What the demux thread reports back to the writer.
enum Message {
    Opened {
        probe: ProbeResult,
        format: EsFormat,
        size: Option<u64>,
        control: Control,
    },
    MuxRate(i64),
    Frame(DemuxedFrame),
    Progress(u64),
    Finished {
        crc_errors: usize,
        stream_info: Option<SyncInfo>,
    },
}

/// Forwards demuxed frames across the thread boundary.
struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

impl FrameSink for ChannelSink {
    fn send(&mut self, frame: DemuxedFrame) -> Result<()> {
        self.tx
            .send(Message::Frame(frame))
            .map_err(|_| anyhow!("Output writer stopped"))
    }

    fn set_mux_rate(&mut self, rate: i64) {
        if self.tx.send(Message::MuxRate(rate)).is_err() {
            log::debug!("Output writer stopped, mux rate {rate} dropped");
        }
    }
}

pub fn cmd_demux(args: &DemuxArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let output_path = match &args.output_path {
        Some(path) => create_path_with_extension(path, args.format.extension()),
        None if is_pipe(&args.input) => {
            anyhow::bail!("--output-path is required when reading from stdin")
        }
        None => default_output_path(&args.input, args.format),
    };

    log::info!(
        "Demuxing A/52 stream: {} -> {} (strict mode: {})",
        args.input.display(),
        output_path.display(),
        cli.strict
    );

    let (tx, rx) = mpsc::channel();
    let input_path = args.input.clone();
    let (forced, check_crc, fail_level) = (args.force, !args.no_crc, cli.fail_level());

    let demux_thread = thread::spawn(move || -> Result<()> {
        let mut demuxer = open_demuxer(&input_path, forced, fail_level, check_crc)?;
        let closed = || anyhow!("Output writer stopped");

        tx.send(Message::Opened {
            probe: *demuxer.probe_result(),
            format: *demuxer.format(),
            size: demuxer.size(),
            control: demuxer.control(),
        })
        .map_err(|_| closed())?;

        let mut clock = ProgramClock::default();
        let mut sink = ChannelSink { tx: tx.clone() };

        while demuxer.demux(&mut clock, &mut sink)? == DemuxStatus::Progress {
            tx.send(Message::Progress(demuxer.position()))
                .map_err(|_| closed())?;
        }

        log::debug!(
            "Packetizer processed {} frames",
            demuxer.packetizer().frames_processed()
        );

        tx.send(Message::Finished {
            crc_errors: demuxer.packetizer().error_count(),
            stream_info: demuxer.packetizer().stream_info().copied(),
        })
        .map_err(|_| closed())?;

        Ok(())
    });

    let mut writer: Option<FrameWriter> = None;
    let mut stats = FrameStats::default();
    let mut opened: Option<(ProbeResult, EsFormat, Control)> = None;
    let mut finished: Option<(usize, Option<SyncInfo>)> = None;
    let mut pb = None;
    let start_time = std::time::Instant::now();

    for message in rx {
        match message {
            Message::Opened {
                probe,
                format,
                size,
                control,
            } => {
                log::info!(
                    "{format} at offset {} ({}, {})",
                    probe.offset,
                    probe.container,
                    probe.byte_order
                );

                writer = Some(FrameWriter::create(&output_path, args.format)?);
                if let Some(multi) = multi {
                    pb = Some(create_progress_bar(multi, size)?);
                }
                opened = Some((probe, format, control));
            }
            Message::MuxRate(rate) => stats.set_mux_rate(rate),
            Message::Frame(frame) => {
                let writer = writer
                    .as_mut()
                    .ok_or_else(|| anyhow!("Frame received before the stream was opened"))?;
                writer.write_frame(&frame, stats.frames == 0)?;
                stats.record(&frame);
            }
            Message::Progress(position) => {
                if let (Some(pb), Some((_, _, control))) = (&pb, &opened) {
                    update_progress(pb, position, stats.frames, control);
                }
            }
            Message::Finished {
                crc_errors,
                stream_info,
            } => finished = Some((crc_errors, stream_info)),
        }
    }

    demux_thread
        .join()
        .map_err(|_| anyhow!("Demux thread panicked"))??;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let (Some((probe, format, control)), Some((crc_errors, stream_info))) = (opened, finished)
    else {
        anyhow::bail!("Demux thread ended without reporting results");
    };

    if let Some(writer) = writer {
        writer.finish()?;
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    log::info!(
        "Demuxing complete: {} frames, {} bytes in {elapsed:.2}s",
        stats.frames,
        stats.bytes
    );
    if crc_errors > 0 {
        log::warn!("{crc_errors} corrupt frames were dropped");
    }

    if let Some(report_path) = &args.report {
        let report = Report {
            version: env!("CARGO_PKG_VERSION").to_string(),
            input: args.input.display().to_string(),
            output: Some(output_path.display().to_string()),
            probe: ProbeReport::new(&probe, &format),
            stream: stream_info.as_ref().map(StreamReport::from),
            statistics: Statistics::new(&stats, crc_errors, &control),
        };
        write_report(report_path, &report)?;
    }

    Ok(())
}
