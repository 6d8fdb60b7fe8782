use a52::clock::ProgramClock;
use a52::process::control::Control;
use a52::process::demux::{DemuxStatus, EsFormat};
use a52::process::probe::{Confidence, ProbeResult};
use a52::structs::sync_info::SyncInfo;
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar};

use super::command::{Cli, InfoArgs};
use super::demux::output::FrameStats;
use super::demux::progress::{create_progress_bar, update_progress};
use super::open_demuxer;
use crate::timestamp::time_str;

/// Prints through the progress bar so the output is not torn.
fn print_with(pb: Option<&ProgressBar>, f: impl FnOnce()) {
    match pb {
        Some(pb) => pb.suspend(f),
        None => f(),
    }
}

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing A/52 stream: {}", args.input.display());

    let mut demuxer = open_demuxer(&args.input, args.force, cli.fail_level(), true)?;
    let control = demuxer.control();

    println!();
    println!("A/52 Stream Information");
    println!("=======================");
    println!();
    display_probe_info(demuxer.probe_result(), demuxer.format());

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, demuxer.size())?),
        None => None,
    };

    let mut clock = ProgramClock::default();
    let mut stats = FrameStats::default();
    let mut info_displayed = false;

    while demuxer.demux(&mut clock, &mut stats)? == DemuxStatus::Progress {
        if !info_displayed {
            if let Some(info) = demuxer.packetizer().stream_info() {
                print_with(pb.as_ref(), || display_stream_info(info));
                info_displayed = true;
            }
        }

        if let Some(ref pb) = pb {
            update_progress(pb, demuxer.position(), stats.frames, &control);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    if !info_displayed {
        println!("No complete A/52 frame found in the stream.");
        println!();
    }

    display_summary(&stats, demuxer.packetizer().error_count(), &control);

    Ok(())
}

fn display_probe_info(probe: &ProbeResult, format: &EsFormat) {
    println!("Container");
    println!("  Format                    {}", probe.container);
    println!("  Codec                     {format}");
    println!("  First frame offset        {}", probe.offset);
    println!("  Byte order                {}", probe.byte_order);
    if probe.confidence == Confidence::Forced {
        println!("  Detection                 forced (no sync word found)");
    }
    println!();
}

fn display_stream_info(info: &SyncInfo) {
    println!("Stream Information");
    println!("  Sampling rate             {} Hz", info.sample_rate());
    println!("  Nominal bitrate           {} kbps", info.bitrate() / 1000);
    println!("  Audio coding mode         {}", info.channel_mode());
    println!("  Channels                  {}", info.channels());
    println!("  Bitstream ID              {}", info.bsid);
    println!("  Bitstream mode            {}", info.bsmod);
    println!("  Frame size                {} bytes", info.frame_size());
    println!(
        "  Frame duration            {:.3} ms",
        info.duration_us() as f64 / 1000.0
    );
    println!();
}

fn display_summary(stats: &FrameStats, crc_errors: usize, control: &Control) {
    println!("Analysis Summary");
    println!("  Frames processed          {}", stats.frames);

    let size_mb = stats.bytes as f64 / 1_000_000.0;
    println!("  Size                      {size_mb:.2} MB ({} bytes)", stats.bytes);

    if let Some(span) = stats.span_us() {
        println!("  Duration                  {}", time_str(span));
    }

    match control.length() {
        Ok(length) => println!("  Estimated length          {}", time_str(length)),
        Err(e) => println!("  Estimated length          unknown ({e})"),
    }

    if let Some(bitrate) = control.bitrate() {
        let kbps = bitrate as f64 * 8.0 / 1000.0;
        println!("  Estimated data rate       {kbps:.1} kbps");
    }

    if stats.discontinuities > 1 {
        println!("  Discontinuities           {}", stats.discontinuities);
    }

    if crc_errors > 0 {
        println!("  Corrupt frames dropped    {crc_errors}");
    }

    println!();
}
