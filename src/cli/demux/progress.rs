use a52::process::control::Control;
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::timestamp::time_str;

/// Progress by bytes consumed; a spinner when the input size is unknown.
pub fn create_progress_bar(multi: &MultiProgress, total_bytes: Option<u64>) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_bytes {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(
            "{bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
        )?);
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {bytes}\n{msg} | elapsed: {elapsed_precise}",
        )?);
        pb
    };

    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("probing");
    Ok(pb)
}

pub fn update_progress(pb: &ProgressBar, position: u64, frames: u64, control: &Control) {
    pb.set_position(position);

    let time = control
        .time()
        .map(time_str)
        .unwrap_or_else(|_| "--:--:--.---".to_string());
    pb.set_message(format!("{frames} frames, stream time {time}"));
}
