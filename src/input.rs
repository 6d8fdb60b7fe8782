use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use a52::source::StreamSource;
use anyhow::{Context, Result};

pub type InputSource = StreamSource<Box<dyn Read>>;

/// Whether `input_path` names stdin.
pub fn is_pipe<P: AsRef<Path>>(input_path: P) -> bool {
    input_path.as_ref().to_string_lossy() == "-"
}

/// Opens a file, or stdin for "-", as a byte source.
///
/// Files report their length so that duration and progress can be estimated;
/// pipes do not.
pub fn open_input<P: AsRef<Path>>(input_path: P) -> Result<InputSource> {
    let input_path = input_path.as_ref();

    if is_pipe(input_path) {
        log::debug!("Reading from stdin");
        return Ok(StreamSource::new(Box::new(io::stdin().lock()), None));
    }

    let file = File::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let size = file.metadata().ok().map(|m| m.len()).filter(|&len| len > 0);

    Ok(StreamSource::new(Box::new(BufReader::new(file)), size))
}
