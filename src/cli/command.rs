use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\na52 library ",
    env!("A52_VERSION"),
    "\nbuilt ",
    env!("BUILD_TIMESTAMP"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about        = "Tools for probing and demultiplexing raw A/52 (AC-3) streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Diagnostics at or above this level abort the operation.
    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract the A/52 elementary stream, normalized to network word order.
    Demux(DemuxArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct DemuxArgs {
    /// Input A/52 stream or RIFF/WAVE file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path; the extension is chosen from the format.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Container for the output.
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
    pub format: OutputFormat,

    /// Write a YAML summary of the probe result and stream statistics.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Demux even when no A/52 sync word is found.
    #[arg(long)]
    pub force: bool,

    /// Keep frames whose CRC does not match.
    #[arg(long)]
    pub no_crc: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input A/52 stream or RIFF/WAVE file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Analyze even when no A/52 sync word is found.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Bare A/52 frames (.ac3).
    Raw,
    /// A/52 frames in a RIFF/WAVE envelope (.wav).
    Wav,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Raw => "ac3",
            OutputFormat::Wav => "wav",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_demux_arguments() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "a52dmx",
            "--strict",
            "demux",
            "in.wav",
            "--format",
            "wav",
            "--output-path",
            "out",
            "--force",
        ])?;

        assert_eq!(cli.fail_level(), log::Level::Warn);
        let Commands::Demux(args) = cli.command else {
            anyhow::bail!("expected demux subcommand");
        };
        assert_eq!(args.format, OutputFormat::Wav);
        assert_eq!(args.output_path, Some(PathBuf::from("out")));
        assert!(args.force);
        assert!(!args.no_crc);
        Ok(())
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["a52dmx", "info", "-"])?;
        assert_eq!(cli.fail_level(), log::Level::Error);
        assert!(matches!(cli.command, Commands::Info(InfoArgs { force: false, .. })));
        Ok(())
    }
}
