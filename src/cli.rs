//! Command-line interface definitions using clap.

use crate::coordinator::RunConfig;
use crate::logging::LogFormat;
use crate::output::OutputFormat;
use crate::version;
use crate::worker::Transport;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Find the minimum and maximum of a generated array using forked workers.
#[derive(Parser, Debug)]
#[command(name = "pminmax")]
#[command(author, about, long_about = None)]
#[command(version = version::clap_version(), long_version = version::long_version())]
pub struct Cli {
    /// Seed for the array generator (positive).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub seed: u64,

    /// Number of array elements (positive).
    #[arg(
        long = "array_size",
        visible_alias = "array-size",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub array_size: u64,

    /// Number of worker processes (positive).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pnum: u32,

    /// Kill workers still running after this many seconds (0 for none).
    #[arg(long, default_value_t = 0)]
    pub timeout: u64,

    /// Pass results through files instead of pipes.
    #[arg(short = 'f', long = "by_files", visible_alias = "by-files")]
    pub by_files: bool,

    /// Directory for result files when using --by_files.
    #[arg(long, env = "PMM_RESULT_DIR", default_value = ".")]
    pub result_dir: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Plain)]
    pub format: OutputFormatArg,

    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log output format.
    #[arg(long, env = "PMM_LOG_FORMAT", value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,

    /// Pause each worker before scanning, in milliseconds.
    #[arg(long, env = "PMM_SCAN_DELAY_MS", default_value_t = 0, hide = true)]
    pub scan_delay_ms: u64,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
}

/// Output format argument.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Human-readable report.
    #[default]
    Plain,
    /// JSON report.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Plain => OutputFormat::Plain,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Verbosity level for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// -q: errors only.
    Quiet,
    /// Default: warnings and errors.
    Normal,
    /// -v: include run progress.
    Info,
    /// -vv: include per-worker events.
    Debug,
}

impl From<u8> for Verbosity {
    fn from(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

impl Verbosity {
    /// Log level for this verbosity.
    pub fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::ERROR,
            Verbosity::Normal => Level::WARN,
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }

    /// Whether the user asked for a level explicitly.
    pub fn is_explicit(self) -> bool {
        self != Verbosity::Normal
    }
}

impl Cli {
    /// Get the verbosity level based on -v / -q flags.
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from(self.verbose)
        }
    }

    pub fn transport(&self) -> Transport {
        if self.by_files {
            Transport::File {
                dir: self.result_dir.clone(),
            }
        } else {
            Transport::Pipe
        }
    }

    /// Build the library run configuration.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig::new(self.seed, self.array_size as usize, self.pnum)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_transport(self.transport())
            .with_scan_delay(Duration::from_millis(self.scan_delay_ms))
    }
}
