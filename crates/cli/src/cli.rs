//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Station Window - time-synchronised data windows for recorded stations
#[derive(Parser, Debug)]
#[command(
    name = "station-window",
    author,
    version,
    about = "Time-synchronised data windows for recorded stations",
    long_about = "Loads station recordings, estimates each station's clock offset from its \n\
                  time sync exchanges, corrects the timestamps and cuts every sensor to a \n\
                  common, gap-free time window."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STATION_WINDOW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "STATION_WINDOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level implied by `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the data window and print a summary
    Run(RunArgs),

    /// Validate a configuration file without loading data
    Validate(ValidateArgs),

    /// Print the time sync analysis of every station
    Info(InfoArgs),
}

/// Where the window configuration and station data come from
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "STATION_WINDOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the input directory from the configuration
    #[arg(short, long, env = "STATION_WINDOW_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Only load these stations (repeatable)
    #[arg(short, long = "station", value_name = "ID")]
    pub stations: Vec<String>,

    /// Window start, RFC 3339 (e.g. 2021-11-22T18:00:00Z)
    #[arg(long, env = "STATION_WINDOW_START")]
    pub start: Option<String>,

    /// Window end, RFC 3339
    #[arg(long, env = "STATION_WINDOW_END")]
    pub end: Option<String>,

    /// Keep the raw station timestamps
    #[arg(long)]
    pub no_correction: bool,

    /// Station files sit directly in the input directory
    #[arg(long)]
    pub flat: bool,

    /// Station data source
    #[arg(long, value_enum, default_value = "json", env = "STATION_WINDOW_SOURCE")]
    pub source: SourceKind,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Write the windowed stations as JSON files into this directory
    #[arg(short, long, env = "STATION_WINDOW_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Print the per-station summaries as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STATION_WINDOW_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STATION_WINDOW_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "window.toml", env = "STATION_WINDOW_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every packet's latency and offset
    #[arg(long)]
    pub packets: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Station data source
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// JSON station files under the input directory
    #[default]
    Json,
    /// Synthetic demo stations
    Mock,
}
