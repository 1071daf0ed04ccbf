//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::observability::LogFormat;

/// Embedded dev console for event-bus applications.
#[derive(Parser, Debug)]
#[command(name = "devdeck", author, version, about)]
pub struct Cli {
    /// Path to a YAML configuration file.
    #[arg(short, long, env = "DEVDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP front-end, e.g. 127.0.0.1:8080.
    #[arg(long, env = "DEVDECK_BIND")]
    pub bind: Option<String>,

    /// UI sub-path under the console base path.
    #[arg(long)]
    pub ui_path: Option<String>,

    /// Event history capacity.
    #[arg(long)]
    pub max_events: Option<usize>,

    /// Log history capacity.
    #[arg(long)]
    pub max_logs: Option<usize>,

    /// Heartbeat interval (e.g. "2s", "500ms").
    #[arg(long)]
    pub heartbeat_interval: Option<String>,

    /// Directory of dashboard files overriding the embedded bundle.
    #[arg(long, env = "DEVDECK_ASSETS")]
    pub assets_dir: Option<PathBuf>,

    /// Port for the Prometheus metrics listener on 127.0.0.1.
    #[arg(long, env = "DEVDECK_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log output format.
    #[arg(long, default_value = "human")]
    pub log_format: LogFormatArg,
}

/// CLI-facing log format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable output.
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => Self::Human,
            LogFormatArg::Json => Self::Json,
        }
    }
}
