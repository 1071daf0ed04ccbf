//! Settings resolution: CLI flags over config file over defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::console::config::{DEFAULT_MAX_EVENTS, DEFAULT_MAX_LOGS, DEFAULT_UI_PATH};
use crate::error::{ConfigError, Result};

use super::args::Cli;

/// Default front-end bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(2);

/// Optional YAML configuration file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileConfig {
    bind: Option<String>,
    ui_path: Option<String>,
    max_events: Option<usize>,
    max_logs: Option<usize>,
    heartbeat_interval: Option<String>,
    assets_dir: Option<PathBuf>,
    metrics_port: Option<u16>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let parsed = serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(parsed)
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Front-end bind address.
    pub bind: String,
    /// UI sub-path under the console base path.
    pub ui_path: String,
    /// Event history capacity.
    pub max_events: usize,
    /// Log history capacity.
    pub max_logs: usize,
    /// Heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Dashboard directory override; `None` uses the embedded bundle.
    pub assets_dir: Option<PathBuf>,
    /// Prometheus listener port, if enabled.
    pub metrics_port: Option<u16>,
}

impl Settings {
    /// Resolves settings from the CLI, layering flags over the config
    /// file (if given) over defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing/unparsable config file, a
    /// zero capacity, or an unparsable heartbeat interval.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = cli
            .config
            .as_deref()
            .map(FileConfig::load)
            .transpose()?
            .unwrap_or_default();

        let max_events = cli
            .max_events
            .or(file.max_events)
            .unwrap_or(DEFAULT_MAX_EVENTS);
        let max_logs = cli.max_logs.or(file.max_logs).unwrap_or(DEFAULT_MAX_LOGS);
        for (field, value) in [("max-events", max_events), ("max-logs", max_logs)] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    expected: "a positive integer".to_string(),
                }
                .into());
            }
        }

        let heartbeat_raw = cli
            .heartbeat_interval
            .clone()
            .or(file.heartbeat_interval);
        let heartbeat_interval = match heartbeat_raw {
            Some(raw) => {
                humantime::parse_duration(&raw).map_err(|e| ConfigError::InvalidValue {
                    field: "heartbeat-interval".to_string(),
                    value: raw,
                    expected: format!("a duration such as \"2s\" ({e})"),
                })?
            }
            None => DEFAULT_HEARTBEAT,
        };

        Ok(Self {
            bind: cli
                .bind
                .clone()
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            ui_path: cli
                .ui_path
                .clone()
                .or(file.ui_path)
                .unwrap_or_else(|| DEFAULT_UI_PATH.to_string()),
            max_events,
            max_logs,
            heartbeat_interval,
            assets_dir: cli.assets_dir.clone().or(file.assets_dir),
            metrics_port: cli.metrics_port.or(file.metrics_port),
        })
    }
}
