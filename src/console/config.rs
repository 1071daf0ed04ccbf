//! Console configuration and the validated update path.
//!
//! Retention caps and the UI path are process-wide, readable from any
//! thread, and mutated only through [`stage_update`] (validation +
//! change-set staging) followed by [`ConsoleConfig::apply`] (applying a
//! change-set that arrived back over the `config-change` channel).

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value, json};
use tracing::warn;

/// Fixed root of the console's HTTP surface.
pub const BASE_PATH: &str = "/dev-console";
/// Default UI sub-path under [`BASE_PATH`].
pub const DEFAULT_UI_PATH: &str = "/ui";
/// Default event history capacity.
pub const DEFAULT_MAX_EVENTS: usize = 1000;
/// Default log history capacity.
pub const DEFAULT_MAX_LOGS: usize = 1000;

/// Change-set key for the event history capacity.
pub const CONFIG_MAX_EVENTS: &str = "dev_console_max_events";
/// Change-set key for the log history capacity.
pub const CONFIG_MAX_LOGS: &str = "dev_console_max_logs";
/// Change-set key for the UI path.
pub const CONFIG_URL: &str = "dev_console_url";

/// Live console configuration.
pub struct ConsoleConfig {
    // RwLock over a small String: read often (route matching), written
    // only through the update path.
    ui_path: RwLock<String>,
    max_events: AtomicUsize,
    max_logs: AtomicUsize,
}

impl ConsoleConfig {
    /// Creates a configuration with explicit initial values.
    #[must_use]
    pub fn new(ui_path: impl Into<String>, max_events: usize, max_logs: usize) -> Self {
        Self {
            ui_path: RwLock::new(ui_path.into()),
            max_events: AtomicUsize::new(max_events),
            max_logs: AtomicUsize::new(max_logs),
        }
    }

    /// Current UI sub-path.
    #[must_use]
    pub fn ui_path(&self) -> String {
        self.ui_path.read().expect("ui_path lock poisoned").clone()
    }

    /// Current event history capacity.
    #[must_use]
    pub fn max_events(&self) -> usize {
        self.max_events.load(Ordering::SeqCst)
    }

    /// Current log history capacity.
    #[must_use]
    pub fn max_logs(&self) -> usize {
        self.max_logs.load(Ordering::SeqCst)
    }

    /// The config view served on `GET {base}/config`.
    #[must_use]
    pub fn as_json(&self) -> Value {
        json!({
            "baseUrl": self.ui_path(),
            "maxEvents": self.max_events(),
            "maxLogs": self.max_logs(),
        })
    }

    /// Applies a change-set keyed by the internal config keys.
    ///
    /// Keys absent from the change-set leave the current value untouched.
    pub fn apply(&self, changes: &Map<String, Value>) {
        if let Some(max) = changes.get(CONFIG_MAX_EVENTS).and_then(Value::as_u64) {
            #[allow(clippy::cast_possible_truncation)]
            self.max_events.store(max as usize, Ordering::SeqCst);
        }
        if let Some(max) = changes.get(CONFIG_MAX_LOGS).and_then(Value::as_u64) {
            #[allow(clippy::cast_possible_truncation)]
            self.max_logs.store(max as usize, Ordering::SeqCst);
        }
        if let Some(path) = changes.get(CONFIG_URL).and_then(Value::as_str) {
            *self.ui_path.write().expect("ui_path lock poisoned") = path.to_string();
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::new(DEFAULT_UI_PATH, DEFAULT_MAX_EVENTS, DEFAULT_MAX_LOGS)
    }
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConfig")
            .field("ui_path", &self.ui_path())
            .field("max_events", &self.max_events())
            .field("max_logs", &self.max_logs())
            .finish()
    }
}

/// Validates a partial update document and stages the recognized keys
/// into a change-set keyed by the internal config keys.
///
/// `maxEvents`/`maxLogs` must be positive integers and `baseUrl` a
/// string; anything else is logged and skipped. Absent keys are simply
/// not staged.
#[must_use]
pub fn stage_update(partial: &Value) -> Map<String, Value> {
    let mut changes = Map::new();

    stage_capacity(partial, "maxEvents", CONFIG_MAX_EVENTS, &mut changes);
    stage_capacity(partial, "maxLogs", CONFIG_MAX_LOGS, &mut changes);

    if let Some(value) = partial.get("baseUrl") {
        if let Some(path) = value.as_str() {
            changes.insert(CONFIG_URL.to_string(), json!(path));
        } else {
            warn!(%value, "ignoring non-string baseUrl in config update");
        }
    }

    changes
}

fn stage_capacity(partial: &Value, field: &str, key: &str, changes: &mut Map<String, Value>) {
    let Some(value) = partial.get(field) else {
        return;
    };
    match value.as_u64() {
        Some(n) if n > 0 => {
            changes.insert(key.to_string(), json!(n));
        }
        _ => warn!(field, %value, "ignoring non-positive capacity in config update"),
    }
}
