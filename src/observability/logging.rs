//! Logging pipeline.
//!
//! Structured logging via `tracing` with human-readable and JSON output,
//! verbosity mapping, and a `DEVDECK_LOG_LEVEL` override. In addition to
//! the stderr writer, a [`BusLayer`] forwards every record at info level
//! or above onto the bus `logging` channel so the console can retain it.

use std::cell::Cell;
use std::io::IsTerminal;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::bus::{Channel, Event, EventBus, LOGGING};
use crate::error::Result;
use crate::host::{Host, Service};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps a verbosity level to a tracing directive string.
///
/// - 0 → `"warn"`
/// - 1 → `"info"`
/// - 2 → `"debug"`
/// - 3+ → `"trace"` (saturates)
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// A structured log record as it travels over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the record was emitted.
    pub timestamp: DateTime<Utc>,
    /// Level name (`INFO`, `WARN`, ...).
    pub level: String,
    /// Emitting module path.
    pub target: String,
    /// Rendered message including any extra fields.
    pub message: String,
}

/// Renders a [`LogRecord`] into a display line.
///
/// The console never formats records itself; history entries are
/// produced through whichever formatter the host supplies.
pub trait LogFormatter: Send + Sync {
    /// Produces the line stored in log history.
    fn format(&self, record: &LogRecord) -> String;
}

/// Default single-line formatter: `2025-01-01 12:00:00 [INFO ] [target] msg`.
pub struct LineFormatter;

impl LogFormatter for LineFormatter {
    fn format(&self, record: &LogRecord) -> String {
        format!(
            "{} [{:<5}] [{}] {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.level,
            record.target,
            record.message
        )
    }
}

thread_local! {
    /// Re-entrancy guard: delivering a log record over the bus may itself
    /// emit tracing events (subscriber internals, downstream callbacks),
    /// which must not be forwarded again from the same thread.
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Collects the `message` field plus any extra fields into one string.
#[derive(Default)]
struct FieldCollector {
    message: String,
    extra: String,
}

impl tracing::field::Visit for FieldCollector {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            use std::fmt::Write;
            let _ = write!(self.extra, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            use std::fmt::Write;
            let _ = write!(self.extra, " {}={value}", field.name());
        }
    }
}

/// Tracing layer forwarding records onto the bus `logging` channel.
pub struct BusLayer {
    bus: Arc<EventBus>,
    channel: Channel,
}

impl BusLayer {
    /// Creates a layer publishing on `bus`.
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        let channel = bus.channel(LOGGING);
        Self { bus, channel }
    }
}

impl<S: tracing::Subscriber> Layer<S> for BusLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        // Debug/trace records stay on stderr only.
        if *event.metadata().level() > Level::INFO {
            return;
        }
        if FORWARDING.with(Cell::get) {
            return;
        }
        FORWARDING.with(|f| f.set(true));

        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        let record = LogRecord {
            timestamp: Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: format!("{}{}", fields.message, fields.extra),
        };
        if let Ok(payload) = serde_json::to_value(&record) {
            self.bus
                .publish(Event::new(self.channel.clone(), payload).with_broadcast(true));
        }

        FORWARDING.with(|f| f.set(false));
    }
}

/// Registry-visible stand-in for the logging pipeline.
///
/// The [`BusLayer`] lives inside the global subscriber, which cannot be
/// uninstalled; stopping this service therefore has no effect on log
/// flow. The console excludes it from deregistration for that reason.
pub struct LogForwarder;

/// Registry name of the [`LogForwarder`] service.
pub const LOG_FORWARDER: &str = "log-forwarder";

impl Service for LogForwarder {
    fn name(&self) -> &str {
        LOG_FORWARDER
    }

    fn start(&self, _host: &Arc<Host>) -> Result<()> {
        Ok(())
    }

    fn stop(&self, _host: &Arc<Host>) {}
}

/// Initializes the global tracing subscriber.
///
/// If `DEVDECK_LOG_LEVEL` is set it takes precedence over `verbosity`.
/// When `bus` is provided, records at info level and above are also
/// published on the `logging` channel.
///
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormat, verbosity: u8, bus: Option<Arc<EventBus>>) {
    let filter = EnvFilter::try_from_env("DEVDECK_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    let show_target = verbosity >= 2;
    let use_ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let bus_layer = bus.map(BusLayer::new);

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(use_ansi)
                        .with_target(show_target)
                        .with_writer(std::io::stderr),
                )
                .with(bus_layer)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(show_target)
                        .with_writer(std::io::stderr),
                )
                .with(bus_layer)
                .try_init();
        }
    }
}
