//! Metrics collection.
//!
//! Prometheus-compatible metrics with label cardinality protection for
//! channel names (application channels are open-ended) and typed
//! convenience functions for recording measurements.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::DevDeckError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Well-known channel names used for label cardinality protection.
///
/// Application channels are created at runtime and unbounded in number;
/// any channel not in this list is bucketed as `"__other__"` so label
/// cardinality stays fixed.
const KNOWN_CHANNELS: [&str; 5] = [
    "app-heartbeat",
    "logging",
    "http-request",
    "config-change",
    "service-unregister",
];

/// Sanitizes a channel name for use as a metrics label.
#[must_use]
pub fn sanitize_channel_label(channel: &str) -> &str {
    if KNOWN_CHANNELS.contains(&channel) {
        channel
    } else {
        "__other__"
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `DevDeckError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), DevDeckError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| DevDeckError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "devdeck_events_total",
        "Total bus events delivered to the console"
    );
    describe_counter!(
        "devdeck_console_requests_total",
        "HTTP requests dispatched by the console"
    );
    describe_counter!(
        "devdeck_history_evictions_total",
        "Entries evicted from a bounded history"
    );
    describe_gauge!("devdeck_history_len", "Current length of a history");
    describe_counter!(
        "devdeck_config_updates_total",
        "Configuration keys changed through the update path"
    );
}

/// Records a bus event delivered to the console's capture callback.
pub fn record_event_captured(channel: &str) {
    let label = sanitize_channel_label(channel);
    counter!("devdeck_events_total", "channel" => label.to_owned()).increment(1);
}

/// Records an HTTP request dispatched to a console route.
pub fn record_console_request(route: &'static str) {
    counter!("devdeck_console_requests_total", "route" => route).increment(1);
}

/// Records `count` entries evicted from the named history.
pub fn record_eviction(history: &'static str, count: u64) {
    counter!("devdeck_history_evictions_total", "history" => history).increment(count);
}

/// Sets the current length gauge for the named history.
#[allow(clippy::cast_precision_loss)]
pub fn set_history_len(history: &'static str, len: usize) {
    gauge!("devdeck_history_len", "history" => history).set(len as f64);
}

/// Records a configuration key changed through the update path.
pub fn record_config_update(key: &'static str) {
    counter!("devdeck_config_updates_total", "key" => key).increment(1);
}
