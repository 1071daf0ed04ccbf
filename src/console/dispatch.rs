//! Verb dispatch and route handlers.
//!
//! A matched route is dispatched on the request verb; any other verb on
//! a matched route is a no-op plus a diagnostic log, which surfaces as
//! the host's 404. Every success goes through [`response_ok`]: status
//! 200, a content type, permissive CORS headers, and the body.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::bus::{CONFIG_CHANGE, Event, SERVICE_UNREGISTER};
use crate::http::{ContentType, HttpMethod, HttpRequest, HttpResponse, response_ok};
use crate::observability::metrics;

use super::ConsoleService;
use super::config::{self, CONFIG_MAX_EVENTS, CONFIG_MAX_LOGS, CONFIG_URL};
use super::routes::Route;

/// Payload and response strings in the event list are cut at this many
/// characters to bound response size.
const TRUNCATE_AT: usize = 256;
/// Appended to a truncated string.
const TRUNCATION_MARKER: char = '…';

impl ConsoleService {
    /// Dispatches a request that matched one of the console's routes.
    pub(crate) fn handle_http(&self, event: &Arc<Event>, request: &HttpRequest, route: Route) {
        metrics::record_console_request(route.label());
        match &request.method {
            HttpMethod::Get => self.handle_get(event, &route),
            HttpMethod::Patch => self.handle_patch(event, request, &route),
            HttpMethod::Delete => self.handle_delete(event, &route),
            other => {
                debug!(method = %other, path = %request.path, "no console handler for this verb");
            }
        }
    }

    fn handle_get(&self, event: &Arc<Event>, route: &Route) {
        match route {
            Route::SystemInfo => {
                respond(event, response_ok(self.system_info().to_string(), ContentType::Json));
            }
            Route::Events => {
                respond(event, response_ok(self.event_list().to_string(), ContentType::Json));
            }
            Route::Logs => {
                let logs = Value::from(self.recorder().logs_snapshot());
                respond(event, response_ok(logs.to_string(), ContentType::Json));
            }
            Route::Config => {
                respond(
                    event,
                    response_ok(self.config().as_json().to_string(), ContentType::Json),
                );
            }
            Route::Ui => {
                if let Some(html) = self.assets().get(crate::assets::INDEX_FILE) {
                    respond(event, response_ok(html, ContentType::Html));
                }
            }
            Route::Asset(name) => {
                if let Some(content) = self.assets().get(name) {
                    respond(
                        event,
                        response_ok(content, ContentType::from_file_ext(name)),
                    );
                }
            }
            Route::Service(_) => {
                debug!("GET is not supported on the service endpoint");
            }
        }
    }

    fn handle_patch(&self, event: &Arc<Event>, request: &HttpRequest, route: &Route) {
        if *route != Route::Config {
            debug!(route = route.label(), "PATCH is not supported on this endpoint");
            return;
        }

        let changes = config::stage_update(&request.body_as_json());
        for key in changes.keys() {
            match key.as_str() {
                CONFIG_MAX_EVENTS => metrics::record_config_update(CONFIG_MAX_EVENTS),
                CONFIG_MAX_LOGS => metrics::record_config_update(CONFIG_MAX_LOGS),
                _ => metrics::record_config_update(CONFIG_URL),
            }
        }

        // The change-set is broadcast and applied when it arrives back at
        // this service's own configure hook; the response only claims the
        // keys that were staged.
        let body = Value::Object(changes.clone());
        if let Some(host) = self.host() {
            host.bus().publish_async(
                Event::new(host.bus().channel(CONFIG_CHANGE), Value::Object(changes))
                    .with_broadcast(true),
            );
        }
        respond(event, response_ok(body.to_string(), ContentType::Json));
    }

    fn handle_delete(&self, event: &Arc<Event>, route: &Route) {
        let Route::Service(name) = route else {
            debug!(route = route.label(), "DELETE is not supported on this endpoint");
            return;
        };
        let Some(host) = self.host() else { return };

        // Re-check liveness at dispatch time; a component that vanished
        // since matching surfaces as the host's 404.
        if self
            .filtered_services(&host)
            .iter()
            .any(|svc| svc.name() == name)
        {
            host.bus().publish_async(Event::new(
                host.bus().channel(SERVICE_UNREGISTER),
                json!({"service": name}),
            ));
            respond(event, response_ok("", ContentType::Text));
        }
    }

    /// Aggregated runtime snapshot for `GET {base}/system-info`.
    pub(crate) fn system_info(&self) -> Value {
        let (service_names, listeners) = self.host().map_or_else(
            || (Vec::new(), 0),
            |host| {
                let names: Vec<String> = self
                    .filtered_services(&host)
                    .iter()
                    .map(|svc| svc.name().to_string())
                    .collect();
                (names, host.bus().listener_count())
            },
        );
        let stats = self.host().map(|host| Arc::clone(host.stats()));

        json!({
            "pid": stats.as_ref().map_or(0, |s| s.pid()),
            "usedMemory": format!("{} MB", stats.as_ref().map_or(0, |s| s.used_memory_mb())),
            "services": service_names.len(),
            "serviceNames": service_names,
            "listeners": listeners,
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "cores": std::thread::available_parallelism().map_or(1, std::num::NonZero::get),
            "cpuUsage": stats.as_ref().map_or(0.0, |s| s.cpu_usage_percent()),
            "threads": stats.as_ref().map_or(0, |s| s.thread_count()),
            "totalEvents": self.recorder().total_events(),
            "lastEventsRetained": self.recorder().event_count(),
            "lastLogsRetained": self.recorder().log_count(),
            "lastUpdated": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }

    /// Event history rendered for `GET {base}/events`, newest first.
    pub(crate) fn event_list(&self) -> Value {
        let entries: Vec<Value> = self
            .recorder()
            .events_snapshot()
            .iter()
            .map(|event| {
                json!({
                    "channel": event.channel().name(),
                    "isAck": event.is_acknowledged(),
                    "isBroadcast": event.is_broadcast(),
                    "eventTimestamp": event.recorded_at().map(|t| t.to_rfc3339()),
                    "payload": truncate_display(event.payload()),
                    "response": event.response().map_or_else(String::new, truncate_display),
                })
            })
            .collect();
        Value::Array(entries)
    }
}

/// Attaches a response to the originating event.
fn respond(event: &Arc<Event>, response: HttpResponse) {
    match serde_json::to_value(&response) {
        Ok(value) => event.respond(value),
        Err(e) => error!(error = %e, "failed to serialize console response"),
    }
}

/// Renders a payload or response value as a display string, cut at
/// [`TRUNCATE_AT`] characters with a marker appended.
fn truncate_display(value: &Value) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > TRUNCATE_AT {
        let mut cut: String = text.chars().take(TRUNCATE_AT).collect();
        cut.push(TRUNCATION_MARKER);
        cut
    } else {
        text
    }
}
