//! The dev console service.
//!
//! One service instance owns the capture pipeline end to end: it
//! discovers bus channels on every heartbeat and attaches a capture
//! callback to each exactly once, classifies every delivered event into
//! the bounded histories, answers the console's own HTTP routes, and
//! applies configuration change-sets that arrive back over the bus.

pub mod config;
mod dispatch;
pub mod recorder;
pub mod routes;

pub use config::{BASE_PATH, ConsoleConfig};
pub use recorder::Recorder;
pub use routes::Route;

use std::sync::{Arc, Mutex, OnceLock, Weak};

use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::info;

use crate::assets::StaticFiles;
use crate::bus::{APP_HEARTBEAT, Channel, Event, HTTP_REQUEST, LOGGING, SubscriptionId};
use crate::error::Result;
use crate::host::{Host, Service};
use crate::http::HttpRequest;
use crate::observability::logging::{LOG_FORWARDER, LineFormatter, LogFormatter, LogRecord};
use crate::observability::metrics;

/// Registry name of the console service.
pub const CONSOLE_SERVICE: &str = "dev-console";

/// The embedded dev console.
pub struct ConsoleService {
    config: ConsoleConfig,
    recorder: Recorder,
    assets: StaticFiles,
    formatter: Arc<dyn LogFormatter>,
    // Components whose shutdown would not take effect; hidden from the
    // service count and from deregistration.
    excluded_services: Vec<String>,
    subscriptions: DashMap<Channel, SubscriptionId>,
    // std::sync::Mutex: touched only at start/stop.
    heartbeat_sub: Mutex<Option<SubscriptionId>>,
    host: OnceLock<Weak<Host>>,
    weak_self: Weak<Self>,
}

impl ConsoleService {
    /// Creates a console around the given configuration and asset bundle.
    #[must_use]
    pub fn new(config: ConsoleConfig, assets: StaticFiles) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            config,
            recorder: Recorder::new(),
            assets,
            formatter: Arc::new(LineFormatter),
            excluded_services: vec![LOG_FORWARDER.to_string()],
            subscriptions: DashMap::new(),
            heartbeat_sub: Mutex::new(None),
            host: OnceLock::new(),
            weak_self: weak_self.clone(),
        })
    }

    /// Live configuration.
    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Capture state: histories and counters.
    #[must_use]
    pub const fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// The bundled static files.
    #[must_use]
    pub const fn assets(&self) -> &StaticFiles {
        &self.assets
    }

    /// Number of channels currently captured.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn host(&self) -> Option<Arc<Host>> {
        self.host.get().and_then(Weak::upgrade)
    }

    /// Registered services minus the excluded ones.
    pub(crate) fn filtered_services(&self, host: &Arc<Host>) -> Vec<Arc<dyn Service>> {
        host.services()
            .into_iter()
            .filter(|svc| !self.excluded_services.iter().any(|ex| ex == svc.name()))
            .collect()
    }

    /// Scans the bus channel registry and captures every channel not yet
    /// subscribed. Idempotent; safe to run concurrently with delivery.
    pub(crate) fn sync_channels(&self) {
        let Some(host) = self.host() else { return };
        let bus = host.bus();
        for channel in bus.channels() {
            // Guarded insert-if-absent: the entry shard lock makes the
            // check-and-subscribe atomic against a racing rescan.
            self.subscriptions.entry(channel.clone()).or_insert_with(|| {
                let weak = self.weak_self.clone();
                bus.subscribe(&channel, move |event| {
                    if let Some(console) = weak.upgrade() {
                        console.record(event);
                    }
                })
            });
        }
    }

    /// Capture entry point, invoked once per delivered event from
    /// whatever thread the bus uses.
    pub(crate) fn record(&self, event: &Arc<Event>) {
        self.recorder.increment_total();
        metrics::record_event_captured(event.channel().name());

        let channel = event.channel().name();
        if channel == APP_HEARTBEAT {
            return;
        }

        // The console's own HTTP traffic is answered, not retained.
        if channel == HTTP_REQUEST {
            if let Ok(request) = serde_json::from_value::<HttpRequest>(event.payload().clone()) {
                if let Some(route) = self.match_own_route(&request) {
                    self.handle_http(event, &request, route);
                    return;
                }
            }
        }

        if channel == LOGGING {
            let line = match serde_json::from_value::<LogRecord>(event.payload().clone()) {
                Ok(record) => self.formatter.format(&record),
                // A malformed record costs one unformatted line, not the capture.
                Err(_) => event.payload().to_string(),
            };
            self.recorder.push_log(line, self.config.max_logs());
        } else {
            self.recorder
                .push_event(Arc::clone(event), self.config.max_events());
        }
    }

    pub(crate) fn match_own_route(&self, request: &HttpRequest) -> Option<Route> {
        let live: Vec<String> = self.host().map_or_else(Vec::new, |host| {
            self.filtered_services(&host)
                .iter()
                .map(|svc| svc.name().to_string())
                .collect()
        });
        routes::match_route(request, &self.config.ui_path(), &self.assets, &live)
    }
}

impl Service for ConsoleService {
    fn name(&self) -> &str {
        CONSOLE_SERVICE
    }

    fn start(&self, host: &Arc<Host>) -> Result<()> {
        let _ = self.host.set(Arc::downgrade(host));
        // Intern the heartbeat channel before the initial scan so the
        // capture callback sees heartbeats (counted, never stored) from
        // the first tick on.
        let heartbeat = host.bus().channel(APP_HEARTBEAT);
        self.sync_channels();

        let weak = self.weak_self.clone();
        let id = host.bus().subscribe(&heartbeat, move |_| {
            if let Some(console) = weak.upgrade() {
                console.sync_channels();
            }
        });
        *self
            .heartbeat_sub
            .lock()
            .expect("heartbeat subscription lock poisoned") = Some(id);

        info!(
            path = %format!("{BASE_PATH}{}", self.config.ui_path()),
            "dev console started"
        );
        Ok(())
    }

    fn stop(&self, host: &Arc<Host>) {
        let bus = host.bus();
        let heartbeat_id = self
            .heartbeat_sub
            .lock()
            .expect("heartbeat subscription lock poisoned")
            .take();
        if let Some(id) = heartbeat_id {
            bus.unsubscribe(&bus.channel(APP_HEARTBEAT), id);
        }
        for entry in self.subscriptions.iter() {
            bus.unsubscribe(entry.key(), *entry.value());
        }
        self.subscriptions.clear();
        self.recorder.clear();
        info!("dev console stopped");
    }

    fn configure(&self, changes: &Map<String, Value>) {
        self.config.apply(changes);
        self.recorder
            .trim(self.config.max_events(), self.config.max_logs());
    }
}

impl std::fmt::Debug for ConsoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleService")
            .field("config", &self.config)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
