//! Shared harness for integration tests: boots a host with a console
//! attached and drives HTTP requests through the bus the way the host's
//! front-end would.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use devdeck::assets::StaticFiles;
use devdeck::bus::{Event, EventBus, HTTP_REQUEST};
use devdeck::console::{ConsoleConfig, ConsoleService};
use devdeck::error::Result;
use devdeck::host::{Host, ProcStats, Service};
use devdeck::http::bridge::{BridgeConfig, HttpBridge};
use devdeck::http::{HttpMethod, HttpRequest, HttpResponse};
use devdeck::observability::LogForwarder;

/// A booted host + console pair, no real HTTP listener.
pub struct TestStack {
    pub host: Arc<Host>,
    pub console: Arc<ConsoleService>,
}

/// Boots a host with the default console configuration.
pub fn boot() -> TestStack {
    boot_with(ConsoleConfig::default())
}

/// Boots a host with the given console configuration.
pub fn boot_with(config: ConsoleConfig) -> TestStack {
    let bus = Arc::new(EventBus::new());
    // Intern the request channel up front so the console's initial scan
    // subscribes to it.
    let _ = bus.channel(HTTP_REQUEST);
    let host = Host::new(bus, Arc::new(ProcStats::new()));
    host.install(Arc::new(LogForwarder)).unwrap();
    let console = ConsoleService::new(config, StaticFiles::embedded());
    host.install(Arc::clone(&console) as Arc<dyn Service>)
        .unwrap();
    TestStack { host, console }
}

/// A full stack with a real axum front-end bound to an ephemeral port.
pub struct FullStack {
    pub host: Arc<Host>,
    pub console: Arc<ConsoleService>,
    pub base: String,
    cancel: CancellationToken,
}

impl Drop for FullStack {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Boots the whole system the way `main` wires it, minus the heartbeat
/// ticker (tests publish heartbeats explicitly for determinism).
pub async fn boot_full_with(config: ConsoleConfig) -> FullStack {
    let bus = Arc::new(EventBus::new());
    let host = Host::new(Arc::clone(&bus), Arc::new(ProcStats::new()));
    host.install(Arc::new(LogForwarder)).unwrap();

    let cancel = CancellationToken::new();
    let bridge = HttpBridge::bind(
        bus,
        BridgeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            response_grace: Duration::from_millis(50),
        },
        cancel.clone(),
    )
    .await
    .unwrap();
    let base = format!("http://{}", bridge.local_addr());
    host.install(bridge as Arc<dyn Service>).unwrap();

    let console = ConsoleService::new(config, StaticFiles::embedded());
    host.install(Arc::clone(&console) as Arc<dyn Service>)
        .unwrap();

    FullStack {
        host,
        console,
        base,
        cancel,
    }
}

/// Boots the full stack with the default configuration.
pub async fn boot_full() -> FullStack {
    boot_full_with(ConsoleConfig::default()).await
}

/// Publishes `request` on the `http-request` channel and returns the
/// response a handler attached, if any.
pub fn drive(host: &Arc<Host>, request: &HttpRequest) -> Option<HttpResponse> {
    let bus = host.bus();
    let payload = serde_json::to_value(request).expect("request serializes");
    let event = bus.publish(Event::new(bus.channel(HTTP_REQUEST), payload));
    event
        .response()
        .cloned()
        .map(|value| serde_json::from_value(value).expect("response deserializes"))
}

/// `GET` request helper.
pub fn get(path: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, path)
}

/// Publishes one event on an application channel, interning it and
/// triggering a rescan first so the console captures it.
pub fn publish_app_event(host: &Arc<Host>, channel: &str, payload: serde_json::Value) {
    let bus = host.bus();
    let app_channel = bus.channel(channel);
    bus.publish(Event::new(
        bus.channel(devdeck::bus::APP_HEARTBEAT),
        serde_json::Value::Null,
    ));
    bus.publish(Event::new(app_channel, payload));
}

/// Polls `predicate` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

/// Minimal named service for registry tests.
pub struct DummyService {
    name: String,
}

impl DummyService {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

impl Service for DummyService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, _host: &Arc<Host>) -> Result<()> {
        Ok(())
    }

    fn stop(&self, _host: &Arc<Host>) {}
}
