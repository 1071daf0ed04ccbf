//! HTTP front-end bridging real requests onto the bus.
//!
//! Every inbound request is published as an `http-request` event; a
//! subscriber that claims the request attaches an [`HttpResponse`] via
//! `Event::respond`. Delivery is synchronous, so by the time `publish`
//! returns the response is either present or will arrive shortly through
//! the one-shot responder (deferred handlers); after a short grace
//! period an unclaimed request falls back to 404 — the host's generic
//! "no handler matched" behavior.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{Channel, Event, EventBus, HTTP_REQUEST};
use crate::error::{DevDeckError, Result};
use crate::host::{Host, Service};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Registry name of the bridge service.
pub const HTTP_BRIDGE: &str = "http-bridge";

/// Maximum accepted request body size in bytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the HTTP front-end.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address to bind to, e.g. `"127.0.0.1:8080"`.
    pub bind_addr: String,
    /// How long to wait for a deferred responder before giving up with 404.
    pub response_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            response_grace: Duration::from_millis(200),
        }
    }
}

/// Shared state between the axum handler and the bridge.
struct BridgeState {
    bus: Arc<EventBus>,
    http_channel: Channel,
    response_grace: Duration,
}

/// The HTTP front-end service.
pub struct HttpBridge {
    bound_addr: SocketAddr,
    cancel: CancellationToken,
}

impl HttpBridge {
    /// Binds the front-end and starts serving.
    ///
    /// Returns the bridge; the actual bound address is available through
    /// [`local_addr`](Self::local_addr) (useful when binding port 0 in
    /// tests). Cancelling `cancel` shuts the listener down gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`DevDeckError::Transport`] if the TCP listener cannot bind.
    pub async fn bind(
        bus: Arc<EventBus>,
        config: BridgeConfig,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| DevDeckError::Transport(format!("bind failed: {e}")))?;
        let bound_addr = listener
            .local_addr()
            .map_err(|e| DevDeckError::Transport(format!("local_addr failed: {e}")))?;

        let http_channel = bus.channel(HTTP_REQUEST);
        let state = Arc::new(BridgeState {
            bus,
            http_channel,
            response_grace: config.response_grace,
        });
        let router = Router::new().fallback(forward).with_state(state);

        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            info!(%bound_addr, "HTTP front-end started");
            axum::serve(listener, router)
                .with_graceful_shutdown(server_cancel.cancelled_owned())
                .await
                .ok();
            debug!("HTTP front-end shut down");
        });

        Ok(Arc::new(Self { bound_addr, cancel }))
    }

    /// The address the listener actually bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.bound_addr
    }
}

impl Service for HttpBridge {
    fn name(&self) -> &str {
        HTTP_BRIDGE
    }

    fn start(&self, _host: &Arc<Host>) -> Result<()> {
        // Already serving since bind(); registration only makes the
        // bridge visible in the registry.
        Ok(())
    }

    fn stop(&self, _host: &Arc<Host>) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for HttpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBridge")
            .field("bound_addr", &self.bound_addr)
            .finish_non_exhaustive()
    }
}

/// Fallback handler: publish the request as a bus event and relay
/// whatever response a subscriber attaches.
async fn forward(State(state): State<Arc<BridgeState>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let method = HttpMethod::from(parts.method.as_str());
    let path = parts.uri.path().to_string();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return status_response(StatusCode::PAYLOAD_TOO_LARGE);
        }
    };

    let mut bus_request = HttpRequest::new(method, path);
    if !bytes.is_empty() {
        bus_request = bus_request.with_body(String::from_utf8_lossy(&bytes).into_owned());
    }
    let Ok(payload) = serde_json::to_value(&bus_request) else {
        return status_response(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let (tx, rx) = oneshot::channel();
    let event = Event::new(state.http_channel.clone(), payload).with_responder(tx);
    let bus = Arc::clone(&state.bus);
    let published = match tokio::task::spawn_blocking(move || bus.publish(event)).await {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "request delivery task failed");
            return status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // Synchronous handlers have responded by now; otherwise wait out the
    // grace period for a deferred responder.
    let response_value = if let Some(value) = published.response().cloned() {
        Some(value)
    } else {
        (tokio::time::timeout(state.response_grace, rx).await)
            .ok()
            .and_then(std::result::Result::ok)
    };

    response_value.map_or_else(
        || status_response(StatusCode::NOT_FOUND),
        |value| match serde_json::from_value::<HttpResponse>(value) {
            Ok(response) => into_axum_response(response),
            Err(e) => {
                warn!(error = %e, "handler attached a malformed response");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    )
}

fn into_axum_response(response: HttpResponse) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK))
        .header(header::CONTENT_TYPE, response.content_type);
    for (name, value) in response.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| status_response(StatusCode::INTERNAL_SERVER_ERROR))
}

fn status_response(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .expect("static response construction cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ContentType, response_ok};
    use serde_json::Value;

    async fn bind_test_bridge(bus: Arc<EventBus>) -> (Arc<HttpBridge>, CancellationToken) {
        let cancel = CancellationToken::new();
        let config = BridgeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            response_grace: Duration::from_millis(50),
        };
        let bridge = HttpBridge::bind(bus, config, cancel.clone()).await.unwrap();
        (bridge, cancel)
    }

    #[tokio::test]
    async fn unclaimed_request_yields_404() {
        let bus = Arc::new(EventBus::new());
        let (bridge, cancel) = bind_test_bridge(bus).await;

        let url = format!("http://{}/nobody/home", bridge.local_addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 404);

        cancel.cancel();
    }

    #[tokio::test]
    async fn claimed_request_relays_the_attached_response() {
        let bus = Arc::new(EventBus::new());
        let channel = bus.channel(HTTP_REQUEST);
        bus.subscribe(&channel, |event| {
            let request: HttpRequest =
                serde_json::from_value(event.payload().clone()).expect("request payload");
            if request.path == "/hello" {
                let response = response_ok("hi there", ContentType::Text);
                event.respond(serde_json::to_value(&response).expect("response value"));
            }
        });
        let (bridge, cancel) = bind_test_bridge(bus).await;

        let base = format!("http://{}", bridge.local_addr());
        let resp = reqwest::get(format!("{base}/hello")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "hi there");

        let miss = reqwest::get(format!("{base}/other")).await.unwrap();
        assert_eq!(miss.status(), 404);

        cancel.cancel();
    }

    #[tokio::test]
    async fn request_body_travels_on_the_event() {
        let bus = Arc::new(EventBus::new());
        let channel = bus.channel(HTTP_REQUEST);
        bus.subscribe(&channel, |event| {
            let request: HttpRequest =
                serde_json::from_value(event.payload().clone()).expect("request payload");
            let body: Value = request.body_as_json();
            let response = response_ok(body["echo"].to_string(), ContentType::Json);
            event.respond(serde_json::to_value(&response).expect("response value"));
        });
        let (bridge, cancel) = bind_test_bridge(bus).await;

        let client = reqwest::Client::new();
        let resp = client
            .patch(format!("http://{}/echo", bridge.local_addr()))
            .body(r#"{"echo": 42}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.text().await.unwrap(), "42");

        cancel.cancel();
    }
}
