//! Event records carried on the bus.
//!
//! An [`Event`] is created by a publisher, delivered to every callback
//! subscribed to its channel, and may be answered exactly once via
//! [`Event::respond`]. Responding stores the response on the event,
//! marks it acknowledged, and fires the one-shot responder when the
//! publisher attached one (the HTTP front-end does this to stream the
//! answer back to the waiting client).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;

use super::Channel;

/// A single bus event.
///
/// Immutable once recorded except for the response/acknowledged pair,
/// which transitions at most once.
pub struct Event {
    channel: Channel,
    payload: Value,
    broadcast: bool,
    acknowledged: AtomicBool,
    response: OnceLock<Value>,
    recorded_at: OnceLock<DateTime<Utc>>,
    // std::sync::Mutex is intentional: held briefly to take the sender,
    // never across .await points.
    responder: Mutex<Option<oneshot::Sender<Value>>>,
}

impl Event {
    /// Creates a new event on `channel` carrying `payload`.
    #[must_use]
    pub fn new(channel: Channel, payload: Value) -> Self {
        Self {
            channel,
            payload,
            broadcast: false,
            acknowledged: AtomicBool::new(false),
            response: OnceLock::new(),
            recorded_at: OnceLock::new(),
            responder: Mutex::new(None),
        }
    }

    /// Marks the event as a broadcast: delivery continues past the first
    /// acknowledging listener.
    #[must_use]
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Attaches a one-shot responder fired on [`respond`](Self::respond).
    #[must_use]
    pub fn with_responder(self, tx: oneshot::Sender<Value>) -> Self {
        *self
            .responder
            .lock()
            .expect("event responder lock poisoned") = Some(tx);
        self
    }

    /// The channel this event was published on.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// The event payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Whether this event is delivered to all listeners regardless of
    /// acknowledgement.
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    /// Whether a listener has acknowledged (or responded to) this event.
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Marks the event acknowledged without attaching a response.
    pub fn acknowledge(&self) {
        self.acknowledged.store(true, Ordering::SeqCst);
    }

    /// The response attached via [`respond`](Self::respond), if any.
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.response.get()
    }

    /// Attaches a response and acknowledges the event.
    ///
    /// Only the first response wins; later calls are ignored. The one-shot
    /// responder (if any) receives a clone of the winning value.
    pub fn respond(&self, value: Value) {
        if self.response.set(value.clone()).is_err() {
            return;
        }
        self.acknowledged.store(true, Ordering::SeqCst);
        let tx = self
            .responder
            .lock()
            .expect("event responder lock poisoned")
            .take();
        if let Some(tx) = tx {
            // The receiver may have timed out and gone away; nothing to do.
            let _ = tx.send(value);
        }
    }

    /// Stamps the capture timestamp. Only the first call takes effect.
    pub fn mark_recorded(&self) {
        let _ = self.recorded_at.set(Utc::now());
    }

    /// The capture timestamp, if the event has been recorded.
    #[must_use]
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded_at.get().copied()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("channel", &self.channel)
            .field("broadcast", &self.broadcast)
            .field("acknowledged", &self.is_acknowledged())
            .field("responded", &self.response.get().is_some())
            .finish_non_exhaustive()
    }
}
