//! In-process publish/subscribe bus.
//!
//! The dev console only *consumes* a bus; this module provides the host
//! side of that boundary: a channel registry that grows monotonically at
//! runtime, per-channel callback subscription, and synchronous or
//! detached delivery. Delivery within one channel happens in publish
//! order on the publishing thread; across channels there is no ordering
//! guarantee.

mod event;

pub use event::Event;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::trace;

/// Heartbeat signal published by the host on a fixed interval.
pub const APP_HEARTBEAT: &str = "app-heartbeat";
/// Structured log records forwarded from the tracing pipeline.
pub const LOGGING: &str = "logging";
/// Inbound HTTP requests from the host's front-end.
pub const HTTP_REQUEST: &str = "http-request";
/// Broadcast configuration change-sets.
pub const CONFIG_CHANGE: &str = "config-change";
/// Fire-and-forget service deregistration requests.
pub const SERVICE_UNREGISTER: &str = "service-unregister";

/// An interned channel identifier.
///
/// Channels are cheap to clone and compare; two [`Channel`]s are equal
/// when their names are equal, regardless of which bus interned them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Channel(Arc<str>);

impl Channel {
    /// The channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

/// Handle identifying one subscription, returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Arc<Event>) + Send + Sync>;

/// The bus itself: channel registry plus per-channel listener lists.
pub struct EventBus {
    channels: DashMap<String, Channel>,
    listeners: DashMap<Channel, Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus with no channels and no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Interns (and registers) a channel by name.
    ///
    /// Registration is monotonic: channels are never removed for the
    /// lifetime of the bus.
    #[must_use]
    pub fn channel(&self, name: &str) -> Channel {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel(Arc::from(name)))
            .clone()
    }

    /// All channels registered so far.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        self.channels.iter().map(|e| e.value().clone()).collect()
    }

    /// Total number of live subscriptions across all channels.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().map(|e| e.value().len()).sum()
    }

    /// Attaches `callback` to `channel` and returns its handle.
    ///
    /// Callbacks must be independently thread-safe: the bus invokes them
    /// from whichever thread publishes, and different channels may
    /// deliver concurrently.
    pub fn subscribe(
        &self,
        channel: &Channel,
        callback: impl Fn(&Arc<Event>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .entry(channel.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Detaches the subscription identified by `id` from `channel`.
    ///
    /// Unknown handles are ignored.
    pub fn unsubscribe(&self, channel: &Channel, id: SubscriptionId) {
        if let Some(mut entry) = self.listeners.get_mut(channel) {
            entry.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Publishes `event` synchronously on the calling thread.
    ///
    /// Listeners run in subscription order. For non-broadcast events,
    /// delivery stops after a listener acknowledges; broadcast events
    /// reach every listener. Returns the shared event so callers can
    /// inspect the attached response.
    pub fn publish(&self, event: Event) -> Arc<Event> {
        let event = Arc::new(event);
        self.deliver(&event);
        event
    }

    /// Publishes `event` on a detached thread (fire and forget).
    pub fn publish_async(self: &Arc<Self>, event: Event) {
        let bus = Arc::clone(self);
        let event = Arc::new(event);
        std::thread::spawn(move || bus.deliver(&event));
    }

    fn deliver(&self, event: &Arc<Event>) {
        // Snapshot the listener list so callbacks can subscribe or
        // unsubscribe without deadlocking against the shard lock.
        let callbacks: Vec<Callback> = self
            .listeners
            .get(event.channel())
            .map(|entry| entry.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        trace!(channel = %event.channel(), listeners = callbacks.len(), "delivering event");

        for callback in callbacks {
            callback(event);
            if !event.is_broadcast() && event.is_acknowledged() {
                break;
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.channels.len())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
