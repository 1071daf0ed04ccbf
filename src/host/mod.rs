//! Host-side runtime: the service registry and its bus wiring.
//!
//! A [`Host`] owns the bus, a registry of named [`Service`]s, and the
//! process stats provider. It reacts to two well-known channels on
//! behalf of its services: `config-change` broadcasts fan out to every
//! service's `configure` hook, and `service-unregister` requests remove
//! and stop the named service.

pub mod heartbeat;
pub mod stats;

pub use heartbeat::Heartbeat;
pub use stats::{ProcStats, RuntimeStats};

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::bus::{CONFIG_CHANGE, EventBus, SERVICE_UNREGISTER};
use crate::error::Result;

/// A named component with a start/stop lifecycle.
///
/// Services receive the host on start so they can reach the bus, the
/// registry, and the stats provider; implementations that keep a host
/// reference should hold a `Weak` to avoid keeping the registry alive
/// through its own entries.
pub trait Service: Send + Sync {
    /// Registry name, unique per host.
    fn name(&self) -> &str;

    /// Starts the service. Called once, during [`Host::install`].
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot come up; the host then
    /// removes it from the registry again.
    fn start(&self, host: &Arc<Host>) -> Result<()>;

    /// Stops the service and releases its bus subscriptions.
    fn stop(&self, host: &Arc<Host>);

    /// Applies a configuration change-set. Keys the service does not
    /// recognize are ignored. Default: no-op.
    fn configure(&self, _changes: &Map<String, Value>) {}
}

/// The host runtime: bus + registry + stats.
pub struct Host {
    bus: Arc<EventBus>,
    stats: Arc<dyn RuntimeStats>,
    services: DashMap<String, Arc<dyn Service>>,
}

impl Host {
    /// Creates a host around `bus` and wires its registry listeners.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, stats: Arc<dyn RuntimeStats>) -> Arc<Self> {
        let host = Arc::new(Self {
            bus,
            stats,
            services: DashMap::new(),
        });
        host.wire();
        host
    }

    /// The bus this host distributes events on.
    #[must_use]
    pub const fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The process stats provider.
    #[must_use]
    pub const fn stats(&self) -> &Arc<dyn RuntimeStats> {
        &self.stats
    }

    /// Registers `service` and starts it.
    ///
    /// # Errors
    ///
    /// Propagates the service's start failure; the registry entry is
    /// rolled back in that case.
    pub fn install(self: &Arc<Self>, service: Arc<dyn Service>) -> Result<()> {
        let name = service.name().to_string();
        self.services.insert(name.clone(), Arc::clone(&service));
        if let Err(e) = service.start(self) {
            self.services.remove(&name);
            return Err(e);
        }
        info!(service = %name, "service started");
        Ok(())
    }

    /// Snapshot of all registered services.
    #[must_use]
    pub fn services(&self) -> Vec<Arc<dyn Service>> {
        self.services.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Removes and stops the named service. Returns whether it existed.
    pub fn deregister(self: &Arc<Self>, name: &str) -> bool {
        match self.services.remove(name) {
            Some((_, service)) => {
                service.stop(self);
                info!(service = %name, "service deregistered");
                true
            }
            None => {
                debug!(service = %name, "deregister requested for unknown service");
                false
            }
        }
    }

    /// Stops and removes every registered service.
    pub fn shutdown(self: &Arc<Self>) {
        let names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        for name in names {
            self.deregister(&name);
        }
    }

    /// Subscribes the registry reactions to their channels.
    fn wire(self: &Arc<Self>) {
        let config_channel = self.bus.channel(CONFIG_CHANGE);
        let weak = Arc::downgrade(self);
        self.bus.subscribe(&config_channel, move |event| {
            let Some(host) = weak.upgrade() else { return };
            let Some(changes) = event.payload().as_object() else {
                warn!("config-change payload is not an object, ignoring");
                return;
            };
            for service in host.services() {
                service.configure(changes);
            }
        });

        let unregister_channel = self.bus.channel(SERVICE_UNREGISTER);
        let weak = Arc::downgrade(self);
        self.bus.subscribe(&unregister_channel, move |event| {
            let Some(host) = weak.upgrade() else { return };
            if let Some(name) = event.payload().get("service").and_then(Value::as_str) {
                host.deregister(name);
            }
        });
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("services", &self.services.len())
            .finish_non_exhaustive()
    }
}
