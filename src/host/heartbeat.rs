//! Heartbeat ticker.
//!
//! Publishes an empty event on the `app-heartbeat` channel at a fixed
//! interval. The console (and anything else interested in periodic work)
//! keys its channel-discovery rescan off this signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::bus::{APP_HEARTBEAT, Event};
use crate::error::Result;
use crate::host::{Host, Service};

/// Granularity of the shutdown check while sleeping between ticks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Periodic heartbeat publisher.
pub struct Heartbeat {
    interval: Duration,
    running: Arc<AtomicBool>,
    // std::sync::Mutex: touched only at start/stop.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    /// Creates a ticker that fires every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }
}

impl Service for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn start(&self, host: &Arc<Host>) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let bus = Arc::clone(host.bus());
        let interval = self.interval;

        let handle = std::thread::spawn(move || {
            let channel = bus.channel(APP_HEARTBEAT);
            while running.load(Ordering::SeqCst) {
                bus.publish(Event::new(channel.clone(), Value::Null));
                let mut slept = Duration::ZERO;
                while slept < interval && running.load(Ordering::SeqCst) {
                    let step = SHUTDOWN_POLL.min(interval - slept);
                    std::thread::sleep(step);
                    slept += step;
                }
            }
            debug!("heartbeat stopped");
        });
        *self.handle.lock().expect("heartbeat handle lock poisoned") = Some(handle);
        Ok(())
    }

    fn stop(&self, _host: &Arc<Host>) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .expect("heartbeat handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
