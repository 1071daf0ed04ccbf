//! Bounded, newest-first history buffers.
//!
//! Two independent histories (events and formatted log lines) share one
//! eviction mutex. Inserting and reading are individually thread-safe,
//! but removing a variable number of tail entries is not: two threads
//! trimming toward the same target could over-evict. Every path that
//! shrinks a history — capacity eviction on insert and the bulk trim
//! after a reconfiguration — therefore serializes through `evict_lock`.
//! Readers take a snapshot copy and never block producers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::bus::Event;
use crate::observability::metrics;

/// Shared capture state: both histories plus the total-event counter.
pub struct Recorder {
    events: RwLock<VecDeque<Arc<Event>>>,
    logs: RwLock<VecDeque<String>>,
    total_events: AtomicU64,
    // Serializes tail eviction across both histories; never held across a
    // call into another component.
    evict_lock: Mutex<()>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            logs: RwLock::new(VecDeque::new()),
            total_events: AtomicU64::new(0),
            evict_lock: Mutex::new(()),
        }
    }

    /// Counts one delivered event, stored or not. Returns the new total.
    pub fn increment_total(&self) -> u64 {
        self.total_events.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Total events delivered since construction (heartbeats included).
    #[must_use]
    pub fn total_events(&self) -> u64 {
        self.total_events.load(Ordering::SeqCst)
    }

    /// Stamps `event` and inserts it at the front of event history,
    /// evicting from the back first whenever the insert would exceed
    /// `max`.
    pub fn push_event(&self, event: Arc<Event>, max: usize) {
        let _evict = self.evict_lock.lock().expect("evict lock poisoned");
        let mut events = self.events.write().expect("event history lock poisoned");
        if events.len() >= max {
            let surplus = events.len() - max + 1;
            for _ in 0..surplus {
                events.pop_back();
            }
            metrics::record_eviction("events", surplus as u64);
        }
        event.mark_recorded();
        events.push_front(event);
        metrics::set_history_len("events", events.len());
    }

    /// Inserts a formatted line at the front of log history with the
    /// same evict-before-insert rule against `max`.
    pub fn push_log(&self, line: String, max: usize) {
        let _evict = self.evict_lock.lock().expect("evict lock poisoned");
        let mut logs = self.logs.write().expect("log history lock poisoned");
        if logs.len() >= max {
            let surplus = logs.len() - max + 1;
            for _ in 0..surplus {
                logs.pop_back();
            }
            metrics::record_eviction("logs", surplus as u64);
        }
        logs.push_front(line);
        metrics::set_history_len("logs", logs.len());
    }

    /// Snapshot of event history, newest first.
    #[must_use]
    pub fn events_snapshot(&self) -> Vec<Arc<Event>> {
        self.events
            .read()
            .expect("event history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Snapshot of log history, newest first.
    #[must_use]
    pub fn logs_snapshot(&self) -> Vec<String> {
        self.logs
            .read()
            .expect("log history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Current event history length.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.read().expect("event history lock poisoned").len()
    }

    /// Current log history length.
    #[must_use]
    pub fn log_count(&self) -> usize {
        self.logs.read().expect("log history lock poisoned").len()
    }

    /// Trims both histories from the tail down to the given maxima.
    ///
    /// Runs after a reconfiguration; a history already within bounds is
    /// left untouched.
    pub fn trim(&self, max_events: usize, max_logs: usize) {
        let _evict = self.evict_lock.lock().expect("evict lock poisoned");
        {
            let mut events = self.events.write().expect("event history lock poisoned");
            if events.len() > max_events {
                let surplus = events.len() - max_events;
                events.truncate(max_events);
                metrics::record_eviction("events", surplus as u64);
                metrics::set_history_len("events", events.len());
            }
        }
        {
            let mut logs = self.logs.write().expect("log history lock poisoned");
            if logs.len() > max_logs {
                let surplus = logs.len() - max_logs;
                logs.truncate(max_logs);
                metrics::record_eviction("logs", surplus as u64);
                metrics::set_history_len("logs", logs.len());
            }
        }
    }

    /// Empties both histories. Counters keep their last value.
    pub fn clear(&self) {
        let _evict = self.evict_lock.lock().expect("evict lock poisoned");
        self.events
            .write()
            .expect("event history lock poisoned")
            .clear();
        self.logs.write().expect("log history lock poisoned").clear();
        metrics::set_history_len("events", 0);
        metrics::set_history_len("logs", 0);
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("events", &self.event_count())
            .field("logs", &self.log_count())
            .field("total_events", &self.total_events())
            .finish_non_exhaustive()
    }
}
