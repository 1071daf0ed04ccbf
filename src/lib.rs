//! `devdeck` — embedded dev console for event-bus applications.
//!
//! The console subscribes to a host's in-process event bus, retains a
//! bounded newest-first history of events and log lines in memory, and
//! answers a small HTTP surface (`/dev-console/...`) with that history,
//! a live runtime snapshot, and limited remote control: retention and
//! UI-path reconfiguration plus component deregistration.

pub mod assets;
pub mod bus;
pub mod cli;
pub mod console;
pub mod error;
pub mod host;
pub mod http;
pub mod observability;
