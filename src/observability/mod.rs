//! Logging and metrics plumbing shared by the host and the console.

pub mod logging;
pub mod metrics;

pub use logging::{
    BusLayer, LOG_FORWARDER, LineFormatter, LogFormat, LogForwarder, LogFormatter, LogRecord,
    init_logging,
};
