//! Command-line interface: argument parsing and settings resolution.

pub mod args;
pub mod settings;

pub use args::{Cli, LogFormatArg};
pub use settings::Settings;
