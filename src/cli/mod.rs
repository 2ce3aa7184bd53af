//! Command-line interface helpers

pub mod commands;

pub use commands::{cmd_config, cmd_start, resolve_config, CliResult, StartOptions};
