//! Taskboard Interface - command-line front end
//!
//! Responsibilities:
//! - Argument parsing and configuration discovery
//! - Wiring the vault store, task source and board together
//! - Pretty and JSON output

pub mod cli;
pub mod render;


pub use cli::{CliConfig, CliError, OutputFormat, StderrNotifier, discover_config, run_cli, write_default_config};
