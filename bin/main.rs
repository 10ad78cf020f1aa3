//! Taskboard CLI Entry Point
//!
//! This binary provides the command-line interface for Taskboard.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = taskboard_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
