//! External time-tracking command
//!
//! When configured, clocking in or out runs a program instead of editing
//! interval tokens. The transition does not wait for it.

use async_trait::async_trait;
use std::sync::Arc;
use taskboard_core::{Task, TimeTrackingCommandConfig};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// External command errors
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Which side of an interval the command records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    In,
    Out,
}

impl std::fmt::Display for ClockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockAction::In => f.write_str("clock-in"),
            ClockAction::Out => f.write_str("clock-out"),
        }
    }
}

/// Time-tracking side effect invoked in place of text mutation
#[async_trait]
pub trait TimeTrackingCommand: Send + Sync {
    async fn run(&self, action: ClockAction, task: &Task) -> Result<(), CommandError>;
}

pub type SharedTimeTrackingCommand = Arc<dyn TimeTrackingCommand>;

/// Runs a configured program with task placeholders substituted
#[derive(Debug, Clone)]
pub struct ShellTimeTrackingCommand {
    config: TimeTrackingCommandConfig,
}

impl ShellTimeTrackingCommand {
    pub fn new(config: TimeTrackingCommandConfig) -> Self {
        Self { config }
    }

    /// Arguments for `action` with `{path}`, `{line}` and `{description}` filled in
    pub fn args(&self, action: ClockAction, task: &Task) -> Vec<String> {
        let template = match action {
            ClockAction::In => &self.config.clock_in_args,
            ClockAction::Out => &self.config.clock_out_args,
        };
        let line = task.line_number.to_string();
        template
            .iter()
            .map(|arg| {
                arg.replace("{path}", &task.source_path)
                    .replace("{line}", &line)
                    .replace("{description}", &task.description)
            })
            .collect()
    }
}

#[async_trait]
impl TimeTrackingCommand for ShellTimeTrackingCommand {
    async fn run(&self, action: ClockAction, task: &Task) -> Result<(), CommandError> {
        let program = &self.config.program;
        let args = self.args(action, task);
        debug!("Executing {}: {} {:?}", action, program, args);

        let output = Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
