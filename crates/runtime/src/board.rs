//! Board service
//!
//! Owns the configuration, the current task list and the collaborators, and
//! validates requests before they reach the Transition Controller.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use taskboard_core::{
    BoardConfig, Document, IntervalAnnotator, IntervalToken, Task, TaskStatus, locate,
    tracked_duration,
};
use taskboard_storage::{SharedDocumentStore, StorageError};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::command::{SharedTimeTrackingCommand, ShellTimeTrackingCommand};
use crate::ingest::TaskIngestion;
use crate::notice::SharedNotifier;
use crate::source::SharedTaskSource;
use crate::transition::{TransitionController, TransitionListener, TransitionReport};

/// Board request errors
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("No clock column is configured")]
    NoClockColumn,

    #[error("Task {0} is not clocked in")]
    NotClockedIn(String),

    #[error("Task line for {0} not found in its document")]
    TaskLineNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One column with its tasks
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub name: String,
    pub symbol: char,
    pub color: String,
    pub is_clock_column: bool,
    pub tasks: Vec<Task>,
}

/// Time recorded for one task
#[derive(Debug, Clone, Serialize)]
pub struct TrackedTime {
    pub intervals: Vec<IntervalToken>,
    #[serde(rename = "total_seconds", serialize_with = "serialize_seconds")]
    pub total: Duration,
    pub running: bool,
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

/// The board: configuration, tasks and collaborators
pub struct Board {
    config: BoardConfig,
    store: SharedDocumentStore,
    source: Option<SharedTaskSource>,
    ingestion: TaskIngestion,
    controller: TransitionController,
    time: Arc<dyn TimeSource>,
    tasks: RwLock<Vec<Task>>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("columns", &self.config.columns.len())
            .field("has_source", &self.source.is_some())
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Board {
    /// Build a board; a configured time-tracking command is wired in here
    pub fn new(
        config: BoardConfig,
        store: SharedDocumentStore,
        source: Option<SharedTaskSource>,
        notifier: SharedNotifier,
    ) -> Self {
        let config = config.normalize();
        let ingestion = TaskIngestion::new(store.clone(), notifier.clone());
        let mut controller = TransitionController::new(store.clone(), notifier);
        if let Some(command) = config.time_tracking_command.clone() {
            debug!("Using external time-tracking command '{}'", command.program);
            controller = controller.with_command(Arc::new(ShellTimeTrackingCommand::new(command)));
        }

        Self {
            config,
            store,
            source,
            ingestion,
            controller,
            time: Arc::new(SystemTimeSource),
            tasks: RwLock::new(Vec::new()),
        }
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.controller = self.controller.with_time_source(time.clone());
        self.time = time;
        self
    }

    pub fn with_command(mut self, command: SharedTimeTrackingCommand) -> Self {
        self.controller = self.controller.with_command(command);
        self
    }

    pub fn register_listener(&mut self, listener: Arc<dyn TransitionListener>) {
        self.controller.register_listener(listener);
    }

    /// Let spawned time-tracking commands finish
    pub async fn settle(&self) {
        self.controller.wait_for_commands().await;
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Rebuild the task list from the source; returns the number of tasks
    pub async fn refresh(&self) -> usize {
        let tasks = self
            .ingestion
            .ingest_from(self.source.as_deref(), &self.config)
            .await;
        let count = tasks.len();
        *self.tasks.write().await = tasks;
        count
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn task(&self, id: &str) -> Option<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    /// Tasks grouped by column, in configured order
    pub async fn columns(&self) -> Vec<ColumnView> {
        let tasks = self.tasks.read().await;
        let mut views: Vec<ColumnView> = Vec::with_capacity(self.config.columns.len());

        for column in &self.config.columns {
            if views.iter().any(|v| v.name == column.name) {
                continue;
            }
            views.push(ColumnView {
                name: column.name.clone(),
                symbol: column.symbol,
                color: column.color.clone(),
                is_clock_column: self.config.is_clock_column(&column.name),
                tasks: tasks
                    .iter()
                    .filter(|t| t.column == column.name)
                    .cloned()
                    .collect(),
            });
        }
        views
    }

    /// Move a task to `target`; `source` defaults to the task's current column
    pub async fn move_task(
        &self,
        id: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<TransitionReport, BoardError> {
        self.require_column(target)?;
        if let Some(source) = source {
            self.require_column(source)?;
        }

        let mut task = self
            .task(id)
            .await
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))?;
        let source = source.map(str::to_string).unwrap_or_else(|| task.column.clone());

        let report = self
            .controller
            .transition(&mut task, &source, target, &self.config)
            .await;

        let mut tasks = self.tasks.write().await;
        if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
        if !self.config.show_done {
            tasks.retain(|t| t.status != TaskStatus::Done);
        }
        Ok(report)
    }

    /// Move a task into the clock column
    pub async fn clock_in(&self, id: &str) -> Result<TransitionReport, BoardError> {
        let clock = self.config.clock_column().ok_or(BoardError::NoClockColumn)?;
        let clock = clock.name.clone();
        self.move_task(id, None, &clock).await
    }

    /// Move a clocked-in task out of the clock column, by default to the first column
    pub async fn clock_out(
        &self,
        id: &str,
        to: Option<&str>,
    ) -> Result<TransitionReport, BoardError> {
        let clock = self
            .config
            .clock_column()
            .ok_or(BoardError::NoClockColumn)?
            .name
            .clone();
        let task = self
            .task(id)
            .await
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))?;
        if task.column != clock && !task.is_clocked_in {
            return Err(BoardError::NotClockedIn(id.to_string()));
        }

        let target = match to {
            Some(target) => target.to_string(),
            None => self
                .config
                .columns
                .iter()
                .find(|c| c.name != clock)
                .map(|c| c.name.clone())
                .ok_or_else(|| BoardError::UnknownColumn(String::new()))?,
        };
        self.move_task(id, Some(&clock), &target).await
    }

    /// Intervals recorded below a task, read from its current document
    pub async fn tracked_time(&self, id: &str) -> Result<TrackedTime, BoardError> {
        let task = self
            .task(id)
            .await
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))?;

        let content = self.store.read(&task.source_path).await?;
        let document = Document::parse(&content);
        let line = locate(&document.lines, &task.description, task.line_number)
            .ok_or_else(|| BoardError::TaskLineNotFound(id.to_string()))?;

        let annotator = IntervalAnnotator::from_config(&self.config);
        let intervals: Vec<IntervalToken> = annotator
            .intervals(&document.lines, line)
            .into_iter()
            .map(|located| located.token)
            .collect();
        let running = intervals.iter().any(IntervalToken::is_open);
        let total = tracked_duration(
            &intervals,
            &self.config.timestamp_format,
            Some(self.time.now()),
        );

        info!("Task {} has {} intervals", id, intervals.len());
        Ok(TrackedTime {
            intervals,
            total,
            running,
        })
    }

    fn require_column(&self, name: &str) -> Result<(), BoardError> {
        match self.config.column(name) {
            Some(_) => Ok(()),
            None => Err(BoardError::UnknownColumn(name.to_string())),
        }
    }
}
