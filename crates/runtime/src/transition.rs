//! Transition Controller - applies a column change to a task and its document
//!
//! A transition queues up to two actions on the task's document lane:
//! the interval edit (open when entering the clock column, close when
//! leaving it) and then the status-symbol rewrite. Both re-read the document
//! and re-anchor the task line, so a stale line hint is tolerated.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use taskboard_core::{
    BoardConfig, Document, IntervalAnnotator, StatusMapper, Task, TaskId, TaskStatus, locate,
    rewrite_symbol,
};
use taskboard_storage::{
    DocumentMutationQueue, MutationOutcome, MutationResult, MutationTicket, SharedDocumentStore,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{SystemTimeSource, TimeSource, format_timestamp};
use crate::command::{ClockAction, SharedTimeTrackingCommand};
use crate::notice::SharedNotifier;

/// Interval edit performed by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalEdit {
    Opened,
    Closed,
}

/// Result of one queued action
#[derive(Debug)]
pub struct MutationRecord {
    pub label: String,
    pub result: MutationResult,
}

/// What a transition did
#[derive(Debug)]
pub struct TransitionReport {
    pub task_id: TaskId,
    pub from: String,
    pub to: String,
    /// Whether the task was moved at all
    pub moved: bool,
    pub interval: Option<IntervalEdit>,
    /// Queued document actions, in execution order
    pub mutations: Vec<MutationRecord>,
}

impl TransitionReport {
    fn unmoved(task: &Task, from: &str, to: &str) -> Self {
        Self {
            task_id: task.id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            moved: false,
            interval: None,
            mutations: Vec::new(),
        }
    }

    /// Every queued action either applied or found nothing to change
    pub fn is_consistent(&self) -> bool {
        self.mutations.iter().all(|m| {
            matches!(
                m.result,
                Ok(MutationOutcome::Applied) | Ok(MutationOutcome::Unchanged)
            )
        })
    }

    /// Reasons of skipped actions
    pub fn skipped(&self) -> Vec<&str> {
        self.mutations
            .iter()
            .filter_map(|m| match &m.result {
                Ok(MutationOutcome::Skipped(reason)) => Some(reason.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Observer notified after a transition's actions settle
#[async_trait]
pub trait TransitionListener: Send + Sync {
    async fn on_transition(&self, report: &TransitionReport);
}

/// Where a queued action expects the task line
#[derive(Debug, Clone)]
struct LineTarget {
    path: String,
    description: String,
    hint: usize,
}

impl LineTarget {
    fn of(task: &Task) -> Self {
        Self {
            path: task.source_path.clone(),
            description: task.description.clone(),
            hint: task.line_number,
        }
    }
}

/// Column-change state machine
pub struct TransitionController {
    store: SharedDocumentStore,
    queue: Arc<DocumentMutationQueue>,
    time: Arc<dyn TimeSource>,
    notifier: SharedNotifier,
    command: Option<SharedTimeTrackingCommand>,
    /// Spawned command runs not yet awaited
    pending: Mutex<Vec<JoinHandle<()>>>,
    listeners: Vec<Arc<dyn TransitionListener>>,
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("queue", &self.queue)
            .field("has_command", &self.command.is_some())
            .field("listeners_count", &self.listeners.len())
            .finish()
    }
}

impl TransitionController {
    pub fn new(store: SharedDocumentStore, notifier: SharedNotifier) -> Self {
        Self {
            store,
            queue: Arc::new(DocumentMutationQueue::new()),
            time: Arc::new(SystemTimeSource),
            notifier,
            command: None,
            pending: Mutex::new(Vec::new()),
            listeners: Vec::new(),
        }
    }

    /// Share a mutation queue with other writers of the same documents
    pub fn with_queue(mut self, queue: Arc<DocumentMutationQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Run `command` instead of editing interval tokens
    pub fn with_command(mut self, command: SharedTimeTrackingCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn register_listener(&mut self, listener: Arc<dyn TransitionListener>) {
        self.listeners.push(listener);
    }

    pub fn queue(&self) -> &Arc<DocumentMutationQueue> {
        &self.queue
    }

    /// Move `task` from `source` to `target`, updating it in place.
    ///
    /// Returns once the queued document actions have settled. Nothing here
    /// fails: misses and write errors are reported in the returned report.
    pub async fn transition(
        &self,
        task: &mut Task,
        source: &str,
        target: &str,
        config: &BoardConfig,
    ) -> TransitionReport {
        if source == target {
            debug!("Task {} already in '{}'", task.id, target);
            return TransitionReport::unmoved(task, source, target);
        }

        if self.store.resolve(&task.source_path).await.is_none() {
            self.notifier.notify(&format!(
                "Document {} is not available; '{}' was not moved",
                task.source_path, task.description
            ));
            return TransitionReport::unmoved(task, source, target);
        }

        let entering = config.is_clock_column(target) && !config.is_clock_column(source);
        let leaving = config.is_clock_column(source) && !config.is_clock_column(target);

        let mut tickets = Vec::new();
        let mut interval = None;

        if config.auto_interval && (entering || leaving) {
            let edit = if entering {
                IntervalEdit::Opened
            } else {
                IntervalEdit::Closed
            };
            let timestamp = format_timestamp(self.time.now(), &config.timestamp_format);

            match &self.command {
                Some(command) => self.spawn_command(command.clone(), edit, task.clone()),
                None => tickets.push(self.enqueue_interval_edit(task, edit, &timestamp, config)),
            }

            match edit {
                IntervalEdit::Opened => {
                    task.is_clocked_in = true;
                    task.start_time = Some(timestamp);
                    task.end_time = None;
                }
                IntervalEdit::Closed => {
                    task.is_clocked_in = false;
                    task.end_time = Some(timestamp);
                }
            }
            interval = Some(edit);
        }

        let symbol = StatusMapper::new(config).column_to_symbol(target);
        task.column = target.to_string();
        task.status = TaskStatus::from_symbol(symbol, config);
        tickets.push(self.enqueue_symbol_rewrite(task, symbol));

        let mut mutations = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let label = ticket.label().to_string();
            mutations.push(MutationRecord {
                label,
                result: ticket.wait().await,
            });
        }

        let report = TransitionReport {
            task_id: task.id.clone(),
            from: source.to_string(),
            to: target.to_string(),
            moved: true,
            interval,
            mutations,
        };
        info!("Moved {} from '{}' to '{}'", task.id, source, target);

        for listener in &self.listeners {
            listener.on_transition(&report).await;
        }
        report
    }

    fn enqueue_interval_edit(
        &self,
        task: &Task,
        edit: IntervalEdit,
        timestamp: &str,
        config: &BoardConfig,
    ) -> MutationTicket {
        let annotator = IntervalAnnotator::from_config(config);
        let timestamp = timestamp.to_string();
        let (label, apply): (&str, LineEdit) = match edit {
            IntervalEdit::Opened => (
                "open interval",
                Box::new(move |lines: &mut Vec<String>, line: usize| {
                    annotator.open(lines, line, &timestamp).is_some()
                }),
            ),
            IntervalEdit::Closed => (
                "close interval",
                Box::new(move |lines: &mut Vec<String>, line: usize| {
                    annotator.close(lines, line, &timestamp).is_some()
                }),
            ),
        };

        let store = self.store.clone();
        let target = LineTarget::of(task);
        self.queue.enqueue(&task.source_path, label, move || {
            edit_document(store, target, apply)
        })
    }

    fn enqueue_symbol_rewrite(&self, task: &Task, symbol: char) -> MutationTicket {
        let apply: LineEdit = Box::new(move |lines: &mut Vec<String>, line: usize| {
            match rewrite_symbol(&lines[line], symbol) {
                Some(rewritten) if rewritten != lines[line] => {
                    lines[line] = rewritten;
                    true
                }
                _ => false,
            }
        });

        let store = self.store.clone();
        let target = LineTarget::of(task);
        self.queue.enqueue(&task.source_path, "rewrite status", move || {
            edit_document(store, target, apply)
        })
    }

    fn spawn_command(&self, command: SharedTimeTrackingCommand, edit: IntervalEdit, task: Task) {
        let action = match edit {
            IntervalEdit::Opened => ClockAction::In,
            IntervalEdit::Closed => ClockAction::Out,
        };
        let handle = tokio::spawn(async move {
            match command.run(action, &task).await {
                Ok(()) => debug!("{} command finished for {}", action, task.id),
                Err(e) => warn!("{} command failed for {}: {}", action, task.id, e),
            }
        });
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for spawned time-tracking commands, e.g. before process exit
    pub async fn wait_for_commands(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Time-tracking command task ended abnormally: {}", e);
            }
        }
    }
}

/// Edit applied to the located task line; returns whether anything changed
type LineEdit = Box<dyn FnOnce(&mut Vec<String>, usize) -> bool + Send>;

/// Read, re-anchor, edit and write back one document
async fn edit_document(store: SharedDocumentStore, target: LineTarget, apply: LineEdit) -> MutationResult {
    if store.resolve(&target.path).await.is_none() {
        warn!("Document {} disappeared before the edit", target.path);
        return Ok(MutationOutcome::Skipped(format!(
            "document {} not found",
            target.path
        )));
    }

    let content = store.read(&target.path).await?;
    let mut document = Document::parse(&content);

    let Some(line) = locate(&document.lines, &target.description, target.hint) else {
        warn!(
            "Task line for '{}' not found in {}, skipping edit",
            target.description, target.path
        );
        return Ok(MutationOutcome::Skipped(format!(
            "task line for '{}' not found",
            target.description
        )));
    };

    if !apply(&mut document.lines, line) {
        return Ok(MutationOutcome::Unchanged);
    }

    store.write(&target.path, &document.render()).await?;
    Ok(MutationOutcome::Applied)
}
