//! Task Ingestion - builds board tasks from raw source records
//!
//! Two passes:
//! 1. Per record: column and status from the status symbol.
//! 2. Per task: re-anchor against the live document and let an open interval
//!    override whatever the symbol said.

use futures::future::join_all;
use std::collections::HashMap;
use taskboard_core::{
    BoardConfig, Document, IntervalAnnotator, RawTaskRecord, StatusMapper, Task, TaskId,
    TaskStatus, locate,
};
use taskboard_storage::SharedDocumentStore;
use tracing::{debug, warn};

use crate::notice::SharedNotifier;
use crate::source::TaskSource;

/// Builds the in-memory task list
#[derive(Clone)]
pub struct TaskIngestion {
    store: SharedDocumentStore,
    notifier: SharedNotifier,
}

impl std::fmt::Debug for TaskIngestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskIngestion").finish_non_exhaustive()
    }
}

impl TaskIngestion {
    pub fn new(store: SharedDocumentStore, notifier: SharedNotifier) -> Self {
        Self { store, notifier }
    }

    /// Symbol-derived task, before the live document is consulted
    pub fn task_from_record(record: RawTaskRecord, config: &BoardConfig) -> Task {
        let mapper = StatusMapper::new(config);
        let column = mapper.column_name(record.symbol);
        let on_clock_symbol = config
            .clock_column()
            .is_some_and(|clock| clock.symbol == record.symbol);

        let id = match record.id {
            Some(id) => TaskId(id),
            None => TaskId::derive(&record.source_path, record.line_number),
        };

        Task {
            id,
            description: record.description,
            column,
            status: TaskStatus::from_symbol(record.symbol, config),
            source_path: record.source_path,
            line_number: record.line_number,
            tags: record.tags,
            priority: record.priority,
            due_date: record.due_date,
            is_clocked_in: on_clock_symbol || record.has_active_interval,
            start_time: None,
            end_time: None,
        }
    }

    /// Build the ordered task list for `records`
    pub async fn ingest(&self, records: Vec<RawTaskRecord>, config: &BoardConfig) -> Vec<Task> {
        let mut tasks: Vec<Task> = records
            .into_iter()
            .map(|record| Self::task_from_record(record, config))
            .collect();

        let documents = self.read_documents(&tasks).await;
        let annotator = IntervalAnnotator::from_config(config);
        for task in tasks.iter_mut() {
            if let Some(document) = documents.get(&task.source_path) {
                reconcile(task, document, &annotator, config);
            }
        }

        let total = tasks.len();
        if !config.show_done {
            tasks.retain(|task| task.status != TaskStatus::Done);
        }
        debug!("Ingested {} tasks ({} shown)", total, tasks.len());
        tasks
    }

    /// Ingest from a task source; an absent or failing source yields no tasks
    pub async fn ingest_from(
        &self,
        source: Option<&dyn TaskSource>,
        config: &BoardConfig,
    ) -> Vec<Task> {
        let Some(source) = source else {
            self.notifier
                .notify("Task source is not available; the board is empty");
            return Vec::new();
        };

        match source.get_tasks().await {
            Ok(records) => self.ingest(records, config).await,
            Err(e) => {
                self.notifier
                    .notify(&format!("Could not load tasks: {}", e));
                Vec::new()
            }
        }
    }

    /// Read every referenced document once, concurrently
    async fn read_documents(&self, tasks: &[Task]) -> HashMap<String, Document> {
        let mut paths: Vec<&str> = tasks.iter().map(|t| t.source_path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();

        let reads = paths.iter().map(|path| async move {
            let result = self.store.read(path).await;
            (path.to_string(), result)
        });

        let mut documents = HashMap::new();
        for (path, result) in join_all(reads).await {
            match result {
                Ok(content) => {
                    documents.insert(path, Document::parse(&content));
                }
                Err(e) => warn!("Cannot read {} for interval state: {}", path, e),
            }
        }
        documents
    }
}

/// Apply live interval state from `document` to `task`
fn reconcile(task: &mut Task, document: &Document, annotator: &IntervalAnnotator, config: &BoardConfig) {
    let Some(line) = locate(&document.lines, &task.description, task.line_number) else {
        debug!(
            "'{}' not found in {}, keeping symbol state",
            task.description, task.source_path
        );
        return;
    };
    task.line_number = line;

    if let Some(open) = annotator.find_open(&document.lines, line) {
        if let Some(clock) = config.clock_column() {
            task.column = clock.name.clone();
        }
        task.is_clocked_in = true;
        task.start_time = Some(open.token.start);
        task.end_time = None;
        return;
    }

    task.is_clocked_in = false;
    if let Some(last) = annotator.intervals(&document.lines, line).pop() {
        task.start_time = Some(last.token.start);
        task.end_time = last.token.end;
    }
}
