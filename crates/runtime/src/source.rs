//! Task sources
//!
//! The task source is the external index that knows where tasks live.
//! `MarkdownTaskSource` builds that index by scanning documents directly.

use async_trait::async_trait;
use std::sync::Arc;
use taskboard_core::{Document, RawTaskRecord, parse_task_line};
use taskboard_storage::{SharedDocumentStore, StorageError};
use thiserror::Error;
use tracing::{debug, warn};

/// Task source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Task source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Task source collaborator
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn get_tasks(&self) -> Result<Vec<RawTaskRecord>, SourceError>;
}

/// Shared task source reference
pub type SharedTaskSource = Arc<dyn TaskSource>;

/// Scans every document in a store for task lines
#[derive(Clone)]
pub struct MarkdownTaskSource {
    store: SharedDocumentStore,
}

impl std::fmt::Debug for MarkdownTaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownTaskSource").finish_non_exhaustive()
    }
}

impl MarkdownTaskSource {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self { store }
    }

    /// Task records found in one document
    pub fn scan_document(path: &str, content: &str) -> Vec<RawTaskRecord> {
        let document = Document::parse(content);
        document
            .lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                let task = parse_task_line(line)?;
                Some(RawTaskRecord {
                    id: None,
                    symbol: task.symbol,
                    description: task.description().to_string(),
                    source_path: path.to_string(),
                    line_number: index,
                    tags: task.tags(),
                    priority: task.priority(),
                    due_date: task.due_date(),
                    has_active_interval: false,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TaskSource for MarkdownTaskSource {
    async fn get_tasks(&self) -> Result<Vec<RawTaskRecord>, SourceError> {
        let paths = self.store.list().await?;
        let mut records = Vec::new();

        for path in paths {
            match self.store.read(&path).await {
                Ok(content) => records.extend(Self::scan_document(&path, &content)),
                Err(e) => warn!("Skipping {} while indexing tasks: {}", path, e),
            }
        }

        debug!("Indexed {} tasks", records.len());
        Ok(records)
    }
}

/// A fixed list of records
#[derive(Debug, Clone, Default)]
pub struct StaticTaskSource {
    records: Vec<RawTaskRecord>,
}

impl StaticTaskSource {
    pub fn new(records: Vec<RawTaskRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TaskSource for StaticTaskSource {
    async fn get_tasks(&self) -> Result<Vec<RawTaskRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
