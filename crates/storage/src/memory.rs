//! In-memory document storage
//!
//! Used by tests and embedders; can inject read latency and write failures.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::trait_::{DocumentHandle, DocumentStore, SharedDocumentStore, StorageError};

/// In-memory document storage
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<String, String>>,
    failing_writes: Mutex<HashSet<String>>,
    writes: Mutex<Vec<String>>,
    read_delay: Option<Duration>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read sleeps for `delay` before returning
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn with_document(self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: &str, content: &str) {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.insert(path.to_string(), content.to_string());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.remove(path)
    }

    /// Current content, bypassing latency injection
    pub fn content(&self, path: &str) -> Option<String> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.get(path).cloned()
    }

    /// Make writes to `path` fail (or succeed again)
    pub fn set_write_failure(&self, path: &str, fail: bool) {
        let mut failing = self.failing_writes.lock().unwrap_or_else(|e| e.into_inner());
        if fail {
            failing.insert(path.to_string());
        } else {
            failing.remove(path);
        }
    }

    /// Paths written so far, in write order
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn resolve(&self, path: &str) -> Option<DocumentHandle> {
        let documents = self.documents.lock().ok()?;
        documents.contains_key(path).then(|| DocumentHandle {
            path: path.to_string(),
        })
    }

    async fn read(&self, path: &str) -> Result<String, StorageError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        documents
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StorageError> {
        {
            let failing = self
                .failing_writes
                .lock()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            if failing.contains(path) {
                return Err(StorageError::WriteRejected(path.to_string()));
            }
        }

        let mut documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        documents.insert(path.to_string(), content.to_string());

        let mut writes = self
            .writes
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        writes.push(path.to_string());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(documents
            .keys()
            .filter(|path| path.ends_with(".md"))
            .cloned()
            .collect())
    }
}

/// Create a new shared in-memory document store
pub fn create_memory_store() -> SharedDocumentStore {
    Arc::new(MemoryDocumentStore::new())
}
