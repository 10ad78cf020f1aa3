//! Document storage trait definition
//!
//! Abstract interface over the text documents tasks live in. Mutations
//! always read and write whole documents.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path outside of storage root: {0}")]
    OutsideRoot(String),

    #[error("Write rejected for {0}")]
    WriteRejected(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A resolved document reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    pub path: String,
}

/// Document storage collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve a path to a handle; `None` when the document does not exist
    async fn resolve(&self, path: &str) -> Option<DocumentHandle>;

    async fn read(&self, path: &str) -> Result<String, StorageError>;

    async fn write(&self, path: &str, content: &str) -> Result<(), StorageError>;

    /// Paths of every task-bearing document
    async fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Shared storage reference
pub type SharedDocumentStore = Arc<dyn DocumentStore>;
