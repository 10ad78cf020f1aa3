//! Filesystem document storage
//!
//! Documents are addressed by `/`-separated paths relative to a vault root.
//! Paths that would escape the root never resolve.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::trait_::{DocumentHandle, DocumentStore, StorageError};

/// Filesystem-backed document storage rooted at a vault directory
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative document path onto the root
    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(StorageError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(path: &str, source: std::io::Error) -> StorageError {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn resolve(&self, path: &str) -> Option<DocumentHandle> {
        let full = self.full_path(path).ok()?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Some(DocumentHandle {
                path: path.to_string(),
            }),
            _ => None,
        }
    }

    async fn read(&self, path: &str) -> Result<String, StorageError> {
        let full = self.full_path(path)?;
        fs::read_to_string(&full)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StorageError> {
        let full = self.full_path(path)?;
        fs::write(&full, content)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        debug!("Wrote {} bytes to {}", content.len(), full.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let base = search_base(&self.root);
        let pattern = glob_pattern(&base);
        let entries = glob::glob(&pattern).map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if let Some(relative) = relative_path(&base, &path) {
                        paths.push(relative);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// The root without `.` components, the form glob reports its matches in.
/// Empty when the root is the current directory.
fn search_base(root: &Path) -> PathBuf {
    root.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `**/*.md` under `base`, with glob metacharacters in `base` escaped
fn glob_pattern(base: &Path) -> String {
    let base = base.to_string_lossy();
    if base.is_empty() {
        return "**/*.md".to_string();
    }
    let escaped = glob::Pattern::escape(&base);
    if escaped.ends_with(std::path::MAIN_SEPARATOR) {
        format!("{}**/*.md", escaped)
    } else {
        format!("{}{}**{}*.md", escaped, std::path::MAIN_SEPARATOR, std::path::MAIN_SEPARATOR)
    }
}

/// `/`-separated path of `file` relative to `root`, skipping hidden entries
fn relative_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_string_lossy();
        if part.starts_with('.') {
            return None;
        }
        parts.push(part.to_string());
    }
    Some(parts.join("/"))
}
