//! Task model

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::config::BoardConfig;

/// Opaque task identifier, stable within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Derive an id from the source path and the line index the task was indexed at
    pub fn derive(source_path: &str, line_number: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(line_number.to_le_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Status derived from the persisted symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn from_symbol(symbol: char, config: &BoardConfig) -> Self {
        match symbol {
            'x' | 'X' => TaskStatus::Done,
            '-' => TaskStatus::Cancelled,
            s if s == config.in_progress_symbol => TaskStatus::InProgress,
            _ => TaskStatus::Todo,
        }
    }
}

/// Task priority signifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

/// A task record as delivered by the task source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTaskRecord {
    /// Id supplied by the source, if any
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: char,
    pub description: String,
    pub source_path: String,
    pub line_number: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<String>,
    /// Source reports an active interval on its own
    #[serde(default)]
    pub has_active_interval: bool,
}

/// A card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub column: String,
    pub status: TaskStatus,
    pub source_path: String,
    /// Last known line index; a hint, may be stale
    pub line_number: usize,
    pub tags: Vec<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub is_clocked_in: bool,
    /// Display-only cache of the last interval endpoints
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}
