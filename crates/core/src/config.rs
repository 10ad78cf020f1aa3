//! Board configuration
//!
//! Loaded from YAML and passed by value into every component call.
//! Malformed input degrades to defaults instead of failing.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A board column and the status symbol it persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub symbol: char,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Column {
    pub fn new(name: impl Into<String>, symbol: char, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol,
            color: color.into(),
        }
    }
}

fn default_color() -> String {
    "#8a8a8a".to_string()
}

/// External time-tracking command, run instead of editing the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTrackingCommandConfig {
    /// Program to execute
    pub program: String,

    /// Arguments for clocking in; `{path}`, `{line}` and `{description}` are substituted
    #[serde(default)]
    pub clock_in_args: Vec<String>,

    /// Arguments for clocking out
    #[serde(default)]
    pub clock_out_args: Vec<String>,
}

/// Board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Ordered column list
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,

    /// Column whose entry/exit opens/closes an interval
    #[serde(default = "default_clock_column")]
    pub clock_column: Option<String>,

    /// Open/close intervals automatically on clock column transitions
    #[serde(default = "default_true")]
    pub auto_interval: bool,

    /// chrono format string for interval timestamps
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Symbol treated as "in progress" when deriving task status
    #[serde(default = "default_in_progress_symbol")]
    pub in_progress_symbol: char,

    /// Keep done tasks on the board
    #[serde(default)]
    pub show_done: bool,

    /// Indentation for a new annotation line below an unindented task
    #[serde(default = "default_annotation_indent")]
    pub annotation_indent: String,

    /// Optional external time-tracking command
    #[serde(default)]
    pub time_tracking_command: Option<TimeTrackingCommandConfig>,
}

fn default_true() -> bool {
    true
}

fn default_columns() -> Vec<Column> {
    vec![
        Column::new("Todo", ' ', "#8a8a8a"),
        Column::new("Doing", '/', "#e0a526"),
        Column::new("Done", 'x', "#4caf50"),
    ]
}

fn default_clock_column() -> Option<String> {
    Some("Doing".to_string())
}

fn default_timestamp_format() -> String {
    "%Y-%m-%dT%H:%M:%S".to_string()
}

fn default_in_progress_symbol() -> char {
    '/'
}

fn default_annotation_indent() -> String {
    "    ".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            clock_column: default_clock_column(),
            auto_interval: true,
            timestamp_format: default_timestamp_format(),
            in_progress_symbol: default_in_progress_symbol(),
            show_done: false,
            annotation_indent: default_annotation_indent(),
            time_tracking_command: None,
        }
    }
}

impl BoardConfig {
    /// Parse YAML and normalize
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = serde_yaml::from_str(content)?;
        Ok(config.normalize())
    }

    /// Load a YAML file and normalize
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply fallbacks for malformed configuration.
    ///
    /// Duplicate column names are kept; lookups resolve to the first one.
    pub fn normalize(mut self) -> Self {
        if self.columns.is_empty() {
            warn!("No columns configured, using default columns");
            self.columns = default_columns();
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                warn!(
                    "Duplicate column name '{}', lookups use the first occurrence",
                    column.name
                );
            }
        }

        if let Some(clock) = &self.clock_column {
            if self.column(clock).is_none() {
                warn!("Clock column '{}' is not a configured column, disabling", clock);
                self.clock_column = None;
            }
        }

        if let Some(problem) = timestamp_format_problem(&self.timestamp_format) {
            warn!(
                "Timestamp format '{}' {}, using '{}'",
                self.timestamp_format,
                problem,
                default_timestamp_format()
            );
            self.timestamp_format = default_timestamp_format();
        }

        self
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The first configured column, the default bucket
    pub fn default_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    /// The clock column, when one is configured
    pub fn clock_column(&self) -> Option<&Column> {
        self.clock_column.as_deref().and_then(|name| self.column(name))
    }

    pub fn is_clock_column(&self, name: &str) -> bool {
        self.clock_column.as_deref() == Some(name)
    }
}

/// Why timestamps in `format` cannot live inside `[clock::start--end]`
fn timestamp_format_problem(format: &str) -> Option<&'static str> {
    if format.trim().is_empty() {
        return Some("is empty");
    }
    let mut sample = String::new();
    if write!(sample, "{}", NaiveDateTime::default().format(format)).is_err() {
        return Some("is not a valid strftime format");
    }
    if sample.contains("--") || sample.starts_with('-') || sample.ends_with('-') {
        return Some("produces '-' where it would be read as the interval separator");
    }
    if sample.contains(['[', ']']) {
        return Some("produces brackets");
    }
    None
}
