//! Taskboard Core - board/document reconciliation domain
//!
//! Contains:
//! - BoardConfig: columns, clock column, interval settings
//! - Task: board card model and raw task records
//! - StatusMapper: column <-> status symbol
//! - locate: task re-anchoring after document drift
//! - IntervalAnnotator: `[clock::...]` token parsing and writing
//! - Document / line: line codec and task line grammar

pub mod config;
pub mod document;
pub mod interval;
pub mod line;
pub mod locator;
pub mod status;
pub mod task;

pub use config::{BoardConfig, Column, ConfigError, TimeTrackingCommandConfig};
pub use document::Document;
pub use interval::{IntervalAnnotator, IntervalToken, LocatedToken, is_annotation_line, tracked_duration};
pub use line::{TaskLine, is_task_line, parse_task_line, rewrite_symbol};
pub use locator::locate;
pub use status::StatusMapper;
pub use task::{RawTaskRecord, Task, TaskId, TaskPriority, TaskStatus};
