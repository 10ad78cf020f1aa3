//! Taskboard Runtime - ingestion and transitions against live documents
//!
//! Responsibilities:
//! - Build the task list from a task source
//! - Apply column changes through the per-document mutation queue
//! - Board service for front ends
//!
//! Layout:
//! - source: task source collaborator and the markdown scanner
//! - ingest: Task Ingestion
//! - transition: Transition Controller and listeners
//! - board: request validation and task list ownership
//! - command / clock / notice: side collaborators

pub mod board;
pub mod clock;
pub mod command;
pub mod ingest;
pub mod notice;
pub mod source;
pub mod transition;

pub use board::{Board, BoardError, ColumnView, TrackedTime};
pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource, format_timestamp};
pub use command::{ClockAction, CommandError, SharedTimeTrackingCommand, ShellTimeTrackingCommand, TimeTrackingCommand};
pub use ingest::TaskIngestion;
pub use notice::{CollectingNotifier, LogNotifier, Notifier, SharedNotifier};
pub use source::{MarkdownTaskSource, SharedTaskSource, SourceError, StaticTaskSource, TaskSource};
pub use transition::{IntervalEdit, MutationRecord, TransitionController, TransitionListener, TransitionReport};
