//! Terminal rendering for board output

use chrono::Duration;
use serde::Serialize;
use std::fmt::Write;
use taskboard_runtime::{ColumnView, IntervalEdit, TrackedTime, TransitionReport};
use taskboard_storage::{MutationError, MutationOutcome};

/// Columns with their tasks, one task per line
pub fn board(columns: &[ColumnView]) -> String {
    let mut out = String::new();
    for column in columns {
        let clock = if column.is_clock_column { " (clock)" } else { "" };
        let _ = writeln!(
            out,
            "{} [{}]{} ({})",
            column.name,
            column.symbol,
            clock,
            column.tasks.len()
        );
        for task in &column.tasks {
            let _ = write!(out, "  {}  {}", task.id, task.description);
            if let Some(due) = &task.due_date {
                let _ = write!(out, "  due {}", due);
            }
            if task.is_clocked_in {
                match &task.start_time {
                    Some(start) => {
                        let _ = write!(out, "  clocked in since {}", start);
                    }
                    None => out.push_str("  clocked in"),
                }
            }
            let _ = writeln!(out, "  {}:{}", task.source_path, task.line_number + 1);
        }
    }
    out
}

/// Recorded intervals and their total
pub fn tracked(tracked: &TrackedTime) -> String {
    let mut out = String::new();
    for token in &tracked.intervals {
        let _ = writeln!(out, "{}", token);
    }
    let running = if tracked.running { " (running)" } else { "" };
    let _ = writeln!(out, "Total: {}{}", duration(tracked.total), running);
    out
}

/// `1h 05m` style duration
pub fn duration(d: Duration) -> String {
    let minutes = d.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// One queued action of a transition
#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub label: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Printable transition report
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub task_id: String,
    pub from: String,
    pub to: String,
    pub moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<&'static str>,
    pub actions: Vec<ActionView>,
}

impl From<&TransitionReport> for ReportView {
    fn from(report: &TransitionReport) -> Self {
        let actions = report
            .mutations
            .iter()
            .map(|m| {
                let (outcome, detail) = outcome(&m.result);
                ActionView {
                    label: m.label.clone(),
                    outcome,
                    detail,
                }
            })
            .collect();

        Self {
            task_id: report.task_id.to_string(),
            from: report.from.clone(),
            to: report.to.clone(),
            moved: report.moved,
            interval: report.interval.map(|edit| match edit {
                IntervalEdit::Opened => "opened",
                IntervalEdit::Closed => "closed",
            }),
            actions,
        }
    }
}

impl ReportView {
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        if !self.moved {
            let _ = writeln!(out, "Task {} not moved ({} -> {})", self.task_id, self.from, self.to);
            return out;
        }

        let _ = writeln!(out, "Moved {}: {} -> {}", self.task_id, self.from, self.to);
        if let Some(interval) = self.interval {
            let _ = writeln!(out, "  interval {}", interval);
        }
        for action in &self.actions {
            match &action.detail {
                Some(detail) => {
                    let _ = writeln!(out, "  {}: {} ({})", action.label, action.outcome, detail);
                }
                None => {
                    let _ = writeln!(out, "  {}: {}", action.label, action.outcome);
                }
            }
        }
        out
    }
}

fn outcome(result: &Result<MutationOutcome, MutationError>) -> (&'static str, Option<String>) {
    match result {
        Ok(MutationOutcome::Applied) => ("applied", None),
        Ok(MutationOutcome::Unchanged) => ("unchanged", None),
        Ok(MutationOutcome::Skipped(reason)) => ("skipped", Some(reason.clone())),
        Err(e) => ("failed", Some(e.to_string())),
    }
}
