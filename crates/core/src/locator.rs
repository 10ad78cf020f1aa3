//! Task Locator - re-anchor a task after its document drifted
//!
//! The indexed line number is tried first; otherwise the first task line
//! containing the description wins. Duplicate descriptions are not
//! disambiguated.

use tracing::debug;

use crate::line::is_task_line;

fn matches<S: AsRef<str>>(line: S, description: &str) -> bool {
    let line = line.as_ref();
    is_task_line(line) && line.contains(description)
}

/// Current line index of a task, or `None` when no line matches
pub fn locate<S: AsRef<str>>(lines: &[S], description: &str, hint: usize) -> Option<usize> {
    if let Some(line) = lines.get(hint) {
        if matches(line, description) {
            return Some(hint);
        }
    }

    // An empty description would match every task line
    if description.is_empty() {
        debug!("Empty description and stale hint {}, giving up", hint);
        return None;
    }

    let found = lines.iter().position(|line| matches(line, description));
    match found {
        Some(index) => debug!("Re-anchored task '{}' from line {} to {}", description, hint, index),
        None => debug!("Task '{}' not found (hint {})", description, hint),
    }
    found
}
