//! Task line grammar
//!
//! A task line is a list item followed by a single-character checkbox:
//! `- [ ] description #tag ⏫ 📅 2024-05-01`.

use regex::Regex;
use std::sync::OnceLock;

use crate::task::TaskPriority;

fn task_line_regex() -> &'static Regex {
    static TASK_LINE_RE: OnceLock<Regex> = OnceLock::new();
    TASK_LINE_RE.get_or_init(|| {
        Regex::new(r"^(\s*)([-*+]|\d+[.)])\s+\[(.)\](?:\s+(.*))?$").expect("valid task line regex")
    })
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"(?:^|\s)#([\w/-]+)").expect("valid tag regex"))
}

fn due_regex() -> &'static Regex {
    static DUE_RE: OnceLock<Regex> = OnceLock::new();
    DUE_RE.get_or_init(|| Regex::new(r"📅\s*(\d{4}-\d{2}-\d{2})").expect("valid due date regex"))
}

/// Signifiers that start the metadata tail of a task body
const METADATA_SIGNIFIERS: &[&str] = &["🔺", "⏫", "🔼", "🔽", "⏬", "📅", "⏳", "🛫", "➕", "✅", "❌", "🔁"];

const PRIORITY_SIGNIFIERS: &[(&str, TaskPriority)] = &[
    ("🔺", TaskPriority::Highest),
    ("⏫", TaskPriority::High),
    ("🔼", TaskPriority::Medium),
    ("🔽", TaskPriority::Low),
    ("⏬", TaskPriority::Lowest),
];

/// A parsed task line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    pub indent: String,
    pub bullet: String,
    pub symbol: char,
    pub body: String,
}

impl TaskLine {
    /// Description text: the body up to the first metadata signifier
    pub fn description(&self) -> &str {
        let end = METADATA_SIGNIFIERS
            .iter()
            .filter_map(|s| self.body.find(s))
            .min()
            .unwrap_or(self.body.len());
        self.body[..end].trim()
    }

    pub fn tags(&self) -> Vec<String> {
        tag_regex()
            .captures_iter(&self.body)
            .map(|c| c[1].to_string())
            .collect()
    }

    pub fn priority(&self) -> Option<TaskPriority> {
        PRIORITY_SIGNIFIERS
            .iter()
            .find(|(signifier, _)| self.body.contains(signifier))
            .map(|(_, priority)| *priority)
    }

    pub fn due_date(&self) -> Option<String> {
        due_regex().captures(&self.body).map(|c| c[1].to_string())
    }
}

/// Parse a line as a task line
pub fn parse_task_line(line: &str) -> Option<TaskLine> {
    let caps = task_line_regex().captures(line)?;
    let symbol = caps.get(3)?.as_str().chars().next()?;
    Some(TaskLine {
        indent: caps[1].to_string(),
        bullet: caps[2].to_string(),
        symbol,
        body: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

/// Whether the line carries the task checkbox syntax
pub fn is_task_line(line: &str) -> bool {
    task_line_regex().is_match(line)
}

/// Replace the checkbox symbol, leaving the rest of the line untouched
pub fn rewrite_symbol(line: &str, symbol: char) -> Option<String> {
    let caps = task_line_regex().captures(line)?;
    let range = caps.get(3)?.range();
    let mut out = String::with_capacity(line.len() + symbol.len_utf8());
    out.push_str(&line[..range.start]);
    out.push(symbol);
    out.push_str(&line[range.end..]);
    Some(out)
}

/// Leading whitespace of a line
pub fn leading_indent(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let task = parse_task_line("- [ ] Buy milk").unwrap();
        assert_eq!(task.indent, "");
        assert_eq!(task.bullet, "-");
        assert_eq!(task.symbol, ' ');
        assert_eq!(task.description(), "Buy milk");
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(parse_task_line("  * [x] done").unwrap().symbol, 'x');
        assert_eq!(parse_task_line("1. [/] numbered").unwrap().bullet, "1.");
        assert_eq!(parse_task_line("\t+ [-] dropped").unwrap().indent, "\t");
        assert_eq!(parse_task_line("- [ ]").unwrap().body, "");
    }

    #[test]
    fn test_non_task_lines() {
        assert!(parse_task_line("plain text").is_none());
        assert!(parse_task_line("- plain item").is_none());
        assert!(parse_task_line("[ ] no bullet").is_none());
        assert!(parse_task_line("- [] empty box").is_none());
        assert!(!is_task_line("    [clock::2024-01-01T09:00:00]"));
    }

    #[test]
    fn test_metadata() {
        let task =
            parse_task_line("- [ ] Write report #work #q2/plan ⏫ 📅 2024-05-01").unwrap();
        assert_eq!(task.description(), "Write report #work #q2/plan");
        assert_eq!(task.tags(), vec!["work", "q2/plan"]);
        assert_eq!(task.priority(), Some(TaskPriority::High));
        assert_eq!(task.due_date().as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_description_is_substring_of_line() {
        let line = "- [ ] Call Bob 🔽 📅 2024-02-02";
        let task = parse_task_line(line).unwrap();
        assert!(line.contains(task.description()));
        assert_eq!(task.priority(), Some(TaskPriority::Low));
    }

    #[test]
    fn test_rewrite_symbol() {
        assert_eq!(
            rewrite_symbol("  - [ ] Buy milk [x]", 'x').as_deref(),
            Some("  - [x] Buy milk [x]")
        );
        assert_eq!(rewrite_symbol("- [x] a", ' ').as_deref(), Some("- [ ] a"));
        assert_eq!(rewrite_symbol("- [ ] a", '✓').as_deref(), Some("- [✓] a"));
        assert!(rewrite_symbol("no task", 'x').is_none());
    }

    #[test]
    fn test_leading_indent() {
        assert_eq!(leading_indent("    - [ ] a"), "    ");
        assert_eq!(leading_indent("- [ ] a"), "");
    }
}
