//! Interval Annotator - time-tracking tokens below a task line
//!
//! Token grammar:
//! - open:   `[clock::<start>]`
//! - closed: `[clock::<start>--<end>]`
//!
//! The annotation run of a task is the contiguous block of lines directly
//! below it that consist only of whitespace-separated tokens. Nothing is
//! cached: every query re-reads the lines it is given.

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::debug;

use crate::config::BoardConfig;
use crate::line::leading_indent;

const INTERVAL_SEPARATOR: &str = "--";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(r"\[clock::([^\[\]]*)\]").expect("valid clock token regex"))
}

fn annotation_line_regex() -> &'static Regex {
    static ANNOTATION_RE: OnceLock<Regex> = OnceLock::new();
    ANNOTATION_RE.get_or_init(|| {
        Regex::new(r"^\s*\[clock::[^\[\]]*\](?:\s+\[clock::[^\[\]]*\])*\s*$")
            .expect("valid annotation line regex")
    })
}

/// One interval token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalToken {
    pub start: String,
    pub end: Option<String>,
}

impl IntervalToken {
    pub fn open(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
        }
    }

    /// Parse the inner text of a token (between `clock::` and `]`)
    fn from_content(content: &str) -> Self {
        match content.split_once(INTERVAL_SEPARATOR) {
            Some((start, end)) => Self {
                start: start.to_string(),
                end: Some(end.to_string()),
            },
            None => Self::open(content),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none() && !self.start.is_empty()
    }

    /// Elapsed time when both endpoints parse with `format`; open tokens use `now`
    pub fn duration(&self, format: &str, now: Option<NaiveDateTime>) -> Option<Duration> {
        let start = NaiveDateTime::parse_from_str(&self.start, format).ok()?;
        let end = match &self.end {
            Some(end) => NaiveDateTime::parse_from_str(end, format).ok()?,
            None => now?,
        };
        (end >= start).then(|| end - start)
    }
}

impl fmt::Display for IntervalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "[clock::{}{}{}]", self.start, INTERVAL_SEPARATOR, end),
            None => write!(f, "[clock::{}]", self.start),
        }
    }
}

/// Location of a token inside a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub line: usize,
    pub token: IntervalToken,
}

/// Whether a line consists only of interval tokens
pub fn is_annotation_line(line: &str) -> bool {
    annotation_line_regex().is_match(line)
}

/// Reads and writes interval tokens relative to a resolved task line
#[derive(Debug, Clone)]
pub struct IntervalAnnotator {
    fallback_indent: String,
}

impl Default for IntervalAnnotator {
    fn default() -> Self {
        Self::new("    ")
    }
}

impl IntervalAnnotator {
    pub fn new(fallback_indent: impl Into<String>) -> Self {
        Self {
            fallback_indent: fallback_indent.into(),
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.annotation_indent.clone())
    }

    /// Line range of the annotation run below `task_line`
    pub fn annotation_run<S: AsRef<str>>(&self, lines: &[S], task_line: usize) -> Range<usize> {
        let start = (task_line + 1).min(lines.len());
        let len = lines[start..]
            .iter()
            .take_while(|line| is_annotation_line(line.as_ref()))
            .count();
        start..start + len
    }

    /// Append an open token; returns the line it was written to.
    ///
    /// An existing open token is not checked for: opening twice yields two
    /// open tokens.
    pub fn open(&self, lines: &mut Vec<String>, task_line: usize, timestamp: &str) -> Option<usize> {
        if task_line >= lines.len() {
            return None;
        }

        let token = IntervalToken::open(timestamp);
        let run = self.annotation_run(lines.as_slice(), task_line);

        if run.is_empty() {
            let task_indent = leading_indent(&lines[task_line]);
            let indent = if task_indent.is_empty() {
                self.fallback_indent.as_str()
            } else {
                task_indent
            };
            let annotation = format!("{}{}", indent, token);
            let index = task_line + 1;
            lines.insert(index, annotation);
            debug!("Opened interval on new line {}", index);
            Some(index)
        } else {
            let index = run.end - 1;
            let appended = format!("{} {}", lines[index].trim_end(), token);
            lines[index] = appended;
            debug!("Opened interval on existing line {}", index);
            Some(index)
        }
    }

    /// Close the last open token in the run, rewriting it in place.
    ///
    /// Returns the token as it was before closing; `None` when nothing was open.
    pub fn close(&self, lines: &mut [String], task_line: usize, timestamp: &str) -> Option<LocatedToken> {
        let (line_index, range, token) = self.last_open(&*lines, task_line)?;

        let closed = IntervalToken {
            start: token.start.clone(),
            end: Some(timestamp.to_string()),
        };
        let line = &lines[line_index];
        let rewritten = format!("{}{}{}", &line[..range.start], closed, &line[range.end..]);
        lines[line_index] = rewritten;
        debug!("Closed interval on line {}", line_index);

        Some(LocatedToken {
            line: line_index,
            token,
        })
    }

    /// The last open token in the run, if any
    pub fn find_open<S: AsRef<str>>(&self, lines: &[S], task_line: usize) -> Option<LocatedToken> {
        self.last_open(lines, task_line)
            .map(|(line, _, token)| LocatedToken { line, token })
    }

    /// Every token in the run, in document order
    pub fn intervals<S: AsRef<str>>(&self, lines: &[S], task_line: usize) -> Vec<LocatedToken> {
        let run = self.annotation_run(lines, task_line);
        run.flat_map(|index| {
            token_regex()
                .captures_iter(lines[index].as_ref())
                .map(move |caps| LocatedToken {
                    line: index,
                    token: IntervalToken::from_content(&caps[1]),
                })
                .collect::<Vec<_>>()
        })
        .collect()
    }

    fn last_open<S: AsRef<str>>(
        &self,
        lines: &[S],
        task_line: usize,
    ) -> Option<(usize, Range<usize>, IntervalToken)> {
        let run = self.annotation_run(lines, task_line);
        for index in run.rev() {
            let line = lines[index].as_ref();
            let last = token_regex()
                .captures_iter(line)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let token = IntervalToken::from_content(&caps[1]);
                    token.is_open().then(|| (whole.range(), token))
                })
                .last();
            if let Some((range, token)) = last {
                return Some((index, range, token));
            }
        }
        None
    }
}

/// Sum of interval durations; tokens whose timestamps do not parse are skipped
pub fn tracked_duration<'a>(
    tokens: impl IntoIterator<Item = &'a IntervalToken>,
    format: &str,
    now: Option<NaiveDateTime>,
) -> Duration {
    tokens
        .into_iter()
        .filter_map(|token| token.duration(format, now))
        .fold(Duration::zero(), |acc, d| acc + d)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_annotation_line_shape() {
        assert!(is_annotation_line("[clock::2024-01-01T09:00:00]"));
        assert!(is_annotation_line("    [clock::a--b]  [clock::c]   "));
        assert!(!is_annotation_line(""));
        assert!(!is_annotation_line("text [clock::a]"));
        assert!(!is_annotation_line("[clock::a] trailing"));
        assert!(!is_annotation_line("- [ ] task"));
    }

    #[test]
    fn test_open_inserts_line_with_fallback_indent() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] Buy milk", "next"]);
        let index = annotator.open(&mut doc, 0, "t0").unwrap();
        assert_eq!(index, 1);
        assert_eq!(doc, lines(&["- [ ] Buy milk", "    [clock::t0]", "next"]));
    }

    #[test]
    fn test_open_uses_task_indent() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["  - [ ] nested"]);
        annotator.open(&mut doc, 0, "t0").unwrap();
        assert_eq!(doc[1], "  [clock::t0]");
    }

    #[test]
    fn test_open_appends_to_last_run_line() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&[
            "- [ ] task",
            "    [clock::a--b]",
            "    [clock::c--d]",
            "after",
        ]);
        let index = annotator.open(&mut doc, 0, "e").unwrap();
        assert_eq!(index, 2);
        assert_eq!(doc[2], "    [clock::c--d] [clock::e]");
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_open_out_of_bounds() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] task"]);
        assert!(annotator.open(&mut doc, 3, "t").is_none());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_open_then_close_round_trip() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] Buy milk"]);
        annotator.open(&mut doc, 0, "t0").unwrap();
        let closed = annotator.close(&mut doc, 0, "t1").unwrap();
        assert_eq!(closed.token.start, "t0");
        assert_eq!(doc[1].trim(), "[clock::t0--t1]");

        let tokens = annotator.intervals(&doc, 0);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token.to_string(), "[clock::t0--t1]");
    }

    #[test]
    fn test_close_rewrites_only_last_open_token() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&[
            "- [ ] task",
            "  [clock::a]  [clock::b--c]  [clock::d]  [clock::e--f]",
        ]);
        annotator.close(&mut doc, 0, "z").unwrap();
        assert_eq!(
            doc[1],
            "  [clock::a]  [clock::b--c]  [clock::d--z]  [clock::e--f]"
        );
    }

    #[test]
    fn test_close_searches_run_backwards() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] task", "[clock::a]", "[clock::b--c]"]);
        let closed = annotator.close(&mut doc, 0, "z").unwrap();
        assert_eq!(closed.line, 1);
        assert_eq!(doc[1], "[clock::a--z]");
        assert_eq!(doc[2], "[clock::b--c]");
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] task", "[clock::a--b]", "after"]);
        let before = doc.clone();
        assert!(annotator.close(&mut doc, 0, "z").is_none());
        assert_eq!(doc, before);

        let mut bare = lines(&["- [ ] task"]);
        assert!(annotator.close(&mut bare, 0, "z").is_none());
        assert_eq!(bare, lines(&["- [ ] task"]));
    }

    #[test]
    fn test_run_stops_at_first_non_annotation_line() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] task", "text", "[clock::a]"]);
        assert!(annotator.find_open(&doc, 0).is_none());
        assert!(annotator.close(&mut doc, 0, "z").is_none());
        assert_eq!(doc[2], "[clock::a]");
    }

    #[test]
    fn test_run_does_not_leak_into_next_task() {
        let annotator = IntervalAnnotator::default();
        let doc = lines(&["- [ ] one", "- [ ] two", "    [clock::a]"]);
        assert!(annotator.find_open(&doc, 0).is_none());
        assert_eq!(annotator.find_open(&doc, 1).map(|t| t.line), Some(2));
    }

    #[test]
    fn test_double_open_produces_two_tokens() {
        let annotator = IntervalAnnotator::default();
        let mut doc = lines(&["- [ ] task"]);
        annotator.open(&mut doc, 0, "a").unwrap();
        annotator.open(&mut doc, 0, "b").unwrap();
        assert_eq!(doc[1], "    [clock::a] [clock::b]");
        let open = annotator.find_open(&doc, 0).unwrap();
        assert_eq!(open.token.start, "b");
    }

    #[test]
    fn test_empty_token_is_not_open() {
        let annotator = IntervalAnnotator::default();
        let doc = lines(&["- [ ] task", "[clock::]"]);
        assert_eq!(annotator.annotation_run(&doc, 0), 1..2);
        assert!(annotator.find_open(&doc, 0).is_none());
    }

    #[test]
    fn test_tracked_duration() {
        let tokens = vec![
            IntervalToken {
                start: "2024-01-01T09:00:00".to_string(),
                end: Some("2024-01-01T10:30:00".to_string()),
            },
            IntervalToken {
                start: "garbage".to_string(),
                end: Some("2024-01-01T10:30:00".to_string()),
            },
            IntervalToken::open("2024-01-01T11:00:00"),
        ];
        let closed_only = tracked_duration(&tokens, FORMAT, None);
        assert_eq!(closed_only, Duration::minutes(90));

        let now = NaiveDateTime::parse_from_str("2024-01-01T11:15:00", FORMAT).unwrap();
        let with_running = tracked_duration(&tokens, FORMAT, Some(now));
        assert_eq!(with_running, Duration::minutes(105));
    }
}
