//! Line-split form of a document
//!
//! Mutations read the whole document, edit lines and write the whole
//! document back. `render(parse(text)) == text` for untouched documents.
//!
//! Every line keeps its own terminator, so files mixing `\n` and `\r\n`
//! split cleanly and render back byte for byte. Lines that survive an edit
//! keep their terminator; new lines take the one of the line before them.

/// A document split into lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub lines: Vec<String>,
    original: Vec<String>,
    endings: Vec<&'static str>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);

        let mut lines = Vec::new();
        let mut endings = Vec::new();
        if !text.is_empty() {
            let count = body.split('\n').count();
            for (index, piece) in body.split('\n').enumerate() {
                let last = index + 1 == count;
                if last && !trailing_newline {
                    lines.push(piece.to_string());
                    endings.push("");
                } else if let Some(stripped) = piece.strip_suffix('\r') {
                    lines.push(stripped.to_string());
                    endings.push("\r\n");
                } else {
                    lines.push(piece.to_string());
                    endings.push("\n");
                }
            }
        }

        let crlf = endings.iter().filter(|e| **e == "\r\n").count();
        let lf = endings.iter().filter(|e| **e == "\n").count();
        let line_ending = if crlf > lf { "\r\n" } else { "\n" };

        Self {
            original: lines.clone(),
            lines,
            endings,
            line_ending,
            trailing_newline,
        }
    }

    pub fn render(&self) -> String {
        let endings = self.current_endings();
        let mut out = String::new();
        for (line, ending) in self.lines.iter().zip(endings) {
            out.push_str(line);
            out.push_str(ending);
        }
        out
    }

    /// The dominant terminator, used when a line has no neighbour to copy
    pub fn line_ending(&self) -> &'static str {
        self.line_ending
    }

    /// Terminators for the current lines, aligned against the parsed lines
    /// by their unchanged prefix and suffix.
    fn current_endings(&self) -> Vec<&'static str> {
        let (new, old) = (&self.lines, &self.original);
        let shortest = new.len().min(old.len());
        let prefix = new
            .iter()
            .zip(old)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = new
            .iter()
            .rev()
            .zip(old.iter().rev())
            .take(shortest - prefix)
            .take_while(|(a, b)| a == b)
            .count();

        let mut endings: Vec<&'static str> = Vec::with_capacity(new.len());
        for index in 0..new.len() {
            let kept = if index < prefix {
                Some(self.endings[index])
            } else if index >= new.len() - suffix {
                Some(self.endings[old.len() - (new.len() - index)])
            } else {
                // Rewritten lines sit where old ones were
                (index < old.len() - suffix).then(|| self.endings[index])
            };
            let previous = endings.last().copied().unwrap_or(self.line_ending);
            endings.push(kept.unwrap_or(previous));
        }

        let count = endings.len();
        for (index, ending) in endings.iter_mut().enumerate() {
            let last = index + 1 == count;
            if last && !self.trailing_newline {
                *ending = "";
            } else if ending.is_empty() {
                *ending = self.line_ending;
            }
        }
        endings
    }
}
