// Copyright (c) 2026 rezky_nightky

/// Submitted command lines plus the Up/Down recall cursor.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Records a trimmed, non-empty line unless it repeats the previous entry.
    /// The cursor always returns to the blank line.
    pub fn push(&mut self, line: &str) -> bool {
        let line = line.trim();
        let added = !line.is_empty() && self.entries.last().map(String::as_str) != Some(line);
        if added {
            self.entries.push(line.to_string());
        }
        self.cursor = self.entries.len();
        added
    }

    /// Older entry; stays on the first one.
    pub fn prev(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Newer entry, or the empty line once past the newest.
    pub fn next(&mut self) -> &str {
        self.cursor = (self.cursor + 1).min(self.entries.len());
        self.entries.get(self.cursor).map_or("", String::as_str)
    }
}
