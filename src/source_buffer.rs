use tracing::trace;

use crate::dom::char_to_byte_idx;
use crate::editor::{SourceEditor, SourceOptions};

/// Line based text buffer backing code mode in the terminal front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    lines: Vec<String>,
    line: usize,
    column: usize,
    line_wrapping: bool,
}

impl SourceBuffer {
    pub fn cursor(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    pub fn line_wrapping(&self) -> bool {
        self.line_wrapping
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines
            .get(line)
            .map(|text| text.chars().count())
            .unwrap_or(0)
    }

    fn clamp_column(&mut self) {
        self.column = self.column.min(self.line_len(self.line));
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let column = self.column;
        if let Some(text) = self.lines.get_mut(self.line) {
            let byte_idx = char_to_byte_idx(text, column);
            text.insert(byte_idx, ch);
            self.column += 1;
        }
    }

    pub fn insert_str(&mut self, text: &str) {
        for ch in text.chars().filter(|ch| *ch != '\r') {
            self.insert_char(ch);
        }
    }

    pub fn insert_newline(&mut self) {
        let column = self.column;
        let Some(text) = self.lines.get_mut(self.line) else {
            return;
        };
        let byte_idx = char_to_byte_idx(text, column);
        let tail = text.split_off(byte_idx);
        self.lines.insert(self.line + 1, tail);
        self.line += 1;
        self.column = 0;
    }

    /// Removes the character before the cursor, joining lines at column 0.
    pub fn backspace(&mut self) -> bool {
        if self.column > 0 {
            let column = self.column;
            if let Some(text) = self.lines.get_mut(self.line) {
                let start = char_to_byte_idx(text, column - 1);
                let end = char_to_byte_idx(text, column);
                text.replace_range(start..end, "");
                self.column -= 1;
                return true;
            }
            return false;
        }
        if self.line == 0 {
            return false;
        }
        let current = self.lines.remove(self.line);
        self.line -= 1;
        self.column = self.line_len(self.line);
        if let Some(previous) = self.lines.get_mut(self.line) {
            previous.push_str(&current);
        }
        true
    }

    /// Removes the character under the cursor, joining lines at line end.
    pub fn delete(&mut self) -> bool {
        let len = self.line_len(self.line);
        if self.column < len {
            let column = self.column;
            if let Some(text) = self.lines.get_mut(self.line) {
                let start = char_to_byte_idx(text, column);
                let end = char_to_byte_idx(text, column + 1);
                text.replace_range(start..end, "");
                return true;
            }
            return false;
        }
        if self.line + 1 >= self.lines.len() {
            return false;
        }
        let next = self.lines.remove(self.line + 1);
        if let Some(current) = self.lines.get_mut(self.line) {
            current.push_str(&next);
        }
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.column > 0 {
            self.column -= 1;
            return true;
        }
        if self.line == 0 {
            return false;
        }
        self.line -= 1;
        self.column = self.line_len(self.line);
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.column < self.line_len(self.line) {
            self.column += 1;
            return true;
        }
        if self.line + 1 >= self.lines.len() {
            return false;
        }
        self.line += 1;
        self.column = 0;
        true
    }

    pub fn move_up(&mut self) -> bool {
        if self.line == 0 {
            return false;
        }
        self.line -= 1;
        self.clamp_column();
        true
    }

    pub fn move_down(&mut self) -> bool {
        if self.line + 1 >= self.lines.len() {
            return false;
        }
        self.line += 1;
        self.clamp_column();
        true
    }

    pub fn move_to_line_start(&mut self) {
        self.column = 0;
    }

    pub fn move_to_line_end(&mut self) {
        self.column = self.line_len(self.line);
    }
}

fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized.split('\n').map(str::to_string).collect()
}

impl SourceEditor for SourceBuffer {
    fn create(initial: &str, options: &SourceOptions) -> Self {
        trace!(target: "pure_rte::source", len = initial.len(), "source buffer created");
        Self {
            lines: split_lines(initial),
            line: 0,
            column: 0,
            line_wrapping: options.line_wrapping,
        }
    }

    fn lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    fn replace(&mut self, text: &str) {
        self.lines = split_lines(text);
        self.line = self.line.min(self.lines.len().saturating_sub(1));
        self.clamp_column();
    }

    fn destroy(self) {
        trace!(target: "pure_rte::source", lines = self.lines.len(), "source buffer destroyed");
    }
}
