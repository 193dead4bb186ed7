//! The parts of the screen that input states may touch: the log and the
//! input line.

use super::format::{LogLine, Tone};
use std::collections::VecDeque;
use unicode_width::UnicodeWidthStr;

/// Oldest lines are dropped past this many.
pub const MAX_LOG_LINES: usize = 5_000;

/// Single-line text editor with a cursor counted in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Screen columns taken by the text left of the cursor.
    #[must_use]
    pub fn cursor_column(&self) -> usize {
        self.text[..self.byte_index(self.cursor)].width()
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.text.char_indices().nth(chars).map_or(self.text.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Replaces the contents and moves the cursor to the end.
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.char_len();
    }

    /// Empties the buffer, returning what it held.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// Log lines plus the input line.
#[derive(Debug, Default)]
pub struct Surface {
    log: VecDeque<LogLine>,
    pub input: LineBuffer,
}

impl Surface {
    pub fn push(&mut self, line: LogLine) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = LogLine>) {
        for line in lines {
            self.push(line);
        }
    }

    /// Appends each line of `text` with `tone`.
    pub fn say(&mut self, tone: Tone, text: &str) {
        for line in text.lines() {
            self.push(LogLine::tone(tone, line));
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    #[must_use]
    pub const fn log(&self) -> &VecDeque<LogLine> {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_edits_at_cursor() {
        let mut buf = LineBuffer::default();
        for c in "héllo".chars() {
            buf.insert(c);
        }
        buf.left();
        buf.left();
        buf.backspace();
        assert_eq!(buf.text(), "hélo");
        buf.home();
        buf.delete();
        assert_eq!(buf.text(), "élo");
        buf.end();
        buf.insert('!');
        assert_eq!(buf.take(), "élo!");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn test_cursor_column_counts_wide_chars_twice() {
        let mut buf = LineBuffer::default();
        buf.set("ab한글");
        assert_eq!(buf.cursor(), 4);
        assert_eq!(buf.cursor_column(), 6);
        buf.left();
        assert_eq!(buf.cursor_column(), 4);
    }

    #[test]
    fn test_log_drops_oldest_lines() {
        let mut surface = Surface::default();
        for i in 0..=MAX_LOG_LINES {
            surface.push(LogLine::tone(Tone::Plain, i.to_string()));
        }
        assert_eq!(surface.log().len(), MAX_LOG_LINES);
        assert_eq!(surface.log()[0].plain_text(), "1");
    }

    #[test]
    fn test_say_splits_lines() {
        let mut surface = Surface::default();
        surface.say(Tone::Info, "one\ntwo");
        assert_eq!(surface.log().len(), 2);
    }
}
