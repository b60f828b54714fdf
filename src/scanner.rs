/// A subject string with a byte cursor, scanned one construct at a time.
///
/// The cursor only ever sits on a character boundary: it moves by whole
/// characters or by the length of a regex match.
use regex::Regex;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct Scanner {
    subject: String,
    pos: usize,
}

impl Scanner {
    pub fn new(subject: impl Into<String>) -> Self {
        Scanner {
            subject: subject.into(),
            pos: 0,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        debug_assert!(self.subject.is_char_boundary(pos));
        self.pos = pos;
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.subject.len()
    }

    pub fn remaining(&self) -> &str {
        &self.subject[self.pos..]
    }

    pub fn slice(&self, range: Range<usize>) -> &str {
        &self.subject[range]
    }

    /// Character at the cursor, `None` at end of input.
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Character just before the cursor.
    pub fn previous_char(&self) -> Option<char> {
        self.subject[..self.pos].chars().next_back()
    }

    /// Consume one character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Match `pattern` at the cursor. On success the cursor moves past the
    /// match; otherwise it stays where it was.
    pub fn scan(&mut self, pattern: &Regex) -> Option<&str> {
        let start = self.pos;
        let found = pattern.find(&self.subject[start..])?;
        if found.start() != 0 {
            return None;
        }
        self.pos = start + found.end();
        Some(&self.subject[start..self.pos])
    }

    /// Search forward for `pattern` and move the cursor past the first match.
    pub fn find(&mut self, pattern: &Regex) -> Option<&str> {
        let start = self.pos;
        let found = pattern.find(&self.subject[start..])?;
        self.pos = start + found.end();
        Some(&self.subject[start + found.start()..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{SPNL, TICKS, TICKS_HERE};

    #[test]
    fn scanner_basics() {
        let mut scanner = Scanner::new("héllo");
        assert_eq!(scanner.peek(), Some('h'));
        assert_eq!(scanner.previous_char(), None);
        assert_eq!(scanner.bump(), Some('h'));
        assert_eq!(scanner.bump(), Some('é'));
        assert_eq!(scanner.pos(), 3);
        assert_eq!(scanner.previous_char(), Some('é'));
        assert_eq!(scanner.remaining(), "llo");
    }

    #[test]
    fn scan_is_anchored_and_restores_on_miss() {
        let mut scanner = Scanner::new("ab``c");
        assert_eq!(scanner.scan(&TICKS_HERE), None);
        assert_eq!(scanner.pos(), 0);

        scanner.set_pos(2);
        assert_eq!(scanner.scan(&TICKS_HERE), Some("``"));
        assert_eq!(scanner.pos(), 4);
    }

    #[test]
    fn find_skips_ahead_to_match() {
        let mut scanner = Scanner::new("x ` y ``");
        assert_eq!(scanner.find(&TICKS), Some("`"));
        assert_eq!(scanner.pos(), 3);
        assert_eq!(scanner.find(&TICKS), Some("``"));
        assert!(scanner.is_at_end());
        assert_eq!(scanner.find(&TICKS), None);
    }

    #[test]
    fn empty_match_does_not_move() {
        let mut scanner = Scanner::new("abc");
        assert_eq!(scanner.scan(&SPNL), Some(""));
        assert_eq!(scanner.pos(), 0);
    }

    #[test]
    fn peek_at_end_returns_none() {
        let mut scanner = Scanner::new("");
        assert!(scanner.is_at_end());
        assert_eq!(scanner.peek(), None);
        assert_eq!(scanner.bump(), None);
    }
}
