/// Brackets, links and images
use crate::emphasis::{Delimiter, DelimiterKind};
use crate::escaping::{normalize_uri, unescape};
use crate::parser::Session;
use crate::patterns::{LINK_DESTINATION, LINK_DESTINATION_BRACES, LINK_TITLE, SPNL};
use crate::references::LinkReference;
use crate::scanner::Scanner;
use crate::tree::NodeValue;

/// Longest label that can name a reference, brackets excluded
const MAX_LABEL_CHARS: usize = 999;

impl Session<'_> {
    pub(crate) fn parse_open_bracket(&mut self) -> bool {
        let start = self.scanner.pos();
        self.scanner.bump();
        let node = self.append_separate_text("[");
        self.stack.push(Delimiter::bracket(node, DelimiterKind::Bracket, start));
        true
    }

    /// `![` opens an image; a lone `!` is text.
    pub(crate) fn parse_bang(&mut self) -> bool {
        let start = self.scanner.pos();
        self.scanner.bump();
        if self.scanner.peek() == Some('[') {
            self.scanner.bump();
            let node = self.append_separate_text("![");
            self.stack.push(Delimiter::bracket(node, DelimiterKind::ImageBracket, start + 1));
        } else {
            self.append_text("!");
        }
        true
    }

    /// Try to close the nearest open bracket as a link or image.
    pub(crate) fn parse_close_bracket(&mut self) -> bool {
        self.scanner.bump();
        let after_bracket = self.scanner.pos();

        let opener = self
            .stack
            .iter()
            .find(|&id| self.stack[id].is_bracket() && !self.stack[id].matched);
        let Some(opener) = opener else {
            self.append_text("]");
            return true;
        };

        if !self.stack[opener].allowed {
            self.append_text("]");
            self.stack[opener].matched = true;
            return true;
        }

        let target = match self.inline_link() {
            Some(target) => Some(target),
            None => {
                self.scanner.set_pos(after_bracket);
                self.reference_link(opener, after_bracket)
            }
        };
        let Some(LinkReference { destination, title }) = target else {
            self.append_text("]");
            self.stack[opener].matched = true;
            self.scanner.set_pos(after_bracket);
            return true;
        };

        self.flush_text();
        let is_image = self.stack[opener].kind == DelimiterKind::ImageBracket;
        log::trace!(
            "resolved {} at {} to {:?}",
            if is_image { "image" } else { "link" },
            self.stack[opener].index,
            destination
        );
        let link = self.tree.create(if is_image {
            NodeValue::Image { destination, title }
        } else {
            NodeValue::Link { destination, title }
        });

        let opener_node = self.stack[opener].node;
        let mut current = self.tree.next_sibling(opener_node);
        while let Some(node) = current {
            current = self.tree.next_sibling(node);
            self.tree.append_child(link, node);
        }
        self.append_node(link);

        // Emphasis inside the brackets is resolved before the brackets go away
        self.process_delimiters(Some(opener));
        self.remove_delimiter_and_node(opener);

        if !is_image {
            self.stack.disallow_links();
        }
        true
    }

    /// `(destination "title")` right after the `]`.
    fn inline_link(&mut self) -> Option<LinkReference> {
        if self.scanner.peek() != Some('(') {
            return None;
        }
        self.scanner.bump();
        self.scanner.spnl();
        let destination = self.scanner.link_destination()?;
        self.scanner.spnl();

        // A title has to be separated from the destination by whitespace
        let title = if self.scanner.previous_char().is_some_and(char::is_whitespace) {
            let title = self.scanner.link_title();
            self.scanner.spnl();
            title
        } else {
            None
        };

        if self.scanner.peek() != Some(')') {
            return None;
        }
        self.scanner.bump();
        Some(LinkReference { destination, title })
    }

    /// `[label]`, `[]` or nothing after the `]`, looked up in the reference map.
    fn reference_link(&mut self, opener: usize, after_bracket: usize) -> Option<LinkReference> {
        self.scanner.spnl();
        let before_label = self.scanner.pos();
        let label_len = self.scanner.link_label();

        let label = if label_len > 2 {
            self.scanner
                .slice(before_label + 1..before_label + label_len - 1)
                .to_string()
        } else {
            // Collapsed or shortcut: the bracketed text is the label
            if label_len == 0 {
                self.scanner.set_pos(after_bracket);
            }
            let start = self.stack[opener].index + 1;
            self.scanner.slice(start..after_bracket - 1).to_string()
        };

        self.references.get(&label).cloned()
    }
}

impl Scanner {
    pub(crate) fn spnl(&mut self) {
        self.scan(&SPNL);
    }

    /// Destination in `<...>` or bare form. The bare form may be empty.
    pub(crate) fn link_destination(&mut self) -> Option<String> {
        if let Some(braced) = self.scan(&LINK_DESTINATION_BRACES) {
            let inner = &braced[1..braced.len() - 1];
            return Some(normalize_uri(&unescape(inner)));
        }
        let bare = self.scan(&LINK_DESTINATION)?;
        Some(normalize_uri(&unescape(bare)))
    }

    /// Quoted or parenthesized title, unescaped.
    pub(crate) fn link_title(&mut self) -> Option<String> {
        let title = self.scan(&LINK_TITLE)?;
        Some(unescape(&title[1..title.len() - 1]))
    }

    /// Byte length of the `[...]` label at the cursor, brackets included,
    /// or 0 when there is none. The cursor moves past a label that is found.
    pub(crate) fn link_label(&mut self) -> usize {
        let start = self.pos();
        let mut chars = self.remaining().char_indices();
        if !matches!(chars.next(), Some((_, '['))) {
            return 0;
        }

        let mut length = 0;
        let mut escaped = false;
        let mut end = None;
        for (offset, c) in chars {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '[' {
                break;
            } else if c == ']' {
                end = Some(offset + 1);
                break;
            }
            length += 1;
            if length > MAX_LABEL_CHARS {
                break;
            }
        }

        match end {
            Some(len) => {
                self.set_pos(start + len);
                len
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_label_lengths() {
        let mut scanner = Scanner::new("[foo] bar");
        assert_eq!(scanner.link_label(), 5);
        assert_eq!(scanner.pos(), 5);

        let mut scanner = Scanner::new("[]");
        assert_eq!(scanner.link_label(), 2);

        let mut scanner = Scanner::new(r"[a\]b]");
        assert_eq!(scanner.link_label(), 6);

        let mut scanner = Scanner::new("[a[b]");
        assert_eq!(scanner.link_label(), 0);
        assert_eq!(scanner.pos(), 0);

        let mut scanner = Scanner::new("[open");
        assert_eq!(scanner.link_label(), 0);
    }

    #[test]
    fn link_label_length_limit() {
        let long = format!("[{}]", "a".repeat(MAX_LABEL_CHARS));
        assert_eq!(Scanner::new(long.as_str()).link_label(), long.len());

        let too_long = format!("[{}]", "a".repeat(MAX_LABEL_CHARS + 1));
        assert_eq!(Scanner::new(too_long.as_str()).link_label(), 0);
    }

    #[test]
    fn destinations() {
        let mut scanner = Scanner::new("<my url>rest");
        assert_eq!(scanner.link_destination().as_deref(), Some("my%20url"));
        assert_eq!(scanner.remaining(), "rest");

        let mut scanner = Scanner::new(r"/a\*b(c) x");
        assert_eq!(scanner.link_destination().as_deref(), Some("/a*b(c)"));
        assert_eq!(scanner.remaining(), " x");

        let mut scanner = Scanner::new(")");
        assert_eq!(scanner.link_destination().as_deref(), Some(""));
        assert_eq!(scanner.pos(), 0);
    }

    #[test]
    fn titles() {
        for (input, expected) in [
            ("\"a \\\" b\"", "a \" b"),
            ("'single'", "single"),
            ("(paren)", "paren"),
            ("\"&amp;\"", "&"),
        ] {
            let mut scanner = Scanner::new(input);
            assert_eq!(scanner.link_title().as_deref(), Some(expected), "{input}");
        }
        assert_eq!(Scanner::new("\"open").link_title(), None);
    }
}
