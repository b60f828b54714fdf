/// Link reference definitions: `[label]: destination "title"`
use crate::escaping::normalize_label;
use crate::patterns::LINE_END;
use crate::scanner::Scanner;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Target of a link, whether written inline or defined by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub destination: String,
    pub title: Option<String>,
}

/// Definitions keyed by normalized label.
///
/// Build it completely before parsing inline content: lookups during a parse
/// only read it, so one map can serve any number of parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMap {
    definitions: HashMap<String, LinkReference>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        ReferenceMap {
            definitions: HashMap::new(),
        }
    }

    /// Record a definition. The first definition of a label wins; returns
    /// false if the label was already defined or normalizes to nothing.
    pub fn insert(&mut self, label: &str, reference: LinkReference) -> bool {
        let key = normalize_label(label);
        if key.is_empty() {
            return false;
        }
        match self.definitions.entry(key) {
            Entry::Occupied(entry) => {
                log::debug!("ignoring duplicate definition of [{}]", entry.key());
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(reference);
                true
            }
        }
    }

    /// Look up a label as written, without its brackets.
    pub fn get(&self, label: &str) -> Option<&LinkReference> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Parse one definition at the start of `input` and record it.
    ///
    /// Returns the number of bytes consumed, including the line end, or 0
    /// when `input` does not start with a definition.
    pub fn parse_definition(&mut self, input: &str) -> usize {
        let mut scanner = Scanner::new(input);

        let label_len = scanner.link_label();
        if label_len == 0 {
            return 0;
        }
        let label = &input[1..label_len - 1];
        if normalize_label(label).is_empty() {
            return 0;
        }

        if scanner.peek() != Some(':') {
            return 0;
        }
        scanner.bump();
        scanner.spnl();

        let before_destination = scanner.pos();
        let Some(destination) = scanner.link_destination() else {
            return 0;
        };
        if scanner.pos() == before_destination {
            return 0;
        }

        let before_title = scanner.pos();
        scanner.spnl();
        let title = if scanner.previous_char().is_some_and(char::is_whitespace)
            && let Some(title) = scanner.link_title()
            && scanner.scan(&LINE_END).is_some()
        {
            Some(title)
        } else {
            // No usable title: the destination has to end the line
            scanner.set_pos(before_title);
            if scanner.scan(&LINE_END).is_none() {
                return 0;
            }
            None
        };

        if self.insert(label, LinkReference { destination, title }) {
            log::trace!("defined reference [{}]", label);
        }
        scanner.pos()
    }

    /// Parse consecutive definitions at the start of `input`. Returns the
    /// number of bytes they occupy.
    pub fn parse_definitions(&mut self, input: &str) -> usize {
        let mut consumed = 0;
        while input[consumed..].starts_with('[') {
            let used = self.parse_definition(&input[consumed..]);
            if used == 0 {
                break;
            }
            consumed += used;
        }
        consumed
    }
}
