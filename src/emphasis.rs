/// Delimiter stack and emphasis resolution
use crate::delimiter::DelimiterRun;
use crate::parser::Session;
use crate::tree::NodeId;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelimiterKind {
    /// A run of a registered delimiter character
    Run(char),
    /// `[`
    Bracket,
    /// `![`
    ImageBracket,
}

/// One entry of the delimiter stack, tied to the text node holding its literal.
#[derive(Debug, Clone)]
pub(crate) struct Delimiter {
    pub(crate) node: NodeId,
    pub(crate) kind: DelimiterKind,
    /// Characters still available for pairing
    pub(crate) count: usize,
    pub(crate) can_open: bool,
    pub(crate) can_close: bool,
    /// Brackets: cleared once an enclosing link has been formed
    pub(crate) allowed: bool,
    /// Brackets: a `]` already tried this opener and failed
    pub(crate) matched: bool,
    /// Subject offset of the run, or of the `[` for brackets
    pub(crate) index: usize,
    previous: Option<usize>,
    next: Option<usize>,
}

impl Delimiter {
    pub(crate) fn run(node: NodeId, delimiter: char, run: DelimiterRun, index: usize) -> Self {
        Delimiter {
            node,
            kind: DelimiterKind::Run(delimiter),
            count: run.count,
            can_open: run.can_open,
            can_close: run.can_close,
            allowed: true,
            matched: false,
            index,
            previous: None,
            next: None,
        }
    }

    pub(crate) fn bracket(node: NodeId, kind: DelimiterKind, index: usize) -> Self {
        Delimiter {
            node,
            kind,
            count: 1,
            can_open: true,
            can_close: false,
            allowed: true,
            matched: false,
            index,
            previous: None,
            next: None,
        }
    }

    pub(crate) fn is_bracket(&self) -> bool {
        matches!(self.kind, DelimiterKind::Bracket | DelimiterKind::ImageBracket)
    }
}

/// Doubly linked stack of delimiters stored in a vector.
///
/// Entries are addressed by their index in `entries`. Removing an entry
/// unlinks it but leaves it in place, so indices stay valid for the whole
/// parse.
#[derive(Debug, Default)]
pub(crate) struct DelimiterStack {
    entries: Vec<Delimiter>,
    top: Option<usize>,
}

impl DelimiterStack {
    pub(crate) fn push(&mut self, mut delimiter: Delimiter) -> usize {
        let id = self.entries.len();
        delimiter.previous = self.top;
        delimiter.next = None;
        if let Some(top) = self.top {
            self.entries[top].next = Some(id);
        }
        self.entries.push(delimiter);
        self.top = Some(id);
        id
    }

    pub(crate) fn top(&self) -> Option<usize> {
        self.top
    }

    pub(crate) fn previous(&self, id: usize) -> Option<usize> {
        self.entries[id].previous
    }

    pub(crate) fn next(&self, id: usize) -> Option<usize> {
        self.entries[id].next
    }

    pub(crate) fn remove(&mut self, id: usize) {
        let (previous, next) = (self.entries[id].previous, self.entries[id].next);
        if let Some(previous) = previous {
            self.entries[previous].next = next;
        }
        match next {
            Some(next) => self.entries[next].previous = previous,
            None => self.top = previous,
        }
    }

    /// Walk from the top down.
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.top, |&id| self.entries[id].previous)
    }

    /// Links may not contain other links: every `[` still on the stack
    /// becomes inert once one link is formed.
    pub(crate) fn disallow_links(&mut self) {
        let mut current = self.top;
        while let Some(id) = current {
            let entry = &mut self.entries[id];
            if entry.kind == DelimiterKind::Bracket {
                entry.allowed = false;
            }
            current = entry.previous;
        }
    }
}

impl Index<usize> for DelimiterStack {
    type Output = Delimiter;

    fn index(&self, id: usize) -> &Delimiter {
        &self.entries[id]
    }
}

impl IndexMut<usize> for DelimiterStack {
    fn index_mut(&mut self, id: usize) -> &mut Delimiter {
        &mut self.entries[id]
    }
}

impl Session<'_> {
    /// Pair openers and closers above `stack_bottom`, innermost first, and
    /// leave the stack with `stack_bottom` on top.
    pub(crate) fn process_delimiters(&mut self, stack_bottom: Option<usize>) {
        // Lowest entry above the bottom
        let mut closer = self.stack.top().filter(|&top| Some(top) != stack_bottom);
        while let Some(id) = closer {
            let previous = self.stack.previous(id);
            if previous == stack_bottom {
                break;
            }
            closer = previous;
        }

        let parser = self.parser;
        while let Some(closer_id) = closer {
            let candidate = &self.stack[closer_id];
            let processor = match candidate.kind {
                DelimiterKind::Run(c) if candidate.can_close => parser.processor(c),
                _ => None,
            };
            let Some(processor) = processor else {
                closer = self.stack.next(closer_id);
                continue;
            };
            let Some(opener_id) =
                self.find_opener(closer_id, processor.delimiter_char(), stack_bottom)
            else {
                closer = self.stack.next(closer_id);
                continue;
            };

            let opener_count = self.stack[opener_id].count;
            let closer_count = self.stack[closer_id].count;
            let used = processor
                .delimiter_use(opener_count, closer_count)
                .clamp(1, opener_count.min(closer_count));

            self.stack[opener_id].count -= used;
            self.stack[closer_id].count -= used;
            let opener_node = self.stack[opener_id].node;
            let closer_node = self.stack[closer_id].node;
            self.consume_delimiter_chars(opener_node, used);
            self.consume_delimiter_chars(closer_node, used);

            self.remove_delimiters_between(opener_id, closer_id);
            log::trace!(
                "pairing {} {:?} delimiter(s) at {} and {}",
                used,
                processor.delimiter_char(),
                self.stack[opener_id].index,
                self.stack[closer_id].index
            );
            processor.process(self.tree, opener_node, closer_node, used);

            if self.stack[opener_id].count == 0 {
                self.remove_delimiter_and_node(opener_id);
            }
            if self.stack[closer_id].count == 0 {
                let next = self.stack.next(closer_id);
                self.remove_delimiter_and_node(closer_id);
                closer = next;
            }
        }

        while let Some(top) = self.stack.top() {
            if Some(top) == stack_bottom {
                break;
            }
            self.remove_delimiter_keep_node(top);
        }
    }

    fn find_opener(
        &self,
        closer: usize,
        delimiter: char,
        stack_bottom: Option<usize>,
    ) -> Option<usize> {
        let mut current = self.stack.previous(closer);
        while let Some(id) = current {
            if Some(id) == stack_bottom {
                return None;
            }
            let candidate = &self.stack[id];
            if candidate.kind == DelimiterKind::Run(delimiter) && candidate.can_open {
                return Some(id);
            }
            current = self.stack.previous(id);
        }
        None
    }

    fn consume_delimiter_chars(&mut self, node: NodeId, count: usize) {
        if let Some(literal) = self.tree.text_mut(node) {
            for _ in 0..count {
                literal.pop();
            }
        }
    }

    fn remove_delimiters_between(&mut self, opener: usize, closer: usize) {
        let mut current = self.stack.previous(closer);
        while let Some(id) = current {
            if id == opener {
                break;
            }
            let previous = self.stack.previous(id);
            self.remove_delimiter_keep_node(id);
            current = previous;
        }
    }

    /// Drop a used-up delimiter together with its text node, merging the
    /// text on either side of it.
    pub(crate) fn remove_delimiter_and_node(&mut self, id: usize) {
        let node = self.stack[id].node;
        if let (Some(previous), Some(next)) = (self.previous_text(id), self.next_text(id)) {
            self.merge_into(previous, next);
        }
        self.tree.detach(node);
        self.stack.remove(id);
    }

    /// Demote a delimiter to plain text, merging its node with adjacent text.
    pub(crate) fn remove_delimiter_keep_node(&mut self, id: usize) {
        let node = self.stack[id].node;
        if let Some(previous) = self.previous_text(id) {
            let literal = self.tree.text(previous).unwrap_or_default().to_string();
            if let Some(own) = self.tree.text_mut(node) {
                own.insert_str(0, &literal);
            }
            self.tree.detach(previous);
        }
        if let Some(next) = self.next_text(id) {
            self.merge_into(node, next);
        }
        self.stack.remove(id);
    }

    /// Append the literal of `next` to `node` and drop `next`.
    fn merge_into(&mut self, node: NodeId, next: NodeId) {
        let literal = self.tree.text(next).unwrap_or_default().to_string();
        if let Some(own) = self.tree.text_mut(node) {
            own.push_str(&literal);
        }
        self.tree.detach(next);
    }

    /// Text node right before the delimiter's node, unless it belongs to the
    /// delimiter below it on the stack.
    fn previous_text(&self, id: usize) -> Option<NodeId> {
        let sibling = self.tree.previous_sibling(self.stack[id].node)?;
        let owned_by_neighbour = self
            .stack
            .previous(id)
            .is_some_and(|below| self.stack[below].node == sibling);
        (self.tree.is_text(sibling) && !owned_by_neighbour).then_some(sibling)
    }

    fn next_text(&self, id: usize) -> Option<NodeId> {
        let sibling = self.tree.next_sibling(self.stack[id].node)?;
        let owned_by_neighbour = self
            .stack
            .next(id)
            .is_some_and(|above| self.stack[above].node == sibling);
        (self.tree.is_text(sibling) && !owned_by_neighbour).then_some(sibling)
    }
}
