/// Delimiter processors: per-character policies for pairing delimiter runs
use crate::patterns::{is_punctuation, is_whitespace};
use crate::tree::{NodeId, NodeValue, Tree};

/// How a run's neighbours decide whether it may open or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flanking {
    /// Open iff left-flanking, close iff right-flanking.
    Standard,
    /// A run flanked on both sides only opens after punctuation and only
    /// closes before punctuation, so `snake_case_words` stay literal.
    NoIntraword,
}

/// Pairing policy for one delimiter character.
///
/// Implementations are registered once per character on an
/// [`crate::InlineParser`] and shared read-only by every parse.
pub trait DelimiterProcessor: Send + Sync {
    /// Must not be one of `[`, `]`, `!`, `\`, `` ` ``, `<`, `&` or a line
    /// feed; the parser builder rejects those.
    fn delimiter_char(&self) -> char;

    /// Shortest run that is pushed onto the delimiter stack.
    fn min_delimiter_count(&self) -> usize;

    /// How many characters to consume from an opener and closer with the
    /// given remaining counts. The result is clamped to at least 1 and at
    /// most the smaller of the two counts.
    fn delimiter_use(&self, opener_count: usize, closer_count: usize) -> usize;

    /// Wrap the nodes between `opener` and `closer` once `delimiter_use`
    /// characters have been taken off both ends.
    fn process(&self, tree: &mut Tree, opener: NodeId, closer: NodeId, delimiter_use: usize);

    fn flanking(&self) -> Flanking {
        Flanking::Standard
    }
}

/// `*` and `_`: one character makes emphasis, two make strong emphasis.
#[derive(Debug, Clone, Copy)]
pub struct EmphasisProcessor {
    delimiter: char,
    flanking: Flanking,
}

impl EmphasisProcessor {
    pub fn asterisk() -> Self {
        EmphasisProcessor {
            delimiter: '*',
            flanking: Flanking::Standard,
        }
    }

    pub fn underscore() -> Self {
        EmphasisProcessor {
            delimiter: '_',
            flanking: Flanking::NoIntraword,
        }
    }
}

impl DelimiterProcessor for EmphasisProcessor {
    fn delimiter_char(&self) -> char {
        self.delimiter
    }

    fn min_delimiter_count(&self) -> usize {
        1
    }

    fn delimiter_use(&self, opener_count: usize, closer_count: usize) -> usize {
        if closer_count < 3 || opener_count < 3 {
            closer_count.min(opener_count)
        } else if closer_count.is_multiple_of(2) {
            2
        } else {
            1
        }
    }

    fn process(&self, tree: &mut Tree, opener: NodeId, closer: NodeId, delimiter_use: usize) {
        let value = if delimiter_use == 1 {
            NodeValue::Emphasis
        } else {
            NodeValue::Strong
        };
        tree.wrap_between(opener, closer, value);
    }

    fn flanking(&self) -> Flanking {
        self.flanking
    }
}

/// A scanned run of one delimiter character and what it may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRun {
    pub count: usize,
    pub can_open: bool,
    pub can_close: bool,
}

impl DelimiterRun {
    /// Classify a run from the characters around it. Callers pass `'\n'` for
    /// the start or end of the subject.
    pub fn classify(count: usize, before: char, after: char, flanking: Flanking) -> Self {
        let before_is_punctuation = is_punctuation(before);
        let before_is_whitespace = is_whitespace(before);
        let after_is_punctuation = is_punctuation(after);
        let after_is_whitespace = is_whitespace(after);

        let left_flanking = !after_is_whitespace
            && (!after_is_punctuation || before_is_whitespace || before_is_punctuation);
        let right_flanking = !before_is_whitespace
            && (!before_is_punctuation || after_is_whitespace || after_is_punctuation);

        let (can_open, can_close) = match flanking {
            Flanking::Standard => (left_flanking, right_flanking),
            Flanking::NoIntraword => (
                left_flanking && (!right_flanking || before_is_punctuation),
                right_flanking && (!left_flanking || after_is_punctuation),
            ),
        };

        DelimiterRun {
            count,
            can_open,
            can_close,
        }
    }
}
