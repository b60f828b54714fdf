/// Inline parser: configuration, the per-call parse session and the dispatch loop
use crate::delimiter::{DelimiterProcessor, DelimiterRun, EmphasisProcessor};
use crate::emphasis::{Delimiter, DelimiterStack};
use crate::error::ConfigError;
use crate::escaping::{decode_entity, is_escapable, normalize_uri};
use crate::patterns::{
    AUTOLINK, DEFAULT_MAIN_PATTERN, EMAIL_AUTOLINK, ENTITY_HERE, HTML_TAG, INITIAL_SPACE,
    TICKS, TICKS_HERE, WHITESPACE, main_pattern_source,
};
use crate::references::ReferenceMap;
use crate::scanner::Scanner;
use crate::tree::{NodeId, NodeValue, Tree};
use regex::Regex;
use std::collections::HashMap;

/// Parses inline spans into a [`Tree`].
///
/// The parser itself is immutable once built: the processor table and the
/// literal-run pattern are shared by every call to [`InlineParser::parse`],
/// and all mutable state lives in a session created for that call.
pub struct InlineParser {
    processors: HashMap<char, Box<dyn DelimiterProcessor>>,
    main_pattern: Regex,
}

impl InlineParser {
    /// Parser with the built-in `*` and `_` processors.
    pub fn new() -> Self {
        let processors = builtin_processors()
            .into_iter()
            .map(|processor| (processor.delimiter_char(), processor))
            .collect();
        InlineParser {
            processors,
            main_pattern: DEFAULT_MAIN_PATTERN.clone(),
        }
    }

    pub fn builder() -> InlineParserBuilder {
        InlineParserBuilder::default()
    }

    pub fn processor(&self, delimiter: char) -> Option<&dyn DelimiterProcessor> {
        self.processors.get(&delimiter).map(|processor| processor.as_ref())
    }

    /// Parse `content` and append the resulting inlines to `block`.
    ///
    /// Leading and trailing spaces and control characters are trimmed from
    /// the span first. References are resolved against `references`, which
    /// must already hold every definition the span can use.
    pub fn parse(&self, tree: &mut Tree, block: NodeId, content: &str, references: &ReferenceMap) {
        let subject = content.trim_matches(|c: char| c <= ' ');
        log::trace!("parsing inline span of {} bytes", subject.len());
        Session::new(self, references, tree, block, subject).run();
    }
}

impl Default for InlineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers extra delimiter processors next to the built-ins.
#[derive(Default)]
pub struct InlineParserBuilder {
    processors: Vec<Box<dyn DelimiterProcessor>>,
}

impl InlineParserBuilder {
    pub fn delimiter_processor(mut self, processor: impl DelimiterProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Fails if two processors claim the same character, or if one claims a
    /// character the dispatch loop handles itself.
    pub fn build(self) -> Result<InlineParser, ConfigError> {
        let mut processors: HashMap<char, Box<dyn DelimiterProcessor>> = HashMap::new();
        for processor in builtin_processors().into_iter().chain(self.processors) {
            let delimiter = processor.delimiter_char();
            if RESERVED_CHARS.contains(&delimiter) {
                return Err(ConfigError::ReservedCharacter(delimiter));
            }
            if processors.contains_key(&delimiter) {
                return Err(ConfigError::DuplicateDelimiter(delimiter));
            }
            log::debug!("registered delimiter processor for {:?}", delimiter);
            processors.insert(delimiter, processor);
        }

        let main_pattern = Regex::new(&main_pattern_source(processors.keys().copied()))?;
        Ok(InlineParser {
            processors,
            main_pattern,
        })
    }
}

/// Characters dispatched before any delimiter processor is consulted
const RESERVED_CHARS: [char; 8] = ['\n', '\\', '`', '[', '!', ']', '<', '&'];

fn builtin_processors() -> Vec<Box<dyn DelimiterProcessor>> {
    vec![
        Box::new(EmphasisProcessor::asterisk()),
        Box::new(EmphasisProcessor::underscore()),
    ]
}

/// Mutable state of one parse call.
pub(crate) struct Session<'a> {
    pub(crate) parser: &'a InlineParser,
    pub(crate) references: &'a ReferenceMap,
    pub(crate) tree: &'a mut Tree,
    pub(crate) block: NodeId,
    pub(crate) scanner: Scanner,
    pub(crate) stack: DelimiterStack,
    /// Literal text not yet turned into a node
    pending_text: Option<String>,
}

impl<'a> Session<'a> {
    fn new(
        parser: &'a InlineParser,
        references: &'a ReferenceMap,
        tree: &'a mut Tree,
        block: NodeId,
        subject: &str,
    ) -> Self {
        Session {
            parser,
            references,
            tree,
            block,
            scanner: Scanner::new(subject),
            stack: DelimiterStack::default(),
            pending_text: None,
        }
    }

    fn run(&mut self) {
        while self.parse_inline() {}
        self.flush_text();
        self.process_delimiters(None);
    }

    /// Parse the next inline element. Returns false only at end of input.
    fn parse_inline(&mut self) -> bool {
        let Some(c) = self.scanner.peek() else {
            return false;
        };
        let parser = self.parser;

        let handled = match c {
            '\n' => self.parse_newline(),
            '\\' => self.parse_backslash(),
            '`' => self.parse_backticks(),
            '[' => self.parse_open_bracket(),
            '!' => self.parse_bang(),
            ']' => self.parse_close_bracket(),
            '<' => self.parse_autolink() || self.parse_html_tag(),
            '&' => self.parse_entity(),
            _ => match parser.processor(c) {
                Some(processor) => self.parse_delimiters(processor),
                None => self.parse_string(),
            },
        };

        if !handled {
            // A special character that turned out to mean nothing here
            self.scanner.bump();
            self.append_text(c.encode_utf8(&mut [0; 4]));
        }
        true
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        match &mut self.pending_text {
            Some(pending) => pending.push_str(text),
            None => self.pending_text = Some(text.to_string()),
        }
    }

    pub(crate) fn append_node(&mut self, node: NodeId) {
        self.flush_text();
        self.tree.append_child(self.block, node);
    }

    /// Text that must stay its own node, like a delimiter run or bracket.
    pub(crate) fn append_separate_text(&mut self, text: &str) -> NodeId {
        let node = self.tree.create(NodeValue::Text(text.to_string()));
        self.append_node(node);
        node
    }

    pub(crate) fn flush_text(&mut self) {
        if let Some(text) = self.pending_text.take() {
            let node = self.tree.create(NodeValue::Text(text));
            self.tree.append_child(self.block, node);
        }
    }

    /// Soft or hard line break, depending on the spaces before the newline.
    fn parse_newline(&mut self) -> bool {
        self.scanner.bump();
        self.flush_text();

        let hard = match self.tree.last_child(self.block) {
            Some(last) => self.strip_final_spaces(last) >= 2,
            None => false,
        };
        let node = self.tree.create(if hard {
            NodeValue::HardBreak
        } else {
            NodeValue::SoftBreak
        });
        self.append_node(node);

        // Leading spaces of the next line
        self.scanner.scan(&INITIAL_SPACE);
        true
    }

    fn strip_final_spaces(&mut self, node: NodeId) -> usize {
        let Some(text) = self.tree.text_mut(node) else {
            return 0;
        };
        let kept = text.trim_end_matches(' ').len();
        let spaces = text.len() - kept;
        text.truncate(kept);
        let emptied = spaces > 0 && text.is_empty();
        if emptied {
            self.tree.detach(node);
        }
        spaces
    }

    fn parse_backslash(&mut self) -> bool {
        self.scanner.bump();
        match self.scanner.peek() {
            Some('\n') => {
                self.scanner.bump();
                let node = self.tree.create(NodeValue::HardBreak);
                self.append_node(node);
            }
            Some(c) if is_escapable(c) => {
                self.scanner.bump();
                self.append_text(c.encode_utf8(&mut [0; 4]));
            }
            _ => self.append_text("\\"),
        }
        true
    }

    /// A code span, or the opening backticks as literal text when no run of
    /// the same length follows.
    fn parse_backticks(&mut self) -> bool {
        let Some(ticks) = self.scanner.scan(&TICKS_HERE).map(str::len) else {
            return false;
        };
        let after_open = self.scanner.pos();

        while let Some(run) = self.scanner.find(&TICKS).map(str::len) {
            if run == ticks {
                let content = self.scanner.slice(after_open..self.scanner.pos() - ticks);
                let node = self.tree.create(NodeValue::Code(code_span_literal(content)));
                self.append_node(node);
                return true;
            }
        }

        self.scanner.set_pos(after_open);
        self.append_text(&"`".repeat(ticks));
        true
    }

    fn parse_delimiters(&mut self, processor: &dyn DelimiterProcessor) -> bool {
        let Some(run) = self.scan_delimiters(processor) else {
            return false;
        };
        let delimiter = processor.delimiter_char();
        let start = self.scanner.pos();
        self.scanner.set_pos(start + run.count * delimiter.len_utf8());

        let literal = self.scanner.slice(start..self.scanner.pos()).to_string();
        let node = self.append_separate_text(&literal);
        self.stack.push(Delimiter::run(node, delimiter, run, start));
        true
    }

    /// Count the run at the cursor and classify it; the cursor is left where it was.
    fn scan_delimiters(&mut self, processor: &dyn DelimiterProcessor) -> Option<DelimiterRun> {
        let start = self.scanner.pos();
        let delimiter = processor.delimiter_char();

        let mut count = 0;
        while self.scanner.peek() == Some(delimiter) {
            count += 1;
            self.scanner.bump();
        }
        let after = self.scanner.peek().unwrap_or('\n');
        self.scanner.set_pos(start);

        if count < processor.min_delimiter_count() {
            return None;
        }
        let before = self.scanner.previous_char().unwrap_or('\n');
        Some(DelimiterRun::classify(count, before, after, processor.flanking()))
    }

    fn parse_autolink(&mut self) -> bool {
        if let Some(address) = self.scanner.scan(&EMAIL_AUTOLINK).map(strip_angle_brackets) {
            self.append_autolink(&format!("mailto:{address}"), address);
            true
        } else if let Some(uri) = self.scanner.scan(&AUTOLINK).map(strip_angle_brackets) {
            self.append_autolink(&uri, uri.clone());
            true
        } else {
            false
        }
    }

    fn append_autolink(&mut self, destination: &str, label: String) {
        let link = self.tree.create(NodeValue::Link {
            destination: normalize_uri(destination),
            title: None,
        });
        let text = self.tree.create(NodeValue::Text(label));
        self.tree.append_child(link, text);
        self.append_node(link);
    }

    fn parse_html_tag(&mut self) -> bool {
        match self.scanner.scan(&HTML_TAG).map(str::to_string) {
            Some(tag) => {
                let node = self.tree.create(NodeValue::HtmlInline(tag));
                self.append_node(node);
                true
            }
            None => false,
        }
    }

    fn parse_entity(&mut self) -> bool {
        match self.scanner.scan(&ENTITY_HERE).map(decode_entity) {
            Some(decoded) => {
                self.append_text(&decoded);
                true
            }
            None => false,
        }
    }

    /// A run of characters with no special meaning.
    fn parse_string(&mut self) -> bool {
        let parser = self.parser;
        match self.scanner.scan(&parser.main_pattern).map(str::to_string) {
            Some(text) => {
                self.append_text(&text);
                true
            }
            None => false,
        }
    }
}

fn strip_angle_brackets(matched: &str) -> String {
    matched[1..matched.len() - 1].to_string()
}

/// Collapse interior whitespace and drop one layer of surrounding spaces.
fn code_span_literal(content: &str) -> String {
    let collapsed = WHITESPACE.replace_all(content, " ");
    let literal: &str = &collapsed;
    let literal = literal.strip_prefix(' ').unwrap_or(literal);
    literal.strip_suffix(' ').unwrap_or(literal).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::delimiter::Flanking;

    fn parse(input: &str) -> Vec<Node> {
        let parser = InlineParser::new();
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        parser.parse(&mut tree, paragraph, input, &ReferenceMap::new());
        tree.child_nodes(paragraph)
    }

    fn text(literal: &str) -> Node {
        Node::Text(literal.to_string())
    }

    /// `~~` strikethrough, the usual extension example
    struct Tilde;

    impl DelimiterProcessor for Tilde {
        fn delimiter_char(&self) -> char {
            '~'
        }

        fn min_delimiter_count(&self) -> usize {
            2
        }

        fn delimiter_use(&self, opener_count: usize, closer_count: usize) -> usize {
            if opener_count >= 2 && closer_count >= 2 {
                2
            } else {
                0
            }
        }

        fn process(&self, tree: &mut Tree, opener: NodeId, closer: NodeId, _delimiter_use: usize) {
            tree.wrap_between(
                opener,
                closer,
                NodeValue::Extension {
                    name: "del".to_string(),
                },
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), vec![]);
        assert_eq!(parse("   \n "), vec![]);
    }

    #[test]
    fn literal_runs_merge_into_one_text_node() {
        assert_eq!(parse("hello world"), vec![text("hello world")]);
        assert_eq!(parse("a ! b & c < d"), vec![text("a ! b & c < d")]);
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(
            parse("foo  \nbar"),
            vec![text("foo"), Node::HardBreak, text("bar")]
        );
        assert_eq!(
            parse("foo \n   bar"),
            vec![text("foo"), Node::SoftBreak, text("bar")]
        );
        assert_eq!(
            parse("foo\\\nbar"),
            vec![text("foo"), Node::HardBreak, text("bar")]
        );
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(parse("\\*not emphasized*"), vec![text("*not emphasized*")]);
        assert_eq!(parse("\\a\\"), vec![text("\\a\\")]);
        assert_eq!(parse("\\[\\]"), vec![text("[]")]);
    }

    #[test]
    fn code_spans() {
        assert_eq!(parse("`a  b`"), vec![Node::Code("a b".to_string())]);
        assert_eq!(
            parse("`` foo ` bar ``"),
            vec![Node::Code("foo ` bar".to_string())]
        );
        assert_eq!(parse("`a\nb`"), vec![Node::Code("a b".to_string())]);
        assert_eq!(parse("``foo`"), vec![text("``foo`")]);
    }

    #[test]
    fn code_span_beats_emphasis() {
        assert_eq!(
            parse("*a `*` b*"),
            vec![Node::Emphasis(vec![
                text("a "),
                Node::Code("*".to_string()),
                text(" b"),
            ])]
        );
    }

    #[test]
    fn entities_decode_to_text() {
        assert_eq!(parse("&amp; &#35; &#0;"), vec![text("& # \u{FFFD}")]);
        assert_eq!(parse("&bogus; x"), vec![text("&bogus; x")]);
    }

    #[test]
    fn autolinks() {
        assert_eq!(
            parse("<me@example.com>"),
            vec![Node::Link {
                destination: "mailto:me@example.com".to_string(),
                title: None,
                children: vec![text("me@example.com")],
            }]
        );
        assert_eq!(
            parse("see <https://example.com/a b>"),
            vec![text("see <https://example.com/a b>")]
        );
    }

    #[test]
    fn raw_html_passes_through() {
        assert_eq!(
            parse("a <span class=\"x\">b</span>"),
            vec![
                text("a "),
                Node::HtmlInline("<span class=\"x\">".to_string()),
                text("b"),
                Node::HtmlInline("</span>".to_string()),
            ]
        );
    }

    #[test]
    fn custom_processor_wraps_content() {
        let parser = InlineParser::builder()
            .delimiter_processor(Tilde)
            .build()
            .unwrap();
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        parser.parse(&mut tree, paragraph, "a ~~b~~ c~d", &ReferenceMap::new());

        assert_eq!(
            tree.child_nodes(paragraph),
            vec![
                text("a "),
                Node::Extension {
                    name: "del".to_string(),
                    children: vec![text("b")],
                },
                text(" c~d"),
            ]
        );
    }

    #[test]
    fn duplicate_processor_is_a_configuration_error() {
        let result = InlineParser::builder()
            .delimiter_processor(EmphasisProcessor::asterisk())
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateDelimiter('*'))));
    }

    #[test]
    fn processor_for_a_dispatched_character_is_rejected() {
        /// Tilde pairing under another character
        struct Claims(char);

        impl DelimiterProcessor for Claims {
            fn delimiter_char(&self) -> char {
                self.0
            }

            fn min_delimiter_count(&self) -> usize {
                Tilde.min_delimiter_count()
            }

            fn delimiter_use(&self, opener_count: usize, closer_count: usize) -> usize {
                Tilde.delimiter_use(opener_count, closer_count)
            }

            fn process(&self, tree: &mut Tree, opener: NodeId, closer: NodeId, delimiter_use: usize) {
                Tilde.process(tree, opener, closer, delimiter_use)
            }
        }

        for reserved in RESERVED_CHARS {
            let result = InlineParser::builder()
                .delimiter_processor(Claims(reserved))
                .build();
            assert!(
                matches!(result, Err(ConfigError::ReservedCharacter(c)) if c == reserved),
                "{reserved:?} was accepted"
            );
        }
    }

    #[test]
    fn parser_and_references_are_shared_across_threads() {
        let parser = InlineParser::new();
        let mut references = ReferenceMap::new();
        references.parse_definition("[home]: /");

        let results: Vec<Vec<Node>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let (parser, references) = (&parser, &references);
                    scope.spawn(move || {
                        let mut tree = Tree::new();
                        let paragraph = tree.create(NodeValue::Paragraph);
                        parser.parse(&mut tree, paragraph, &format!("*{i}* [home]"), references);
                        tree.child_nodes(paragraph)
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        for (i, nodes) in results.iter().enumerate() {
            assert_eq!(nodes[0], Node::Emphasis(vec![text(&i.to_string())]));
            assert_eq!(
                nodes[2],
                Node::Link {
                    destination: "/".to_string(),
                    title: None,
                    children: vec![text("home")],
                }
            );
        }
    }

    #[test]
    fn builtin_flanking_rules() {
        let parser = InlineParser::new();
        assert_eq!(
            parser.processor('_').map(|p| p.flanking()),
            Some(Flanking::NoIntraword)
        );
        assert_eq!(
            parser.processor('*').map(|p| p.flanking()),
            Some(Flanking::Standard)
        );
        assert!(parser.processor('~').is_none());
    }
}
