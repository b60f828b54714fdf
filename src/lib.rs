/// CommonMark inline parser
///
/// Turns the inline content of a block (a paragraph or heading line) into a
/// tree of text, code spans, raw HTML, emphasis, links and images. Emphasis
/// is resolved with a delimiter stack; the delimiter characters are pluggable
/// through [`DelimiterProcessor`].
pub mod ast;
pub mod delimiter;
pub mod error;
pub mod escaping;
pub mod parser;
pub mod patterns;
pub mod references;
pub mod scanner;
pub mod tree;

mod emphasis;
mod links;

pub use ast::Node;
pub use delimiter::{DelimiterProcessor, DelimiterRun, EmphasisProcessor, Flanking};
pub use error::ConfigError;
pub use parser::{InlineParser, InlineParserBuilder};
pub use references::{LinkReference, ReferenceMap};
pub use tree::{NodeId, NodeValue, Tree};

/// Parse inline text with the default parser.
///
/// Reference definitions at the start of `text` are collected and removed
/// first; the remainder is parsed as the content of one paragraph.
pub fn parse_inlines(text: &str) -> Vec<Node> {
    let mut references = ReferenceMap::new();
    let consumed = references.parse_definitions(text);

    let mut tree = Tree::new();
    let paragraph = tree.create(NodeValue::Paragraph);
    InlineParser::new().parse(&mut tree, paragraph, &text[consumed..], &references);
    tree.child_nodes(paragraph)
}
