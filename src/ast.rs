/// Owned snapshot of an inline tree
use serde::{Deserialize, Serialize};

/// Inline content as plain nested values.
///
/// The parser works on the arena in [`crate::tree`]; this enum is what callers
/// get back once a span has been parsed, and what test fixtures are written in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    // Containers supplied by the block layer
    Document(Vec<Node>),
    Paragraph(Vec<Node>),
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    // Inline nodes
    Text(String),
    Code(String),        // Inline code span
    Emphasis(Vec<Node>), // <em> tag
    Strong(Vec<Node>),   // <strong> tag
    Link {
        destination: String,
        title: Option<String>,
        children: Vec<Node>,
    },
    Image {
        destination: String,
        title: Option<String>,
        alt_text: Vec<Node>, // Alt text can contain inline elements
    },
    SoftBreak,
    HardBreak,          // <br /> tag
    HtmlInline(String), // Raw HTML inline (passed through unchanged)
    /// Container produced by a custom delimiter processor
    Extension {
        name: String,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Heading { children, .. }
            | Node::Link { children, .. }
            | Node::Extension { children, .. } => children,
            Node::Image { alt_text, .. } => alt_text,
            _ => &[],
        }
    }

    /// Concatenated literal content, the way an image's alt attribute is built.
    /// Breaks become spaces; raw HTML is dropped.
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text(text) | Node::Code(text) => text.clone(),
            Node::SoftBreak | Node::HardBreak => " ".to_string(),
            Node::HtmlInline(_) => String::new(),
            _ => self.children().iter().map(Node::plain_text).collect(),
        }
    }
}
