/// Arena-backed node tree used while parsing
///
/// Nodes are addressed by [`NodeId`]; parent and sibling links are ids too,
/// so moving a run of siblings under a new link or emphasis node is just a
/// handful of index updates. Detached nodes stay in the arena but are no
/// longer reachable from any container.
use crate::ast::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Payload of a tree node. Children live in the tree, not in the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Document,
    Paragraph,
    Heading { level: u8 },
    Text(String),
    Code(String),
    HtmlInline(String),
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },
    Extension { name: String },
}

#[derive(Debug, Clone)]
struct Slot {
    value: NodeValue,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    previous: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Slot>,
}

impl Tree {
    pub fn new() -> Self {
        Tree { slots: Vec::new() }
    }

    /// Allocate a detached node.
    pub fn create(&mut self, value: NodeValue) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            previous: None,
            next: None,
        });
        id
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.slots[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.slots[id.0].value
    }

    /// Literal of a `Text` node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id.0].value {
            NodeValue::Text(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.slots[id.0].value {
            NodeValue::Text(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slots[id.0].value, NodeValue::Text(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].next
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].previous
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.slots[parent.0].last_child;
        {
            let slot = &mut self.slots[child.0];
            slot.parent = Some(parent);
            slot.previous = last;
            slot.next = None;
        }
        match last {
            Some(last) => self.slots[last.0].next = Some(child),
            None => self.slots[parent.0].first_child = Some(child),
        }
        self.slots[parent.0].last_child = Some(child);
    }

    /// Insert `node` directly after `anchor` under the same parent.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.detach(node);
        let next = self.slots[anchor.0].next;
        let parent = self.slots[anchor.0].parent;
        {
            let slot = &mut self.slots[node.0];
            slot.parent = parent;
            slot.previous = Some(anchor);
            slot.next = next;
        }
        self.slots[anchor.0].next = Some(node);
        match next {
            Some(next) => self.slots[next.0].previous = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.0].last_child = Some(node);
                }
            }
        }
    }

    /// Unlink a node from its parent and siblings. Its own children stay attached.
    pub fn detach(&mut self, id: NodeId) {
        let slot = &self.slots[id.0];
        let (parent, previous, next) = (slot.parent, slot.previous, slot.next);

        match previous {
            Some(previous) => self.slots[previous.0].next = next,
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.slots[next.0].previous = previous,
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.0].last_child = previous;
                }
            }
        }

        let slot = &mut self.slots[id.0];
        slot.parent = None;
        slot.previous = None;
        slot.next = None;
    }

    /// Move every sibling strictly between `start` and `end` into a new node
    /// carrying `value`, placed right after `start`.
    pub fn wrap_between(&mut self, start: NodeId, end: NodeId, value: NodeValue) -> NodeId {
        let wrapper = self.create(value);
        let mut current = self.next_sibling(start);
        while let Some(node) = current {
            if node == end {
                break;
            }
            current = self.next_sibling(node);
            self.append_child(wrapper, node);
        }
        self.insert_after(start, wrapper);
        wrapper
    }

    /// Owned snapshot of `id` and everything below it.
    pub fn to_node(&self, id: NodeId) -> Node {
        self.snapshot(id, self.child_nodes(id))
    }

    /// Owned snapshots of the children of `id`.
    ///
    /// Walks the subtree with an explicit stack of open containers, so
    /// nesting depth is bounded by memory rather than by the call stack.
    pub fn child_nodes(&self, id: NodeId) -> Vec<Node> {
        let mut open = vec![Frame::new(self, id)];
        while let Some(frame) = open.last_mut() {
            if let Some(child) = frame.next {
                frame.next = self.next_sibling(child);
                open.push(Frame::new(self, child));
                continue;
            }
            let Some(finished) = open.pop() else {
                break;
            };
            match open.last_mut() {
                Some(parent) => parent.done.push(self.snapshot(finished.id, finished.done)),
                None => return finished.done,
            }
        }
        Vec::new()
    }

    /// Combine the value of `id` with its already converted children.
    fn snapshot(&self, id: NodeId, children: Vec<Node>) -> Node {
        match self.value(id).clone() {
            NodeValue::Document => Node::Document(children),
            NodeValue::Paragraph => Node::Paragraph(children),
            NodeValue::Heading { level } => Node::Heading { level, children },
            NodeValue::Text(literal) => Node::Text(literal),
            NodeValue::Code(literal) => Node::Code(literal),
            NodeValue::HtmlInline(literal) => Node::HtmlInline(literal),
            NodeValue::SoftBreak => Node::SoftBreak,
            NodeValue::HardBreak => Node::HardBreak,
            NodeValue::Emphasis => Node::Emphasis(children),
            NodeValue::Strong => Node::Strong(children),
            NodeValue::Link { destination, title } => Node::Link {
                destination,
                title,
                children,
            },
            NodeValue::Image { destination, title } => Node::Image {
                destination,
                title,
                alt_text: children,
            },
            NodeValue::Extension { name } => Node::Extension { name, children },
        }
    }
}

/// A container whose children are still being converted.
struct Frame {
    id: NodeId,
    next: Option<NodeId>,
    done: Vec<Node>,
}

impl Frame {
    fn new(tree: &Tree, id: NodeId) -> Self {
        Frame {
            id,
            next: tree.first_child(id),
            done: Vec::new(),
        }
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
