//! Annotated syntax tree produced by the parser and consumed by the
//! compiler.

use crate::leaf::{Greediness, Leaf, NodePosition};

/// A single node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A character class, assertion, backreference or the empty string.
    Leaf { leaf: Leaf, position: NodePosition },
    /// Concatenation of nodes (implicit in `ab`).
    Concat(Vec<Node>),
    /// Alternation (`a|b`).
    Alternation(Vec<Node>),
    /// `node{min,max}`; `max` is `None` when unbounded.
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
        greediness: Greediness,
        position: NodePosition,
    },
    /// Capturing group, numbered from 1 in order of its opening paren.
    Subpattern {
        number: u32,
        node: Box<Node>,
        position: NodePosition,
    },
    /// Non-capturing group `(?:...)`.
    Group(Box<Node>),
}

impl Node {
    pub fn empty(at: usize) -> Node {
        Node::Leaf { leaf: Leaf::Empty, position: NodePosition::new(at, at) }
    }

    /// True if some leaf below this node is a backreference.
    pub fn has_backreference(&self) -> bool {
        match self {
            Node::Leaf { leaf, .. } => leaf.backreference().is_some(),
            Node::Concat(nodes) | Node::Alternation(nodes) => nodes.iter().any(Node::has_backreference),
            Node::Repeat { node, .. } | Node::Subpattern { node, .. } | Node::Group(node) => {
                node.has_backreference()
            }
        }
    }
}

/// A parsed pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub root: Node,
    /// Number of capturing subpatterns.
    pub subpatterns: u32,
    /// The source the tree was parsed from.
    pub pattern: String,
}
