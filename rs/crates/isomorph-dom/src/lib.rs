//! isomorph-dom — ViewNode trees shared by the server renderer and the client
//!
//! A [`ViewTree`] is what a mount region looks like after a template ran: it is
//! parsed from markup, written back out as HTML, and diffed against the tree of
//! the next render to produce a [`Patch`].

mod diff;
pub mod embed;
mod html;
mod parse;

pub use diff::{diff, diff_nodes, Patch, PatchOp, Path};
pub use html::{escape_attr, escape_html, render_to_html, write_node, RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
pub use parse::{is_blank, parse_document, parse_fragment, ParseError};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute name → value, in source order.
pub type Attributes = IndexMap<String, String>;

/// Attribute that carries a node's stable identity through markup.
pub const KEY_ATTRIBUTE: &str = "data-key";

/// A single node in a view tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewNode {
    Element {
        /// Lower-case tag name (e.g. "ul", "li", "input")
        tag: String,
        attributes: Attributes,
        children: Vec<ViewNode>,
        /// Identity across renders, independent of position
        #[serde(skip_serializing_if = "Option::is_none", default)]
        key: Option<String>,
    },
    Text {
        content: String,
    },
}

impl ViewNode {
    /// Build an element. The key is taken from the `data-key` attribute so that
    /// trees built in memory and trees parsed from markup agree on identity.
    pub fn element(tag: impl Into<String>, attributes: Attributes, children: Vec<ViewNode>) -> Self {
        let key = attributes.get(KEY_ATTRIBUTE).cloned();
        ViewNode::Element {
            tag: tag.into(),
            attributes,
            children,
            key,
        }
    }

    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        ViewNode::Text {
            content: content.into(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ViewNode::Element { tag, .. } => Some(tag),
            ViewNode::Text { .. } => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            ViewNode::Element { key, .. } => key.as_deref(),
            ViewNode::Text { .. } => None,
        }
    }

    /// Get an attribute value if present
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            ViewNode::Element { attributes, .. } => attributes.get(name).map(|s| s.as_str()),
            ViewNode::Text { .. } => None,
        }
    }

    /// Children in rendering order (empty slice for text nodes)
    pub fn children(&self) -> &[ViewNode] {
        match self {
            ViewNode::Element { children, .. } => children,
            ViewNode::Text { .. } => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ViewNode::Text { .. })
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &ViewNode, out: &mut String) {
    match node {
        ViewNode::Text { content } => out.push_str(content),
        ViewNode::Element { children, .. } => children.iter().for_each(|c| collect_text(c, out)),
    }
}

/// The content of one mount region: its top-level nodes in order.
///
/// Paths into a tree are child indices starting at the mount element, so
/// `[]` is the mount element itself and `[0, 2]` is the third child of the
/// first top-level node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTree {
    pub nodes: Vec<ViewNode>,
}

impl ViewTree {
    pub fn new(nodes: Vec<ViewNode>) -> Self {
        Self { nodes }
    }

    /// Parse a markup fragment, e.g. the `innerHTML` of a mount element.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        parse_fragment(markup).map(Self::new)
    }

    pub fn to_html(&self) -> String {
        let mut buf = String::with_capacity(1024);
        for node in &self.nodes {
            write_node(node, &mut buf);
        }
        buf
    }

    /// Compute the edits that turn `self` into `next`.
    pub fn diff(&self, next: &ViewTree) -> Patch {
        diff(self, next)
    }

    /// Resolve a path against this tree. `[]` has no node of its own.
    pub fn node_at(&self, path: &[usize]) -> Option<&ViewNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for &i in rest {
            node = node.children().get(i)?;
        }
        Some(node)
    }
}
