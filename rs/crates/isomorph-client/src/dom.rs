//! The seam between reconciliation and a live document.

use std::fmt;

use isomorph_dom::ViewNode;

/// A failed operation reported by a [`Dom`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DomError(pub String);

/// A live document a mount region can be hydrated from and patched in.
///
/// Child indices count elements and text nodes only. Comments and text nodes
/// that are nothing but whitespace are skipped, matching how markup is parsed
/// into a [`ViewNode`] tree, so the same index addresses the same child on
/// both sides.
pub trait Dom {
    /// Handle to a live node. Equal handles are the same node.
    type Node: Clone + PartialEq + fmt::Debug;

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Text of the first `<script>` whose `type` is `type_label` and whose
    /// `attr` equals `value`.
    fn script_text(&self, type_label: &str, attr: &str, value: &str) -> Option<String>;

    fn inner_html(&self, node: &Self::Node) -> String;

    fn child(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;

    fn child_count(&self, parent: &Self::Node) -> usize;

    fn is_element(&self, node: &Self::Node) -> bool;

    fn is_text(&self, node: &Self::Node) -> bool;

    /// Build a detached subtree for `node`.
    fn create_node(&self, node: &ViewNode) -> Result<Self::Node, DomError>;

    /// Insert `child` so that it becomes child `index` of `parent`.
    fn insert_child(&self, parent: &Self::Node, index: usize, child: &Self::Node) -> Result<(), DomError>;

    /// Detach child `index` of `parent` and hand it back.
    fn remove_child(&self, parent: &Self::Node, index: usize) -> Result<Self::Node, DomError>;

    fn replace_child(&self, parent: &Self::Node, index: usize, with: &Self::Node) -> Result<(), DomError>;

    fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), DomError>;

    fn set_text(&self, text: &Self::Node, content: &str) -> Result<(), DomError>;
}
