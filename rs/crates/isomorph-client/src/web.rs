//! [`Dom`] over the browser document.

use isomorph_dom::{is_blank, ViewNode};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

use crate::dom::{Dom, DomError};

#[derive(Debug, Clone)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The document of the current window, if there is one.
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn build(&self, node: &ViewNode) -> Result<Node, JsValue> {
        match node {
            ViewNode::Text { content } => Ok(self.document.create_text_node(content).into()),
            ViewNode::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                let element = self.document.create_element(tag)?;
                for (name, value) in attributes {
                    element.set_attribute(name, value)?;
                }
                for child in children {
                    element.append_child(&self.build(child)?)?;
                }
                Ok(element.into())
            }
        }
    }
}

fn js_error(value: JsValue) -> DomError {
    DomError(format!("{value:?}"))
}

/// Element and non-blank text children, the ones markup parsing keeps.
fn significant(parent: &Node) -> Vec<Node> {
    let list = parent.child_nodes();
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter(|node| match node.node_type() {
            Node::ELEMENT_NODE => true,
            Node::TEXT_NODE => node.text_content().is_some_and(|t| !is_blank(&t)),
            _ => false,
        })
        .collect()
}

fn nth(parent: &Node, index: usize) -> Result<Node, DomError> {
    significant(parent)
        .into_iter()
        .nth(index)
        .ok_or_else(|| DomError(format!("no child {index}")))
}

fn as_element(node: &Node) -> Result<&Element, DomError> {
    node.dyn_ref::<Element>()
        .ok_or_else(|| DomError(format!("{} is not an element", node.node_name())))
}

impl Dom for WebDom {
    type Node = Node;

    fn element_by_id(&self, id: &str) -> Option<Node> {
        self.document.get_element_by_id(id).map(Node::from)
    }

    fn script_text(&self, type_label: &str, attr: &str, value: &str) -> Option<String> {
        let value = value.replace('\\', "\\\\").replace('"', "\\\"");
        let selector = format!("script[type=\"{type_label}\"][{attr}=\"{value}\"]");
        self.document.query_selector(&selector).ok().flatten()?.text_content()
    }

    fn inner_html(&self, node: &Node) -> String {
        node.dyn_ref::<Element>().map(Element::inner_html).unwrap_or_default()
    }

    fn child(&self, parent: &Node, index: usize) -> Option<Node> {
        significant(parent).into_iter().nth(index)
    }

    fn child_count(&self, parent: &Node) -> usize {
        significant(parent).len()
    }

    fn is_element(&self, node: &Node) -> bool {
        node.node_type() == Node::ELEMENT_NODE
    }

    fn is_text(&self, node: &Node) -> bool {
        node.node_type() == Node::TEXT_NODE
    }

    fn create_node(&self, node: &ViewNode) -> Result<Node, DomError> {
        self.build(node).map_err(js_error)
    }

    fn insert_child(&self, parent: &Node, index: usize, child: &Node) -> Result<(), DomError> {
        let children = significant(parent);
        if index > children.len() {
            return Err(DomError(format!("index {index} past {} children", children.len())));
        }
        parent
            .insert_before(child, children.get(index))
            .map(drop)
            .map_err(js_error)
    }

    fn remove_child(&self, parent: &Node, index: usize) -> Result<Node, DomError> {
        let child = nth(parent, index)?;
        parent.remove_child(&child).map_err(js_error)
    }

    fn replace_child(&self, parent: &Node, index: usize, with: &Node) -> Result<(), DomError> {
        let old = nth(parent, index)?;
        parent.replace_child(with, &old).map(drop).map_err(js_error)
    }

    fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), DomError> {
        as_element(element)?.set_attribute(name, value).map_err(js_error)
    }

    fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), DomError> {
        as_element(element)?.remove_attribute(name).map_err(js_error)
    }

    fn set_text(&self, text: &Node, content: &str) -> Result<(), DomError> {
        text.set_text_content(Some(content));
        Ok(())
    }
}
