//! In-process document used off the browser: by tests, and anywhere a mount
//! region needs reconciling without a real DOM.
//!
//! Nodes removed from the tree keep their slot, since a patch may re-insert
//! them. [`MemoryDom::sweep`] reclaims every slot the document no longer
//! reaches; ids of swept nodes stop resolving and their slots are reused.

use std::cell::RefCell;
use std::rc::Rc;

use isomorph_dom::{is_blank, parse_document, write_node, Attributes, ParseError, ViewNode, ViewTree};

use crate::dom::{Dom, DomError};

/// Identity of a node in a [`MemoryDom`]. Stable for the node's lifetime,
/// including across moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

const DOCUMENT: NodeId = NodeId {
    index: 0,
    generation: 0,
};

#[derive(Debug)]
enum Data {
    Element { tag: String, attributes: Attributes },
    Text(String),
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Data,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    mutations: usize,
}

/// Arena-backed document. Clones share the same document.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    arena: Rc<RefCell<Arena>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// An empty document.
    pub fn new() -> Self {
        let root = Slot {
            generation: 0,
            data: Data::Element {
                tag: "#document".into(),
                attributes: Attributes::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            arena: Rc::new(RefCell::new(Arena {
                slots: vec![root],
                free: Vec::new(),
                mutations: 0,
            })),
        }
    }

    pub fn from_nodes(nodes: &[ViewNode]) -> Self {
        let dom = Self::new();
        {
            let mut arena = dom.arena.borrow_mut();
            for node in nodes {
                let id = arena.alloc(node);
                arena.attach(DOCUMENT, usize::MAX, id);
            }
            arena.mutations = 0;
        }
        dom
    }

    pub fn parse_document(html: &str) -> Result<Self, ParseError> {
        Ok(Self::from_nodes(&parse_document(html)?))
    }

    pub fn document(&self) -> NodeId {
        DOCUMENT
    }

    /// Children of `node` as seen through [`Dom::child`].
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.arena.borrow().significant(node)
    }

    /// `node` and its subtree as a view node, or `None` once it was swept.
    pub fn snapshot(&self, node: NodeId) -> Option<ViewNode> {
        let arena = self.arena.borrow();
        arena.get(node)?;
        Some(arena.snapshot(node))
    }

    /// The content of `node` as a view tree.
    pub fn content(&self, node: NodeId) -> ViewTree {
        let arena = self.arena.borrow();
        ViewTree::new(arena.significant(node).into_iter().map(|c| arena.snapshot(c)).collect())
    }

    /// Number of edits applied since the document was built.
    pub fn mutations(&self) -> usize {
        self.arena.borrow().mutations
    }

    pub fn to_html(&self) -> String {
        self.inner_html(&DOCUMENT)
    }

    /// Nodes currently allocated, attached or not.
    pub fn allocated(&self) -> usize {
        let arena = self.arena.borrow();
        arena.slots.len() - arena.free.len()
    }

    /// Free every node the document no longer reaches. Returns how many
    /// were freed.
    pub fn sweep(&self) -> usize {
        self.arena.borrow_mut().sweep()
    }
}

impl Arena {
    fn get(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.index).filter(|s| s.generation == id.generation)
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, DomError> {
        self.get(id).ok_or_else(|| DomError(format!("no node {}", id.index)))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, DomError> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .ok_or_else(|| DomError(format!("no node {}", id.index)))
    }

    fn alloc(&mut self, node: &ViewNode) -> NodeId {
        let (data, children) = match node {
            ViewNode::Element {
                tag,
                attributes,
                children,
                ..
            } => (
                Data::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                },
                children.as_slice(),
            ),
            ViewNode::Text { content } => (Data::Text(content.clone()), &[][..]),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.data = data;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    data,
                    parent: None,
                    children: Vec::new(),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        for child in children {
            let child_id = self.alloc(child);
            self.slots[child_id.index].parent = Some(id);
            self.slots[id.index].children.push(child_id);
        }
        id
    }

    fn sweep(&mut self) -> usize {
        let mut keep = vec![false; self.slots.len()];
        let mut stack = vec![DOCUMENT.index];
        while let Some(index) = stack.pop() {
            keep[index] = true;
            stack.extend(self.slots[index].children.iter().map(|c| c.index));
        }
        for &index in &self.free {
            keep[index] = true;
        }
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if keep[index] {
                continue;
            }
            // Bumped so ids handed out for the old node no longer resolve.
            slot.generation = slot.generation.wrapping_add(1);
            slot.data = Data::Text(String::new());
            slot.parent = None;
            slot.children = Vec::new();
            self.free.push(index);
            freed += 1;
        }
        freed
    }

    fn is_significant(&self, id: NodeId) -> bool {
        match self.get(id).map(|s| &s.data) {
            Some(Data::Text(text)) => !is_blank(text),
            Some(Data::Element { .. }) => true,
            None => false,
        }
    }

    fn significant(&self, parent: NodeId) -> Vec<NodeId> {
        self.get(parent)
            .map(|s| s.children.iter().copied().filter(|&c| self.is_significant(c)).collect())
            .unwrap_or_default()
    }

    /// Raw position in `parent.children` of significant child `index`.
    fn position(&self, parent: NodeId, index: usize) -> Option<usize> {
        let children = &self.get(parent)?.children;
        children
            .iter()
            .enumerate()
            .filter(|(_, &c)| self.is_significant(c))
            .nth(index)
            .map(|(pos, _)| pos)
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let pos = self
            .position(parent, index)
            .unwrap_or(self.slots[parent.index].children.len());
        self.slots[parent.index].children.insert(pos, child);
        self.slots[child.index].parent = Some(parent);
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.slots[child.index].parent.take() {
            self.slots[parent.index].children.retain(|&c| c != child);
        }
    }

    fn expect_element(&self, id: NodeId) -> Result<(), DomError> {
        match self.slot(id)?.data {
            Data::Element { .. } => Ok(()),
            Data::Text(_) => Err(DomError(format!("node {} is not an element", id.index))),
        }
    }

    fn snapshot(&self, id: NodeId) -> ViewNode {
        let slot = &self.slots[id.index];
        match &slot.data {
            Data::Text(text) => ViewNode::text(text.clone()),
            Data::Element { tag, attributes } => ViewNode::element(
                tag.clone(),
                attributes.clone(),
                slot.children
                    .iter()
                    .filter(|&&c| self.is_significant(c))
                    .map(|&c| self.snapshot(c))
                    .collect(),
            ),
        }
    }

    fn find(&self, from: NodeId, pred: &dyn Fn(&Slot) -> bool) -> Option<NodeId> {
        for &child in &self.slots[from.index].children {
            if pred(&self.slots[child.index]) {
                return Some(child);
            }
            if let Some(found) = self.find(child, pred) {
                return Some(found);
            }
        }
        None
    }
}

fn attribute<'a>(slot: &'a Slot, name: &str) -> Option<&'a str> {
    match &slot.data {
        Data::Element { attributes, .. } => attributes.get(name).map(String::as_str),
        Data::Text(_) => None,
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.arena.borrow().find(DOCUMENT, &|slot: &Slot| attribute(slot, "id") == Some(id))
    }

    fn script_text(&self, type_label: &str, attr: &str, value: &str) -> Option<String> {
        let arena = self.arena.borrow();
        let script = arena.find(DOCUMENT, &|slot: &Slot| {
            matches!(&slot.data, Data::Element { tag, .. } if tag == "script")
                && attribute(slot, "type") == Some(type_label)
                && attribute(slot, attr) == Some(value)
        })?;
        Some(arena.snapshot(script).text_content())
    }

    fn inner_html(&self, node: &NodeId) -> String {
        let arena = self.arena.borrow();
        let mut buf = String::new();
        if let Some(slot) = arena.get(*node) {
            for &child in &slot.children {
                write_node(&arena.snapshot(child), &mut buf);
            }
        }
        buf
    }

    fn child(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
        self.arena.borrow().significant(*parent).get(index).copied()
    }

    fn child_count(&self, parent: &NodeId) -> usize {
        self.arena.borrow().significant(*parent).len()
    }

    fn is_element(&self, node: &NodeId) -> bool {
        matches!(self.arena.borrow().get(*node), Some(Slot { data: Data::Element { .. }, .. }))
    }

    fn is_text(&self, node: &NodeId) -> bool {
        matches!(self.arena.borrow().get(*node), Some(Slot { data: Data::Text(_), .. }))
    }

    fn create_node(&self, node: &ViewNode) -> Result<NodeId, DomError> {
        Ok(self.arena.borrow_mut().alloc(node))
    }

    fn insert_child(&self, parent: &NodeId, index: usize, child: &NodeId) -> Result<(), DomError> {
        let mut arena = self.arena.borrow_mut();
        arena.expect_element(*parent)?;
        arena.slot(*child)?;
        arena.detach(*child);
        let count = arena.significant(*parent).len();
        if index > count {
            return Err(DomError(format!("index {index} past {count} children")));
        }
        arena.attach(*parent, index, *child);
        arena.mutations += 1;
        Ok(())
    }

    fn remove_child(&self, parent: &NodeId, index: usize) -> Result<NodeId, DomError> {
        let mut arena = self.arena.borrow_mut();
        let pos = arena
            .position(*parent, index)
            .ok_or_else(|| DomError(format!("no child {index}")))?;
        let child = arena.slot_mut(*parent)?.children.remove(pos);
        arena.slots[child.index].parent = None;
        arena.mutations += 1;
        Ok(child)
    }

    fn replace_child(&self, parent: &NodeId, index: usize, with: &NodeId) -> Result<(), DomError> {
        let mut arena = self.arena.borrow_mut();
        arena.slot(*with)?;
        arena.detach(*with);
        let pos = arena
            .position(*parent, index)
            .ok_or_else(|| DomError(format!("no child {index}")))?;
        let old = std::mem::replace(&mut arena.slot_mut(*parent)?.children[pos], *with);
        arena.slots[old.index].parent = None;
        arena.slots[with.index].parent = Some(*parent);
        arena.mutations += 1;
        Ok(())
    }

    fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut arena = self.arena.borrow_mut();
        match &mut arena.slot_mut(*element)?.data {
            Data::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
            }
            Data::Text(_) => return Err(DomError("attribute on a text node".into())),
        }
        arena.mutations += 1;
        Ok(())
    }

    fn remove_attribute(&self, element: &NodeId, name: &str) -> Result<(), DomError> {
        let mut arena = self.arena.borrow_mut();
        match &mut arena.slot_mut(*element)?.data {
            Data::Element { attributes, .. } => {
                attributes.shift_remove(name);
            }
            Data::Text(_) => return Err(DomError("attribute on a text node".into())),
        }
        arena.mutations += 1;
        Ok(())
    }

    fn set_text(&self, text: &NodeId, content: &str) -> Result<(), DomError> {
        let mut arena = self.arena.borrow_mut();
        match &mut arena.slot_mut(*text)?.data {
            Data::Text(current) => *current = content.to_string(),
            Data::Element { .. } => return Err(DomError("text on an element".into())),
        }
        arena.mutations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <div id="list"><ul><li>a</li><li>b</li></ul></div>
    <script type="text/template" data-tmpl="t">[[ x ]]</script>
  </body>
</html>"#;

    #[test]
    fn test_lookup() {
        let dom = MemoryDom::parse_document(PAGE).unwrap();
        let list = dom.element_by_id("list").unwrap();
        assert_eq!(dom.inner_html(&list), "<ul><li>a</li><li>b</li></ul>");
        assert_eq!(dom.script_text("text/template", "data-tmpl", "t").as_deref(), Some("[[ x ]]"));
        assert_eq!(dom.script_text("text/template", "data-tmpl", "u"), None);
        assert!(dom.element_by_id("nope").is_none());
    }

    #[test]
    fn test_edits_keep_identity() {
        let dom = MemoryDom::parse_document(PAGE).unwrap();
        let list = dom.element_by_id("list").unwrap();
        let ul = dom.child(&list, 0).unwrap();
        let a = dom.child(&ul, 0).unwrap();

        let moved = dom.remove_child(&ul, 0).unwrap();
        assert_eq!(moved, a);
        dom.insert_child(&ul, 1, &moved).unwrap();
        assert_eq!(dom.child(&ul, 1), Some(a));

        let c = dom.create_node(&ViewNode::text("c")).unwrap();
        dom.replace_child(&ul, 0, &c).unwrap();
        assert_eq!(dom.inner_html(&list), "<ul>c<li>a</li></ul>");
        assert_eq!(dom.mutations(), 3);
    }

    #[test]
    fn test_insert_past_end_fails() {
        let dom = MemoryDom::parse_document("<ul><li>a</li></ul>").unwrap();
        let ul = dom.child(&dom.document(), 0).unwrap();
        let li = dom.create_node(&ViewNode::text("x")).unwrap();
        assert!(dom.insert_child(&ul, 2, &li).is_err());
        assert!(dom.insert_child(&ul, 1, &li).is_ok());
    }

    #[test]
    fn test_sweep_reclaims_detached_nodes() {
        let dom = MemoryDom::parse_document("<ul><li>a</li><li>b</li></ul>").unwrap();
        let ul = dom.child(&dom.document(), 0).unwrap();
        assert_eq!(dom.allocated(), 6);

        let removed = dom.remove_child(&ul, 1).unwrap();
        assert_eq!(dom.sweep(), 2);
        assert_eq!(dom.allocated(), 4);
        assert!(!dom.is_element(&removed));
        assert_eq!(dom.snapshot(removed), None);
        assert!(dom.insert_child(&ul, 0, &removed).is_err());

        let slots = dom.arena.borrow().slots.len();
        let c = dom.create_node(&ViewNode::element("li", Attributes::new(), vec![ViewNode::text("c")])).unwrap();
        assert_ne!(c, removed);
        assert_eq!(dom.arena.borrow().slots.len(), slots);
        dom.insert_child(&ul, 1, &c).unwrap();
        assert_eq!(dom.inner_html(&ul), "<li>a</li><li>c</li>");
        assert_eq!(dom.sweep(), 0);
    }

    #[test]
    fn test_blank_text_is_not_a_child() {
        let dom = MemoryDom::parse_document("<ul><li>a</li></ul>").unwrap();
        let ul = dom.child(&dom.document(), 0).unwrap();
        let blank = dom.create_node(&ViewNode::text("\n  ")).unwrap();
        dom.insert_child(&ul, 0, &blank).unwrap();
        assert_eq!(dom.child_count(&ul), 1);
        assert!(dom.is_element(&dom.child(&ul, 0).unwrap()));
    }
}
