//! Tree diffing.
//!
//! Ops touching one parent are emitted as: recursive ops for the children that
//! stay (addressed by their pre-change index), then removals from the highest
//! index down, then moves, then insertions from the lowest new index up.
//! Applying a [`Patch`] strictly in order therefore never addresses a node
//! through an index that an earlier op has shifted.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Attributes, ViewNode, ViewTree};

/// Child indices from the mount element down to a node.
pub type Path = Vec<usize>;

/// A single edit to a live tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Create `node` and insert it as child `index` of `parent`.
    InsertNode { parent: Path, index: usize, node: ViewNode },
    RemoveNode { path: Path },
    /// Swap the whole subtree at `path` for a freshly created `node`.
    ReplaceNode { path: Path, node: ViewNode },
    /// Detach child `from` of `parent` and re-insert the same node at `to`.
    MoveNode { parent: Path, from: usize, to: usize },
    SetAttribute { path: Path, name: String, value: String },
    RemoveAttribute { path: Path, name: String },
    SetText { path: Path, content: String },
}

impl PatchOp {
    /// The node this op resolves before editing: the parent for inserts and
    /// moves, the target itself otherwise.
    pub fn path(&self) -> &[usize] {
        match self {
            PatchOp::InsertNode { parent, .. } | PatchOp::MoveNode { parent, .. } => parent,
            PatchOp::RemoveNode { path }
            | PatchOp::ReplaceNode { path, .. }
            | PatchOp::SetAttribute { path, .. }
            | PatchOp::RemoveAttribute { path, .. }
            | PatchOp::SetText { path, .. } => path,
        }
    }
}

/// Ordered edit list produced by [`diff`]. Must be applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl From<Vec<PatchOp>> for Patch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }
}

/// Compute the edits that turn the mount content `old` into `new`.
pub fn diff(old: &ViewTree, new: &ViewTree) -> Patch {
    let mut differ = Differ::default();
    differ.children(&mut Vec::new(), &old.nodes, &new.nodes);
    trace!(ops = differ.ops.len(), "diffed view trees");
    Patch { ops: differ.ops }
}

/// Diff two single nodes; paths are relative to `old`, which is `[]`.
pub fn diff_nodes(old: &ViewNode, new: &ViewNode) -> Patch {
    let mut differ = Differ::default();
    differ.node(&mut Vec::new(), old, new);
    Patch { ops: differ.ops }
}

#[derive(Default)]
struct Differ {
    ops: Vec<PatchOp>,
}

impl Differ {
    fn node(&mut self, path: &mut Path, old: &ViewNode, new: &ViewNode) {
        match (old, new) {
            (ViewNode::Text { content: a }, ViewNode::Text { content: b }) => {
                if a != b {
                    self.ops.push(PatchOp::SetText {
                        path: path.clone(),
                        content: b.clone(),
                    });
                }
            }
            (
                ViewNode::Element {
                    tag: tag_a,
                    attributes: attrs_a,
                    children: children_a,
                    key: key_a,
                },
                ViewNode::Element {
                    tag: tag_b,
                    attributes: attrs_b,
                    children: children_b,
                    key: key_b,
                },
            ) if tag_a == tag_b && key_a == key_b => {
                self.attributes(path, attrs_a, attrs_b);
                self.children(path, children_a, children_b);
            }
            // Different tag, different kind or different identity: no partial reuse.
            _ => self.ops.push(PatchOp::ReplaceNode {
                path: path.clone(),
                node: new.clone(),
            }),
        }
    }

    fn attributes(&mut self, path: &Path, old: &Attributes, new: &Attributes) {
        for name in old.keys().filter(|name| !new.contains_key(*name)) {
            self.ops.push(PatchOp::RemoveAttribute {
                path: path.clone(),
                name: name.clone(),
            });
        }
        for (name, value) in new {
            if old.get(name) != Some(value) {
                self.ops.push(PatchOp::SetAttribute {
                    path: path.clone(),
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    fn children(&mut self, parent: &mut Path, old: &[ViewNode], new: &[ViewNode]) {
        match (keys_of(old), keys_of(new)) {
            (Some(old_keys), Some(new_keys)) => self.keyed(parent, old, new, &old_keys, &new_keys),
            _ => self.positional(parent, old, new),
        }
    }

    fn positional(&mut self, parent: &mut Path, old: &[ViewNode], new: &[ViewNode]) {
        // Identical runs at either end need no edits.
        let head = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        let tail = old[head..]
            .iter()
            .rev()
            .zip(new[head..].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();
        let old_end = old.len() - tail;
        let new_end = new.len() - tail;
        let common = (old_end - head).min(new_end - head);

        for i in head..head + common {
            parent.push(i);
            self.node(parent, &old[i], &new[i]);
            parent.pop();
        }
        for i in (head + common..old_end).rev() {
            self.ops.push(PatchOp::RemoveNode { path: child_path(parent, i) });
        }
        for (i, node) in new.iter().enumerate().take(new_end).skip(head + common) {
            self.ops.push(PatchOp::InsertNode {
                parent: parent.clone(),
                index: i,
                node: node.clone(),
            });
        }
    }

    fn keyed(&mut self, parent: &mut Path, old: &[ViewNode], new: &[ViewNode], old_keys: &[&str], new_keys: &[&str]) {
        let old_index: HashMap<&str, usize> = old_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let new_index: HashMap<&str, usize> = new_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

        // Retained children, addressed before anything at this level moves.
        for (i, key) in old_keys.iter().enumerate() {
            if let Some(&j) = new_index.get(key) {
                parent.push(i);
                self.node(parent, &old[i], &new[j]);
                parent.pop();
            }
        }

        for (i, key) in old_keys.iter().enumerate().rev() {
            if !new_index.contains_key(key) {
                self.ops.push(PatchOp::RemoveNode { path: child_path(parent, i) });
            }
        }

        // Put the retained children into their new relative order.
        let mut current: Vec<&str> = old_keys.iter().copied().filter(|k| new_index.contains_key(k)).collect();
        let target: Vec<&str> = new_keys.iter().copied().filter(|k| old_index.contains_key(k)).collect();
        for (to, wanted) in target.iter().enumerate() {
            if current[to] == *wanted {
                continue;
            }
            if let Some(offset) = current[to + 1..].iter().position(|k| k == wanted) {
                let from = to + 1 + offset;
                self.ops.push(PatchOp::MoveNode {
                    parent: parent.clone(),
                    from,
                    to,
                });
                let key = current.remove(from);
                current.insert(to, key);
            }
        }

        for (j, key) in new_keys.iter().enumerate() {
            if !old_index.contains_key(key) {
                self.ops.push(PatchOp::InsertNode {
                    parent: parent.clone(),
                    index: j,
                    node: new[j].clone(),
                });
            }
        }
    }
}

fn child_path(parent: &Path, index: usize) -> Path {
    let mut path = parent.clone();
    path.push(index);
    path
}

/// Keys of a child list, if every child has one and none repeats.
fn keys_of(children: &[ViewNode]) -> Option<Vec<&str>> {
    let keys = children.iter().map(ViewNode::key).collect::<Option<Vec<_>>>()?;
    let unique: HashSet<&str> = keys.iter().copied().collect();
    (unique.len() == keys.len()).then_some(keys)
}
