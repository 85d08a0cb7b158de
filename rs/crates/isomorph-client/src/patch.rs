//! Applying a [`Patch`] to a live document.

use isomorph_dom::{Patch, PatchOp, Path};
use tracing::trace;

use crate::dom::{Dom, DomError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchApplicationError {
    #[error("path {path:?} does not resolve in the live document")]
    UnresolvedPath { path: Path },
    #[error("node at {path:?} is not an element")]
    NotAnElement { path: Path },
    #[error("node at {path:?} is not a text node")]
    NotText { path: Path },
    #[error("DOM edit at {path:?} failed: {source}")]
    Dom {
        path: Path,
        #[source]
        source: DomError,
    },
}

/// Apply `patch` in order under `root`, the mount element. Stops at the first
/// op that fails; earlier ops stay applied.
pub fn apply<D: Dom>(dom: &D, root: &D::Node, patch: &Patch) -> Result<(), PatchApplicationError> {
    for op in patch {
        trace!(?op, "applying");
        apply_op(dom, root, op)?;
    }
    Ok(())
}

fn apply_op<D: Dom>(dom: &D, root: &D::Node, op: &PatchOp) -> Result<(), PatchApplicationError> {
    match op {
        PatchOp::InsertNode { parent, index, node } => {
            let target = element(dom, root, parent)?;
            if *index > dom.child_count(&target) {
                return Err(unresolved(parent, *index));
            }
            let created = dom.create_node(node).map_err(dom_error(parent))?;
            dom.insert_child(&target, *index, &created).map_err(dom_error(parent))
        }
        PatchOp::RemoveNode { path } => {
            let (parent, index) = child_slot(dom, root, path)?;
            dom.remove_child(&parent, index).map(drop).map_err(dom_error(path))
        }
        PatchOp::ReplaceNode { path, node } => {
            let (parent, index) = child_slot(dom, root, path)?;
            let created = dom.create_node(node).map_err(dom_error(path))?;
            dom.replace_child(&parent, index, &created).map_err(dom_error(path))
        }
        PatchOp::MoveNode { parent, from, to } => {
            let target = element(dom, root, parent)?;
            let count = dom.child_count(&target);
            if *from >= count {
                return Err(unresolved(parent, *from));
            }
            if *to >= count {
                return Err(unresolved(parent, *to));
            }
            let moved = dom.remove_child(&target, *from).map_err(dom_error(parent))?;
            dom.insert_child(&target, *to, &moved).map_err(dom_error(parent))
        }
        PatchOp::SetAttribute { path, name, value } => {
            let target = element(dom, root, path)?;
            dom.set_attribute(&target, name, value).map_err(dom_error(path))
        }
        PatchOp::RemoveAttribute { path, name } => {
            let target = element(dom, root, path)?;
            dom.remove_attribute(&target, name).map_err(dom_error(path))
        }
        PatchOp::SetText { path, content } => {
            let target = resolve(dom, root, path)?;
            if !dom.is_text(&target) {
                return Err(PatchApplicationError::NotText { path: path.clone() });
            }
            dom.set_text(&target, content).map_err(dom_error(path))
        }
    }
}

fn resolve<D: Dom>(dom: &D, root: &D::Node, path: &[usize]) -> Result<D::Node, PatchApplicationError> {
    let mut node = root.clone();
    for (depth, &index) in path.iter().enumerate() {
        node = dom.child(&node, index).ok_or_else(|| PatchApplicationError::UnresolvedPath {
            path: path[..=depth].to_vec(),
        })?;
    }
    Ok(node)
}

fn element<D: Dom>(dom: &D, root: &D::Node, path: &[usize]) -> Result<D::Node, PatchApplicationError> {
    let node = resolve(dom, root, path)?;
    if !dom.is_element(&node) {
        return Err(PatchApplicationError::NotAnElement { path: path.to_vec() });
    }
    Ok(node)
}

/// Parent element and index of the existing node at `path`. The mount
/// element itself has no slot.
fn child_slot<D: Dom>(dom: &D, root: &D::Node, path: &[usize]) -> Result<(D::Node, usize), PatchApplicationError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PatchApplicationError::UnresolvedPath { path: Vec::new() })?;
    let parent = element(dom, root, parent_path)?;
    if dom.child(&parent, index).is_none() {
        return Err(PatchApplicationError::UnresolvedPath { path: path.to_vec() });
    }
    Ok((parent, index))
}

fn unresolved(parent: &[usize], index: usize) -> PatchApplicationError {
    let mut path = parent.to_vec();
    path.push(index);
    PatchApplicationError::UnresolvedPath { path }
}

fn dom_error(path: &[usize]) -> impl FnOnce(DomError) -> PatchApplicationError + '_ {
    move |source| PatchApplicationError::Dom {
        path: path.to_vec(),
        source,
    }
}
