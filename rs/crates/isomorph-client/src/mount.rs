//! A hydrated mount region and its reconciliation loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use isomorph_dom::{Patch, PatchOp, ViewTree};
use isomorph_state::ViewState;
use isomorph_template::{TemplateEngine, TemplateSet};
use tracing::{debug, error, instrument, warn};

use crate::dom::Dom;
use crate::patch::apply;
use crate::ClientError;

/// One hydrated mount region: its state, templates, and the baseline tree
/// that mirrors the live markup under its root.
#[derive(Debug)]
pub struct Mount<S, D: Dom> {
    id: String,
    dom: D,
    root: D::Node,
    templates: TemplateSet,
    state: S,
    baseline: ViewTree,
    stale: bool,
}

impl<S: ViewState, D: Dom> Mount<S, D> {
    pub(crate) fn new(id: String, dom: D, root: D::Node, templates: TemplateSet, state: S, baseline: ViewTree) -> Self {
        Self {
            id,
            dom,
            root,
            templates,
            state,
            baseline,
            stale: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn baseline(&self) -> &ViewTree {
        &self.baseline
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn root(&self) -> &D::Node {
        &self.root
    }

    /// Set after a patch failed to apply; the next reconcile starts from the
    /// live markup instead of the baseline.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Mutate the state, then reconcile.
    pub fn update<F: FnOnce(&mut S)>(&mut self, mutation: F) -> Result<Patch, ClientError> {
        mutation(&mut self.state);
        self.reconcile()
    }

    /// Re-render from the current state and patch the live markup to match.
    /// Returns the applied patch.
    #[instrument(skip_all, fields(mount = %self.id))]
    pub fn reconcile(&mut self) -> Result<Patch, ClientError> {
        if self.stale {
            let markup = self.dom.inner_html(&self.root);
            self.baseline = ViewTree::parse(&markup).map_err(|source| {
                error!(%source, "live markup no longer parses");
                ClientError::Stale {
                    mount: self.id.clone(),
                    source,
                }
            })?;
            self.stale = false;
            warn!("baseline rebuilt from live markup");
        }

        let entry = self
            .templates
            .entry()
            .ok_or_else(|| ClientError::NoTemplates(self.id.clone()))?;
        let markup = self.templates.render(entry, &self.state)?;
        let next = ViewTree::parse(&markup)?;
        let patch = self.baseline.diff(&next);

        if let Err(err) = apply(&self.dom, &self.root, &patch) {
            error!(%err, "patch failed; mount marked stale");
            self.stale = true;
            return Err(err.into());
        }
        debug!(ops = patch.len(), "reconciled");
        self.baseline = next;
        Ok(patch)
    }
}

type Mutation<S> = Box<dyn FnOnce(&mut S)>;

/// Outcome of [`SharedMount::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The mutation and any queued behind it were reconciled; the patches
    /// applied, in order.
    Applied(Patch),
    /// A reconciliation of this mount is in flight; the mutation runs once it
    /// finishes.
    Queued,
    /// The mount is borrowed through [`SharedMount::with`]; the mutation was
    /// dropped without running.
    Rejected,
}

/// A [`Mount`] shared between event handlers on one thread.
///
/// Mutations never interleave with a reconciliation of the same mount: a
/// dispatch that arrives while one is running (an event fired by a DOM edit,
/// say) is queued and drained by the outer dispatch before it returns. A
/// dispatch from inside [`SharedMount::with`] has nothing to drain it and is
/// rejected.
pub struct SharedMount<S, D: Dom> {
    mount: Rc<RefCell<Mount<S, D>>>,
    queue: Rc<RefCell<VecDeque<Mutation<S>>>>,
    reconciling: Rc<Cell<bool>>,
}

impl<S, D: Dom> Clone for SharedMount<S, D> {
    fn clone(&self) -> Self {
        Self {
            mount: Rc::clone(&self.mount),
            queue: Rc::clone(&self.queue),
            reconciling: Rc::clone(&self.reconciling),
        }
    }
}

impl<S: ViewState, D: Dom> SharedMount<S, D> {
    pub fn new(mount: Mount<S, D>) -> Self {
        Self {
            mount: Rc::new(RefCell::new(mount)),
            queue: Rc::new(RefCell::new(VecDeque::new())),
            reconciling: Rc::new(Cell::new(false)),
        }
    }

    /// Run `mutation` and reconcile, together with anything queued.
    ///
    /// On error the mutations still queued stay queued for the next dispatch.
    pub fn dispatch<F: FnOnce(&mut S) + 'static>(&self, mutation: F) -> Result<Dispatch, ClientError> {
        if self.reconciling.get() {
            self.queue.borrow_mut().push_back(Box::new(mutation));
            debug!("reconciliation in flight; mutation queued");
            return Ok(Dispatch::Queued);
        }
        let Ok(mut mount) = self.mount.try_borrow_mut() else {
            warn!("mount is borrowed; mutation rejected");
            return Ok(Dispatch::Rejected);
        };
        self.queue.borrow_mut().push_back(Box::new(mutation));

        self.reconciling.set(true);
        let drained = self.drain(&mut mount);
        self.reconciling.set(false);
        drained.map(|ops| Dispatch::Applied(Patch::from(ops)))
    }

    fn drain(&self, mount: &mut Mount<S, D>) -> Result<Vec<PatchOp>, ClientError> {
        let mut ops = Vec::new();
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(mutation) = next else { break };
            ops.extend(mount.update(mutation)?);
        }
        Ok(ops)
    }

    /// Run `f` against the mount, or `None` while a reconciliation holds it.
    pub fn with<R>(&self, f: impl FnOnce(&Mount<S, D>) -> R) -> Option<R> {
        self.mount.try_borrow().ok().map(|mount| f(&mount))
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
