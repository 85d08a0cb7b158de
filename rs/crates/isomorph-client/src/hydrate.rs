//! Picking up a server-rendered mount region.

use isomorph_dom::embed::{STATE_ATTR, STATE_TYPE, TEMPLATE_ATTR, TEMPLATE_TYPE};
use isomorph_dom::ViewTree;
use isomorph_state::{decode_armored, ViewState};
use isomorph_template::{Syntax, TemplateSet};
use tracing::{debug, instrument};

use crate::dom::Dom;
use crate::mount::Mount;
use crate::ClientError;

/// Where a mount region lives and which client templates render it. The
/// state type it expects is the `S` passed to [`HydrationClient::hydrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub mount_id: String,
    /// Entry template first.
    pub templates: Vec<String>,
}

impl MountPoint {
    pub fn new<I, T>(mount_id: impl Into<String>, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            mount_id: mount_id.into(),
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HydrationClient<D> {
    dom: D,
}

impl<D: Dom + Clone> HydrationClient<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Attach to the mount region described by `point`.
    ///
    /// The region's current markup becomes the baseline as is; nothing is
    /// rendered and the document is not touched. Any failure leaves the page
    /// exactly as the server sent it.
    #[instrument(skip_all, fields(mount = %point.mount_id))]
    pub fn hydrate<S: ViewState>(&self, point: &MountPoint) -> Result<Mount<S, D>, ClientError> {
        if point.templates.is_empty() {
            return Err(ClientError::NoTemplates(point.mount_id.clone()));
        }

        let mut sources = Vec::with_capacity(point.templates.len());
        for name in &point.templates {
            let source = self
                .dom
                .script_text(TEMPLATE_TYPE, TEMPLATE_ATTR, name)
                .ok_or_else(|| ClientError::MissingTemplate(name.clone()))?;
            sources.push((name.clone(), source));
        }

        let armored = self
            .dom
            .script_text(STATE_TYPE, STATE_ATTR, &point.mount_id)
            .ok_or_else(|| ClientError::MissingState(point.mount_id.clone()))?;
        let state: S = decode_armored(&armored)?;
        debug!(bytes = armored.len(), "state decoded");

        let templates = TemplateSet::from_sources(Syntax::Client, sources)?;

        let root = self
            .dom
            .element_by_id(&point.mount_id)
            .ok_or_else(|| ClientError::MissingMount(point.mount_id.clone()))?;
        let baseline = ViewTree::parse(&self.dom.inner_html(&root))?;
        debug!(nodes = baseline.nodes.len(), "baseline parsed");

        Ok(Mount::new(point.mount_id.clone(), self.dom.clone(), root, templates, state, baseline))
    }
}
