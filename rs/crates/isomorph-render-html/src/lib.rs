//! isomorph-render-html — server side of an isomorphic page
//!
//! A page is rendered in two passes. The views set (server syntax) first
//! produces the source of each client template, seeing `state` and the
//! request's server-only `context`; those sources are parsed with
//! the client syntax, the entry template is executed against the state, and
//! the result is embedded together with the template sources and the encoded
//! state. The page template then places that embedding wherever it writes
//! `{{ mount }}`.
//!
//! Output is built in memory; a failure at any step yields an error and no
//! HTML at all.

use std::sync::Arc;

use isomorph_dom::embed::{is_embeddable, write_mount, write_state, write_template};
use isomorph_dom::{ParseError, ViewTree};
use isomorph_state::{encode_armored, EncodeError, ViewState};
use isomorph_template::{Syntax, TemplateEngine, TemplateError, TemplateSet};
use minijinja::Value;
use serde::Serialize;
use tracing::{debug, error, instrument};

/// Everything needed to render one page with one mount region.
pub struct RenderRequest<'a, S, C: ?Sized = ()> {
    /// Page template in the views set, e.g. `index/index.html`.
    pub page: &'a str,
    /// DOM id of the mount region.
    pub mount_id: &'a str,
    /// Client templates to ship, entry template first.
    pub templates: &'a [&'a str],
    pub state: &'a S,
    /// Server-only data for the page template and for the pass that
    /// produces client template sources. Never shipped to the client.
    pub context: &'a C,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("mount {0} has no client templates")]
    NoTemplates(String),
    #[error("template {0} cannot be embedded in a script element")]
    Unembeddable(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("markup rendered for mount {mount} is malformed: {source}")]
    Markup {
        mount: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Serialize)]
struct PageContext<'a, S, C: ?Sized> {
    mount: Value,
    state: &'a S,
    context: &'a C,
}

/// Data seen while producing a client template's source.
#[derive(Serialize)]
struct SourceContext<'a, S, C: ?Sized> {
    state: &'a S,
    context: &'a C,
}

/// Renders pages from a views set loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServerRenderer {
    views: Arc<TemplateSet>,
}

impl ServerRenderer {
    pub fn new(views: Arc<TemplateSet>) -> Self {
        Self { views }
    }

    pub fn views(&self) -> &TemplateSet {
        &self.views
    }

    /// Render a full page.
    #[instrument(skip_all, fields(page = req.page, mount = req.mount_id))]
    pub fn render<S: ViewState, C: Serialize + ?Sized>(&self, req: &RenderRequest<'_, S, C>) -> Result<String, RenderError> {
        let result = self.embed(req).and_then(|mount| {
            let ctx = PageContext {
                mount: Value::from_safe_string(mount),
                state: req.state,
                context: req.context,
            };
            Ok(self.views.render(req.page, &ctx)?)
        });
        match &result {
            Ok(html) => debug!(bytes = html.len(), "page rendered"),
            Err(err) => error!(%err, "page render failed"),
        }
        result
    }

    /// Render only the embedding of the mount region: template sources, the
    /// pre-rendered region and the encoded state.
    pub fn embed<S: ViewState, C: Serialize + ?Sized>(&self, req: &RenderRequest<'_, S, C>) -> Result<String, RenderError> {
        if req.templates.is_empty() {
            return Err(RenderError::NoTemplates(req.mount_id.to_string()));
        }

        let source_ctx = SourceContext {
            state: req.state,
            context: req.context,
        };
        let mut sources = Vec::with_capacity(req.templates.len());
        for &name in req.templates {
            let source = self.views.render(name, &source_ctx)?;
            if !is_embeddable(&source) {
                return Err(RenderError::Unembeddable(name.to_string()));
            }
            sources.push((name, source));
        }

        let client = TemplateSet::from_sources(Syntax::Client, sources.iter().map(|(n, s)| (*n, s.as_str())))?;
        let markup = client.render(req.templates[0], req.state)?;
        // The client parses this region on hydration; refuse to ship what it can't.
        ViewTree::parse(&markup).map_err(|source| RenderError::Markup {
            mount: req.mount_id.to_string(),
            source,
        })?;
        let armored = encode_armored(req.state)?;

        let mut buf = String::with_capacity(markup.len() + armored.len() + 512);
        for (name, source) in &sources {
            write_template(&mut buf, name, source);
        }
        write_mount(&mut buf, req.mount_id, &markup);
        write_state(&mut buf, req.mount_id, &armored);
        Ok(buf)
    }
}
