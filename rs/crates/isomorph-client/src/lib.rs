//! isomorph-client — hydration and reconciliation of mount regions
//!
//! [`HydrationClient::hydrate`] finds the template sources and encoded state a
//! server page embedded for a mount id, decodes them, and parses the markup
//! already under the mount element into a baseline tree. From then on every
//! state change goes through [`Mount::reconcile`]: render, parse, diff against
//! the baseline, patch the live document, adopt the new tree.
//!
//! The live document sits behind the [`Dom`] trait. [`MemoryDom`] implements
//! it in process; the `web` feature adds [`WebDom`] over `web-sys`.

mod dom;
mod hydrate;
mod memory;
mod mount;
mod patch;
#[cfg(feature = "web")]
mod web;

pub use dom::{Dom, DomError};
pub use hydrate::{HydrationClient, MountPoint};
pub use memory::{MemoryDom, NodeId};
pub use mount::{Dispatch, Mount, SharedMount};
pub use patch::{apply, PatchApplicationError};
#[cfg(feature = "web")]
pub use web::WebDom;

use isomorph_dom::ParseError;
use isomorph_state::DecodeError;
use isomorph_template::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no element with id {0}")]
    MissingMount(String),
    #[error("no embedded source for template {0}")]
    MissingTemplate(String),
    #[error("no embedded state for mount {0}")]
    MissingState(String),
    #[error("mount {0} lists no templates")]
    NoTemplates(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Patch(#[from] PatchApplicationError),
    /// The live markup could not be re-read after a failed patch.
    #[error("mount {mount} is out of sync with the document: {source}")]
    Stale {
        mount: String,
        #[source]
        source: ParseError,
    },
}
