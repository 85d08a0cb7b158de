//! list-demo — an item list rendered on the server and extended in the browser
//!
//! The constants and [`ViewState`] here are the contract between the server
//! binary and the browser build: both must agree on the mount id, the
//! template names and the shape of the state.

use isomorph_client::MountPoint;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
mod browser;

/// DOM id of the list's mount region.
pub const MOUNT_ID: &str = "list";
/// Page template, relative to [`VIEWS_DIR`].
pub const PAGE: &str = "index/index.html";
/// Client templates shipped with the page, entry template first.
pub const TEMPLATES: &[&str] = &["index/index.tmpl"];
pub const TITLE: &str = "Items";
/// Id of the form that adds an item.
pub const FORM_ID: &str = "newItemForm";

pub const VIEWS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/views");
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub items: Vec<String>,
}

impl ViewState {
    pub fn initial() -> Self {
        Self {
            items: vec!["First Item".into(), "Second Item".into(), "Third Item".into()],
        }
    }

    /// Append an item; blank input is ignored.
    pub fn add(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() {
            return false;
        }
        self.items.push(item.to_string());
        true
    }
}

pub fn mount_point() -> MountPoint {
    MountPoint::new(MOUNT_ID, TEMPLATES.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ignores_blank_input() {
        let mut state = ViewState::initial();
        assert!(!state.add("   "));
        assert!(state.add("  Fourth Item "));
        assert_eq!(state.items.last().map(String::as_str), Some("Fourth Item"));
        assert_eq!(state.items.len(), 4);
    }

    #[test]
    fn test_mount_point() {
        let point = mount_point();
        assert_eq!(point.mount_id, "list");
        assert_eq!(point.templates, vec!["index/index.tmpl".to_string()]);
    }
}
