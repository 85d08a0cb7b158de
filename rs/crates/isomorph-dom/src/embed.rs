//! How server output carries client templates and state inside one page.
//!
//! ```html
//! <script type="text/template" data-tmpl="index/index.tmpl">…verbatim source…</script>
//! <div id="list">…rendered markup…</div>
//! <script type="application/msgpack" data-for="list">…base64 state…</script>
//! ```
//!
//! Both the renderer and the hydrating client go through these constants; a
//! change here changes the wire format of every page.

use crate::html::escape_attr;

/// Type label of a client template source container.
pub const TEMPLATE_TYPE: &str = "text/template";
/// Attribute naming the template a source container holds.
pub const TEMPLATE_ATTR: &str = "data-tmpl";
/// Type label of an encoded state container.
pub const STATE_TYPE: &str = "application/msgpack";
/// Attribute naming the mount id an encoded state container belongs to.
pub const STATE_ATTR: &str = "data-for";

/// Write an inert template source container. `source` goes in unescaped.
pub fn write_template(buf: &mut String, name: &str, source: &str) {
    write_script(buf, TEMPLATE_TYPE, TEMPLATE_ATTR, name, source);
}

/// Write the element that hosts a mount region and its pre-rendered markup.
pub fn write_mount(buf: &mut String, mount_id: &str, markup: &str) {
    buf.push_str("<div id=\"");
    buf.push_str(&escape_attr(mount_id));
    buf.push_str("\">");
    buf.push_str(markup);
    buf.push_str("</div>");
}

/// Write an inert encoded-state container for `mount_id`.
pub fn write_state(buf: &mut String, mount_id: &str, armored: &str) {
    write_script(buf, STATE_TYPE, STATE_ATTR, mount_id, armored);
}

/// Raw text that would end a `<script>` early cannot be embedded inertly.
/// `<!--` counts too: followed by `<script` it switches the tokenizer into
/// escaped script data, where the container's own `</script>` no longer
/// closes it.
pub fn is_embeddable(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    !lower.contains("</script") && !lower.contains("<!--")
}

fn write_script(buf: &mut String, type_label: &str, attr: &str, value: &str, body: &str) {
    buf.push_str("<script type=\"");
    buf.push_str(type_label);
    buf.push_str("\" ");
    buf.push_str(attr);
    buf.push_str("=\"");
    buf.push_str(&escape_attr(value));
    buf.push_str("\">");
    buf.push_str(body);
    buf.push_str("</script>");
}
