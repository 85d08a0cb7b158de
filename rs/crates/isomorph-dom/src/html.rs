//! HTML output for view trees.

use crate::ViewNode;

/// Void elements that must not have closing tags
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is raw text: never escaped, never parsed as markup.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Render a single node to an HTML string.
pub fn render_to_html(node: &ViewNode) -> String {
    let mut buf = String::with_capacity(256);
    write_node(node, &mut buf);
    buf
}

/// Append the HTML for `node` to `buf`.
pub fn write_node(node: &ViewNode, buf: &mut String) {
    write_node_in(node, buf, false);
}

fn write_node_in(node: &ViewNode, buf: &mut String, raw: bool) {
    match node {
        ViewNode::Text { content } if raw => buf.push_str(content),
        ViewNode::Text { content } => buf.push_str(&escape_html(content)),
        ViewNode::Element {
            tag,
            attributes,
            children,
            ..
        } => {
            buf.push('<');
            buf.push_str(tag);
            for (name, value) in attributes {
                buf.push(' ');
                buf.push_str(name);
                buf.push_str("=\"");
                buf.push_str(&escape_attr(value));
                buf.push('"');
            }
            buf.push('>');

            // Closing tag (skip for void elements)
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            for child in children {
                write_node_in(child, buf, raw);
            }
            buf.push_str("</");
            buf.push_str(tag);
            buf.push('>');
        }
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
