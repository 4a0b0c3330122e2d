//! HTML5 serialization of arena subtrees.
//!
//! Minified output with the escaping rules browsers apply to `innerHTML`:
//! text escapes `& < >`, attribute values escape `& " < >`, void elements
//! have no closing tag, and raw-text elements (`script`, `style`) emit their
//! contents verbatim.

use indextree::NodeId;

use crate::arena_dom::{Document, NodeKind};

/// Elements serialized without closing tags (and without children).
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    match &doc.get(id).kind {
        NodeKind::Document => {
            for child in doc.child_nodes(id) {
                write_node(doc, child, false, out);
            }
        }
        NodeKind::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(el) => {
            let tag: &str = &el.tag;
            out.push('<');
            out.push_str(tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');

            if is_void_element(tag) {
                return;
            }

            let raw = RAW_TEXT_ELEMENTS.contains(&tag);
            for child in doc.child_nodes(id) {
                write_node(doc, child, raw, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

impl Document {
    /// Serialize the whole document, doctype included.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if let Some(doctype) = self.doctype() {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
        write_node(self, self.document(), false, &mut out);
        out
    }

    /// Markup of the node itself plus its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, false, &mut out);
        out
    }

    /// Markup of the node's children only.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self
            .tag(id)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        let mut out = String::new();
        for child in self.child_nodes(id) {
            write_node(self, child, raw, &mut out);
        }
        out
    }
}
