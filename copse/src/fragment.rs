//! Fragment synthesis: a markup string becomes a list of detached nodes.
//!
//! Table parts cannot be parsed in a plain container, so each fragment is
//! parsed inside the container chain its leading tag demands (`<tr>` inside
//! `table > tbody`, cells inside `table > tbody > tr`, and so on), then the
//! children of the innermost container are lifted out.

use std::borrow::Cow;

use indextree::NodeId;

use crate::arena_dom::Document;
use crate::debug;

/// Tags that the self-closing expander must leave alone. Matched by prefix
/// against the tag name, like the expression this mirrors.
const EXPANDER_VOIDS: [&str; 10] = [
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
];

/// Container chain a fragment starting with `name` must be parsed inside.
fn container_chain(name: &str) -> &'static [&'static str] {
    match name {
        "tr" => &["table", "tbody"],
        "td" | "th" => &["table", "tbody", "tr"],
        "tbody" | "thead" | "tfoot" => &["table"],
        _ => &["div"],
    }
}

/// `<div>`, `<div/>` or `<div></div>` with nothing else: the tag name.
///
/// No leading whitespace and no attributes; the close tag, if present, must
/// repeat the name exactly.
pub(crate) fn parse_single_tag(html: &str) -> Option<&str> {
    let rest = html.strip_prefix('<')?;
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let (name, rest) = rest.split_at(name_len);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let rest = rest.strip_prefix('>')?;
    if rest.is_empty() {
        return Some(name);
    }
    let close = rest.strip_prefix("</")?.strip_suffix('>')?;
    (close == name).then_some(name)
}

/// Leading tag name of a fragment, `"!"` for doctype/comment openers.
pub(crate) fn fragment_tag(html: &str) -> Option<&str> {
    let rest = html.trim_start().strip_prefix('<')?;
    if let Some(r) = rest.strip_prefix('!') {
        return r.contains('>').then_some("!");
    }
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    rest[name_len..].contains('>').then(|| &rest[..name_len])
}

/// Does this string start a fragment rather than a selector?
pub(crate) fn looks_like_markup(s: &str) -> bool {
    s.starts_with('<') && fragment_tag(s).is_some()
}

/// Rewrite self-closing non-void tags (`<div/>`) into open/close pairs so
/// the parser nests their following content correctly. Quote-blind on
/// purpose: attribute values containing `>` will confuse it, exactly like
/// the expression this mirrors.
pub(crate) fn expand_self_closing(html: &str) -> Cow<'_, str> {
    if !html.contains("/>") {
        return Cow::Borrowed(html);
    }

    let mut out = String::with_capacity(html.len() + 16);
    let mut rest = html;
    loop {
        let Some(lt) = rest.find('<') else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..=lt]);
        rest = &rest[lt + 1..];

        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        if name_len == 0 {
            continue;
        }
        let name = &rest[..name_len];

        let Some(gt) = rest.find('>') else {
            out.push_str(rest);
            break;
        };
        let body = &rest[..gt];
        rest = &rest[gt + 1..];

        let void = EXPANDER_VOIDS
            .iter()
            .any(|v| name.len() >= v.len() && name[..v.len()].eq_ignore_ascii_case(v));
        if body.ends_with('/') && !void {
            out.push_str(&body[..body.len() - 1]);
            out.push_str("></");
            out.push_str(name);
            out.push('>');
        } else {
            out.push_str(body);
            out.push('>');
        }
    }
    Cow::Owned(out)
}

/// Properties applied to every element a fragment produces.
///
/// Attributes go first, then style declarations and dimensions, then
/// `value`, `text`, and `html` (so `html` wins over `text` when both are
/// set).
#[derive(Debug, Clone, Default)]
pub struct Props {
    text: Option<String>,
    html: Option<String>,
    value: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    css: Vec<(String, String)>,
    attrs: Vec<(String, String)>,
}

impl Props {
    pub fn new() -> Self {
        Props::default()
    }

    /// Replace the element's content with a text node.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Replace the element's content with parsed markup.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set the `value` attribute.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the `width` style in pixels.
    pub fn width(mut self, px: f64) -> Self {
        self.width = Some(px);
        self
    }

    /// Set the `height` style in pixels.
    pub fn height(mut self, px: f64) -> Self {
        self.height = Some(px);
        self
    }

    /// Add one style declaration.
    pub fn css(mut self, prop: impl Into<String>, value: impl Into<String>) -> Self {
        self.css.push((prop.into(), value.into()));
        self
    }

    /// Set one attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

/// Turn markup into detached nodes owned by `doc`.
///
/// `name` overrides container selection (callers that already sniffed the
/// leading tag pass it through); `props` is applied to every produced
/// element.
pub(crate) fn synthesize(
    doc: &mut Document,
    html: &str,
    name: Option<&str>,
    props: Option<&Props>,
) -> Vec<NodeId> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let mut nodes = Vec::new();

    if let Some(tag) = parse_single_tag(html) {
        nodes.push(doc.create_element(tag));
    } else {
        let expanded = expand_self_closing(html);
        let chain = match name.or_else(|| fragment_tag(&expanded)) {
            Some(n) => container_chain(&n.to_ascii_lowercase()),
            None => container_chain("*"),
        };
        debug!("synthesizing inside {:?}", chain);

        let mut wrapper = String::with_capacity(expanded.len() + 64);
        wrapper.push_str("<html><head></head><body>");
        for tag in chain {
            wrapper.push('<');
            wrapper.push_str(tag);
            wrapper.push('>');
        }
        wrapper.push_str(&expanded);
        for tag in chain.iter().rev() {
            wrapper.push_str("</");
            wrapper.push_str(tag);
            wrapper.push('>');
        }
        wrapper.push_str("</body></html>");

        let scratch = crate::parser::parse(&wrapper);
        let mut host = scratch.body();
        for tag in chain {
            host = host.and_then(|h| {
                scratch
                    .element_children(h)
                    .into_iter()
                    .find(|&c| scratch.tag(c) == Some(*tag))
            });
        }
        if let Some(host) = host {
            for child in scratch.child_nodes(host) {
                nodes.push(doc.import_node(&scratch, child));
            }
        }
    }
    debug!("synthesized {} nodes", nodes.len());

    if let Some(props) = props {
        for &node in &nodes {
            if doc.is_element(node) {
                apply_props(doc, node, props);
            }
        }
    }

    nodes
}

fn apply_props(doc: &mut Document, node: NodeId, props: &Props) {
    for (name, value) in &props.attrs {
        doc.set_attr(node, name, value);
    }
    for (prop, value) in &props.css {
        crate::accessors::set_style(doc, node, prop, value);
    }
    if let Some(w) = props.width {
        crate::accessors::set_style(doc, node, "width", &crate::accessors::px_value("width", w));
    }
    if let Some(h) = props.height {
        crate::accessors::set_style(doc, node, "height", &crate::accessors::px_value("height", h));
    }
    if let Some(v) = &props.value {
        doc.set_attr(node, "value", v);
    }
    if let Some(t) = &props.text {
        doc.set_text(node, t);
    }
    if let Some(h) = &props.html {
        crate::accessors::set_inner_html(doc, node, h);
    }
}
