//! Arena-based DOM: every node lives in one `indextree::Arena`.
//!
//! [`Document`] owns the arena plus the per-document machinery the rest of
//! the crate builds on:
//! - host primitives: create, clone, import, insert-before, detach
//! - connectedness and containment checks
//! - the parsed-selector cache
//! - the script-evaluation hook and the ready queue
//!
//! Removal is always detachment: node ids stay valid for the lifetime of the
//! document, so a [`crate::Collection`] can never dangle.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use tendril::StrTendril;

use crate::debug;
use crate::query::SelectorList;
use crate::ready::{ReadyHandlers, ReadyState};
use crate::{Error, Result};

/// Payload of every arena node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

/// What a node is. Dispatch on this instead of probing for capabilities.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The tree root; exactly one per document.
    Document,
    Element(ElementData),
    Text(StrTendril),
    Comment(StrTendril),
}

/// Tag plus attributes in source order.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: StrTendril,
    pub attrs: IndexMap<String, StrTendril>,
}

impl ElementData {
    /// Attribute value by (case-insensitive) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(&name.to_ascii_lowercase()).map(|v| &**v)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/1999/xhtml" => Namespace::Html,
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html, // default
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// An HTML document (or fragment workspace) backed by an arena.
pub struct Document {
    arena: Arena<NodeData>,

    /// The document node - parent of `<html>`.
    document: NodeId,

    /// Root element (usually `<html>`).
    root: NodeId,

    /// DOCTYPE if present (usually "html").
    doctype: Option<StrTendril>,

    /// Parsed selectors, keyed by source text.
    selectors: RefCell<HashMap<String, Rc<SelectorList>>>,

    /// Scripts that have already run; a node instance runs at most once.
    executed_scripts: HashSet<NodeId>,

    /// Embedder-installed script evaluator.
    script_eval: Option<Box<dyn FnMut(&str)>>,

    ready: ReadyHandlers,
}

impl Document {
    /// Empty document: `document > html > (head, body)`.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });
        let html = arena.new_node(element_data("html"));
        let head = arena.new_node(element_data("head"));
        let body = arena.new_node(element_data("body"));
        document.append(html, &mut arena);
        html.append(head, &mut arena);
        html.append(body, &mut arena);

        Document::from_parts(arena, document, None)
    }

    /// Parse a complete HTML document. See [`crate::parse`].
    pub fn parse(html: &str) -> Self {
        crate::parser::parse(html)
    }

    pub(crate) fn from_parts(
        arena: Arena<NodeData>,
        document: NodeId,
        doctype: Option<StrTendril>,
    ) -> Self {
        let root = document
            .children(&arena)
            .find(|&id| matches!(arena[id].get().kind, NodeKind::Element(_)))
            .unwrap_or(document);

        Document {
            arena,
            document,
            root,
            doctype,
            selectors: RefCell::new(HashMap::new()),
            executed_scripts: HashSet::new(),
            script_eval: None,
            ready: ReadyHandlers::new(),
        }
    }

    // ------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------

    /// Node data for a valid id. Ids handed out by this document are valid
    /// for its whole lifetime.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    /// The document node (parent of the root element).
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Root element, usually `<html>`.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// The `<body>` element if present.
    pub fn body(&self) -> Option<NodeId> {
        self.element_children(self.root)
            .into_iter()
            .find(|&id| self.tag(id) == Some("body"))
    }

    /// The `<head>` element if present.
    pub fn head(&self) -> Option<NodeId> {
        self.element_children(self.root)
            .into_iter()
            .find(|&id| self.tag(id) == Some("head"))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Element(_))
    }

    pub fn is_document_node(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Document)
    }

    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.get_mut(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Lowercase tag name, `None` for non-elements.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.as_element(id).map(|e| &*e.tag)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Children snapshot; safe to hold across mutation.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    /// Element children snapshot.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena)
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Preorder traversal including `id` itself.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Walk towards the root including `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena)
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if self.is_element(n) {
                return Some(n);
            }
            cur = self.next_sibling(n);
        }
        None
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(n) = cur {
            if self.is_element(n) {
                return Some(n);
            }
            cur = self.prev_sibling(n);
        }
        None
    }

    /// True when `needle` is a strict descendant of `haystack`.
    pub fn contains(&self, haystack: NodeId, needle: NodeId) -> bool {
        needle != haystack && needle.ancestors(&self.arena).skip(1).any(|a| a == haystack)
    }

    /// True when the node sits under the document node (or is it).
    pub fn is_connected(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|a| a == self.document)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached element. Tag is lowercased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let lower = tag.to_ascii_lowercase();
        self.arena.new_node(element_data(&lower))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Text(StrTendril::from(text)),
            ns: Namespace::Html,
        })
    }

    /// Deep copy of a subtree; the copy is detached and owns fresh ids.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let data = self.arena[id].get().clone();
        let copy = self.arena.new_node(data);
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            let child_copy = self.clone_subtree(child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }

    /// Deep copy of a subtree living in another document's arena. The copy
    /// is detached in this document.
    pub fn import_node(&mut self, src: &Document, node: NodeId) -> NodeId {
        let data = src.arena[node].get().clone();
        let copy = self.arena.new_node(data);
        for child in node.children(&src.arena) {
            let child_copy = self.import_node(src, child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// The one insertion primitive every adjacency operation reduces to.
    ///
    /// Detaches `node` from wherever it is and inserts it under `parent`,
    /// before `reference` (at the end when `reference` is `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        reference: Option<NodeId>,
        node: NodeId,
    ) -> Result<()> {
        if self.is_document_node(node) {
            return Err(Error::Hierarchy("cannot insert the document node".into()));
        }
        if !matches!(
            self.get(parent).kind,
            NodeKind::Element(_) | NodeKind::Document
        ) {
            return Err(Error::Hierarchy("parent cannot hold children".into()));
        }
        if node == parent || self.contains(node, parent) {
            return Err(Error::Hierarchy(
                "cannot insert a node into its own subtree".into(),
            ));
        }
        if let Some(r) = reference {
            if r == node {
                // Inserting a node before itself leaves it where it is.
                return Ok(());
            }
            if self.parent(r) != Some(parent) {
                return Err(Error::Hierarchy(
                    "reference node is not a child of the parent".into(),
                ));
            }
        }

        node.detach(&mut self.arena);
        match reference {
            Some(r) => r.insert_before(node, &mut self.arena),
            None => parent.append(node, &mut self.arena),
        }
        Ok(())
    }

    /// Append as last child, with the same checks as [`Self::insert_before`].
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.insert_before(parent, None, node)
    }

    /// Append for freshly created, detached nodes where the hierarchy checks
    /// cannot fail by construction.
    pub(crate) fn attach_end(&mut self, parent: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        parent.append(node, &mut self.arena);
    }

    /// Detach a node (and its subtree) from its parent. The node stays
    /// valid and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated text of the subtree (the node's own data for text and
    /// comment nodes).
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.get(id).kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => t.to_string(),
            _ => {
                let mut out = String::new();
                for n in id.descendants(&self.arena) {
                    if let NodeKind::Text(t) = &self.arena[n].get().kind {
                        out.push_str(t);
                    }
                }
                out
            }
        }
    }

    /// Replace a node's content with a single text node (or set the data of
    /// a text/comment node). Empty text just empties the node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        match &mut self.get_mut(id).kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => {
                *t = StrTendril::from(text);
            }
            _ => {
                for child in self.child_nodes(id) {
                    child.detach(&mut self.arena);
                }
                if !text.is_empty() {
                    let t = self.create_text(text);
                    self.attach_end(id, t);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id)?.attr(name)
    }

    /// Set an attribute on an element; no-op on other kinds.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let lower = name.to_ascii_lowercase();
        if let Some(el) = self.as_element_mut(id) {
            el.attrs.insert(lower, StrTendril::from(value));
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        let lower = name.to_ascii_lowercase();
        if let Some(el) = self.as_element_mut(id) {
            el.attrs.shift_remove(&lower);
        }
    }

    // ------------------------------------------------------------------
    // Script evaluation hook
    // ------------------------------------------------------------------

    /// Install the evaluator fed with the text of each script that goes
    /// live. Without one, script text is dropped (but still marked as run).
    pub fn on_script_eval(&mut self, hook: impl FnMut(&str) + 'static) {
        self.script_eval = Some(Box::new(hook));
    }

    pub(crate) fn script_already_run(&self, id: NodeId) -> bool {
        self.executed_scripts.contains(&id)
    }

    pub(crate) fn mark_script_run(&mut self, id: NodeId) {
        self.executed_scripts.insert(id);
    }

    pub(crate) fn eval_script_text(&mut self, text: &str) {
        debug!("evaluating inline script ({} bytes)", text.len());
        if let Some(hook) = self.script_eval.as_mut() {
            hook(text);
        }
    }

    // ------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------

    pub fn ready_state(&self) -> ReadyState {
        self.ready.state()
    }

    /// Run `callback` once the document is ready; immediately if it already
    /// is.
    pub fn ready(&mut self, callback: impl FnOnce(&mut Document) + 'static) {
        if self.ready.is_fired() {
            callback(self);
        } else {
            self.ready.push(Box::new(callback));
        }
    }

    /// Content-loaded trigger; first signal drains the ready queue.
    pub fn signal_content_loaded(&mut self) {
        let callbacks = self.ready.content_loaded();
        debug!("content loaded, draining {} callbacks", callbacks.len());
        for cb in callbacks {
            cb(self);
        }
    }

    /// Load trigger; drains the queue if content-loaded never fired.
    pub fn signal_load(&mut self) {
        let callbacks = self.ready.loaded();
        debug!("load, draining {} callbacks", callbacks.len());
        for cb in callbacks {
            cb(self);
        }
    }

    // ------------------------------------------------------------------
    // Selector cache
    // ------------------------------------------------------------------

    pub(crate) fn cached_selector(&self, source: &str) -> Result<Rc<SelectorList>> {
        if let Some(hit) = self.selectors.borrow().get(source) {
            return Ok(Rc::clone(hit));
        }
        let parsed = Rc::new(SelectorList::parse(source)?);
        debug!("parsed selector {:?}", source);
        self.selectors
            .borrow_mut()
            .insert(source.to_string(), Rc::clone(&parsed));
        Ok(parsed)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.arena.count())
            .field("root", &self.root)
            .field("doctype", &self.doctype)
            .field("ready_state", &self.ready.state())
            .finish_non_exhaustive()
    }
}

fn element_data(tag: &str) -> NodeData {
    NodeData {
        kind: NodeKind::Element(ElementData {
            tag: StrTendril::from(tag),
            attrs: IndexMap::new(),
        }),
        ns: Namespace::Html,
    }
}
