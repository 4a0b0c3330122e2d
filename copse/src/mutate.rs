//! Structural mutation: the four adjacency operations (`before`, `after`,
//! `prepend`, `append`) expressed as one insert-before engine, plus wrapping,
//! replacement, and removal.
//!
//! Rules the engine enforces:
//! - with more than one target, every target receives deep clones and the
//!   original nodes are never attached
//! - inserting next to a parentless target discards the content
//! - inline scripts re-execute when they become part of the document, once
//!   per node instance (clones are new instances)

use indextree::NodeId;

use crate::arena_dom::Document;
use crate::collection::{Collection, Input};
use crate::debug;
use crate::fragment;
use crate::Result;

/// Content accepted by the structural operations: markup to synthesize or
/// nodes that already exist.
#[derive(Clone)]
pub enum Content<'a> {
    Markup(&'a str),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Collection(Collection),
}

impl<'a> From<&'a str> for Content<'a> {
    fn from(markup: &'a str) -> Self {
        Content::Markup(markup)
    }
}

impl From<NodeId> for Content<'_> {
    fn from(node: NodeId) -> Self {
        Content::Node(node)
    }
}

impl From<Vec<NodeId>> for Content<'_> {
    fn from(nodes: Vec<NodeId>) -> Self {
        Content::Nodes(nodes)
    }
}

impl From<&[NodeId]> for Content<'_> {
    fn from(nodes: &[NodeId]) -> Self {
        Content::Nodes(nodes.to_vec())
    }
}

impl From<Collection> for Content<'_> {
    fn from(collection: Collection) -> Self {
        Content::Collection(collection)
    }
}

impl From<&Collection> for Content<'_> {
    fn from(collection: &Collection) -> Self {
        Content::Collection(collection.clone())
    }
}

fn resolve(doc: &mut Document, content: &Content<'_>) -> Vec<NodeId> {
    match content {
        Content::Markup(html) => fragment::synthesize(doc, html, None, None),
        Content::Node(id) => vec![*id],
        Content::Nodes(ids) => ids.clone(),
        Content::Collection(c) => c.to_vec(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    After,
    Prepend,
    Before,
    Append,
}

/// Where content goes relative to a target, as (parent, reference) for the
/// insert-before primitive. `None` when the target has no parent to insert
/// next to.
fn anchor(doc: &Document, target: NodeId, pos: Position) -> Option<(NodeId, Option<NodeId>)> {
    match pos {
        Position::After => doc.parent(target).map(|p| (p, doc.next_sibling(target))),
        Position::Prepend => Some((target, doc.first_child(target))),
        Position::Before => doc.parent(target).map(|p| (p, Some(target))),
        Position::Append => Some((target, None)),
    }
}

fn insert(
    doc: &mut Document,
    targets: &Collection,
    content: Content<'_>,
    pos: Position,
) -> Result<()> {
    let nodes = resolve(doc, &content);
    if nodes.is_empty() {
        return Ok(());
    }
    let copy_by_clone = targets.len() > 1;
    debug!("{:?}: {} nodes, {} targets", pos, nodes.len(), targets.len());

    for &target in targets.nodes() {
        let Some((parent, reference)) = anchor(doc, target, pos) else {
            // No parent to insert next to: the content is discarded. When
            // fanning out by clone the originals are left untouched.
            if !copy_by_clone {
                for &node in &nodes {
                    doc.detach(node);
                }
            }
            continue;
        };
        let parent_connected = doc.is_connected(parent);

        for &node in &nodes {
            let node = if copy_by_clone {
                doc.clone_subtree(node)
            } else {
                node
            };
            doc.insert_before(parent, reference, node)?;
            if parent_connected {
                run_scripts(doc, node);
            }
        }
    }
    Ok(())
}

/// Execute every runnable inline script in the subtree that has not run
/// before. Marked as run before evaluation.
fn run_scripts(doc: &mut Document, node: NodeId) {
    let subtree: Vec<NodeId> = doc.descendants(node).collect();
    for el in subtree {
        if !is_runnable_script(doc, el) || doc.script_already_run(el) {
            continue;
        }
        let text = doc.text_content(el);
        doc.mark_script_run(el);
        doc.eval_script_text(&text);
    }
}

/// Inline script with no `src` and a JavaScript (or absent) `type`.
fn is_runnable_script(doc: &Document, id: NodeId) -> bool {
    let Some(el) = doc.as_element(id) else {
        return false;
    };
    if &*el.tag != "script" || el.attr("src").is_some() {
        return false;
    }
    matches!(el.attr("type"), None | Some("") | Some("text/javascript"))
}

impl Collection {
    /// Insert content as the last children of each member.
    pub fn append<'a>(&self, doc: &mut Document, content: impl Into<Content<'a>>) -> Result<&Self> {
        insert(doc, self, content.into(), Position::Append)?;
        Ok(self)
    }

    /// Insert content as the first children of each member.
    pub fn prepend<'a>(
        &self,
        doc: &mut Document,
        content: impl Into<Content<'a>>,
    ) -> Result<&Self> {
        insert(doc, self, content.into(), Position::Prepend)?;
        Ok(self)
    }

    /// Insert content as the previous siblings of each member.
    pub fn before<'a>(&self, doc: &mut Document, content: impl Into<Content<'a>>) -> Result<&Self> {
        insert(doc, self, content.into(), Position::Before)?;
        Ok(self)
    }

    /// Insert content as the next siblings of each member.
    pub fn after<'a>(&self, doc: &mut Document, content: impl Into<Content<'a>>) -> Result<&Self> {
        insert(doc, self, content.into(), Position::After)?;
        Ok(self)
    }

    /// Append the members to each node `target` resolves to.
    pub fn append_to<'a>(&self, doc: &mut Document, target: impl Into<Input<'a>>) -> Result<&Self> {
        let targets = doc.query(target)?;
        insert(doc, &targets, Content::Collection(self.clone()), Position::Append)?;
        Ok(self)
    }

    /// Prepend the members to each node `target` resolves to.
    pub fn prepend_to<'a>(
        &self,
        doc: &mut Document,
        target: impl Into<Input<'a>>,
    ) -> Result<&Self> {
        let targets = doc.query(target)?;
        insert(doc, &targets, Content::Collection(self.clone()), Position::Prepend)?;
        Ok(self)
    }

    /// Insert the members before each node `target` resolves to.
    pub fn insert_before<'a>(
        &self,
        doc: &mut Document,
        target: impl Into<Input<'a>>,
    ) -> Result<&Self> {
        let targets = doc.query(target)?;
        insert(doc, &targets, Content::Collection(self.clone()), Position::Before)?;
        Ok(self)
    }

    /// Insert the members after each node `target` resolves to.
    pub fn insert_after<'a>(
        &self,
        doc: &mut Document,
        target: impl Into<Input<'a>>,
    ) -> Result<&Self> {
        let targets = doc.query(target)?;
        insert(doc, &targets, Content::Collection(self.clone()), Position::After)?;
        Ok(self)
    }

    /// Detach each member from the tree. Ids stay valid; a detached subtree
    /// can be re-inserted later.
    pub fn remove(&self, doc: &mut Document) -> &Self {
        for node in self {
            doc.detach(node);
        }
        self
    }

    /// Drop all children of each member.
    pub fn empty(&self, doc: &mut Document) -> &Self {
        for node in self {
            for child in doc.child_nodes(node) {
                doc.detach(child);
            }
        }
        self
    }

    /// Deep-copy each member; the copies are detached and count as new node
    /// instances (their scripts may run again).
    pub fn clone_nodes(&self, doc: &mut Document) -> Collection {
        Collection::from_nodes(self.iter().map(|n| doc.clone_subtree(n)).collect())
    }

    /// Replace each member with the content (insert before, then detach).
    pub fn replace_with<'a>(
        &self,
        doc: &mut Document,
        content: impl Into<Content<'a>>,
    ) -> Result<&Self> {
        self.before(doc, content)?;
        self.remove(doc);
        Ok(self)
    }

    /// Wrap one structure around ALL members: the structure lands where the
    /// first member was, and the members move into its innermost first
    /// element descendant.
    pub fn wrap_all<'a>(
        &self,
        doc: &mut Document,
        structure: impl Into<Content<'a>>,
    ) -> Result<&Self> {
        let Some(first) = self.get(0) else {
            return Ok(self);
        };
        let roots = resolve(doc, &structure.into());
        if roots.is_empty() {
            return Ok(self);
        }

        Collection::from_nodes(vec![first]).before(doc, roots.clone())?;

        // Drill down: element children of the current level, keep the first.
        let mut hosts = roots;
        loop {
            let kids: Vec<NodeId> = hosts
                .iter()
                .flat_map(|&r| doc.element_children(r))
                .collect();
            match kids.first() {
                Some(&leaf) => hosts = vec![leaf],
                None => break,
            }
        }

        Collection::from_nodes(hosts).append(doc, self.to_vec())?;
        Ok(self)
    }

    /// Wrap a structure around each member separately. The structure is
    /// cloned when it is attached somewhere or when there are several
    /// members.
    pub fn wrap<'a>(&self, doc: &mut Document, structure: impl Into<Content<'a>>) -> Result<&Self> {
        if self.is_empty() {
            return Ok(self);
        }
        let roots = resolve(doc, &structure.into());
        let Some(&dom) = roots.first() else {
            return Ok(self);
        };
        let needs_clone = doc.parent(dom).is_some() || self.len() > 1;

        for node in self {
            let wrapper = if needs_clone {
                doc.clone_subtree(dom)
            } else {
                dom
            };
            Collection::from_nodes(vec![node]).wrap_all(doc, wrapper)?;
        }
        Ok(self)
    }

    /// Wrap a structure around the contents of each member. Markup is
    /// synthesized fresh for every member.
    pub fn wrap_inner<'a>(
        &self,
        doc: &mut Document,
        structure: impl Into<Content<'a>>,
    ) -> Result<&Self> {
        let content = structure.into();
        for node in self {
            let target = Collection::from_nodes(vec![node]);
            let inner = target.contents(doc);
            if inner.is_empty() {
                target.append(doc, content.clone())?;
            } else {
                inner.wrap_all(doc, content.clone())?;
            }
        }
        Ok(self)
    }

    /// Replace each member's parent with that parent's element children.
    /// Text and comment nodes directly under the parent go away with it.
    pub fn unwrap(&self, doc: &mut Document) -> Result<&Self> {
        let parents = self.parent(doc, ())?;
        for parent in &parents {
            let kids = doc.element_children(parent);
            Collection::from_nodes(vec![parent]).replace_with(doc, kids)?;
        }
        Ok(self)
    }
}
