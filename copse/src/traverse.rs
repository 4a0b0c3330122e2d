//! Relative motion from a collection: descent, ascent, and sibling walks,
//! each optionally refined by a [`Filter`].

use indextree::NodeId;

use crate::arena_dom::Document;
use crate::collection::{uniq, Collection};
use crate::query;
use crate::Result;

/// Refinement accepted by most traversal operations: nothing, a selector,
/// or an explicit set of candidate nodes.
#[derive(Clone, Copy)]
pub enum Filter<'a> {
    None,
    Selector(&'a str),
    Nodes(&'a Collection),
}

impl From<()> for Filter<'_> {
    fn from(_: ()) -> Self {
        Filter::None
    }
}

impl<'a> From<&'a str> for Filter<'a> {
    fn from(selector: &'a str) -> Self {
        Filter::Selector(selector)
    }
}

impl<'a> From<&'a Collection> for Filter<'a> {
    fn from(collection: &'a Collection) -> Self {
        Filter::Nodes(collection)
    }
}

impl<'a> From<Option<&'a str>> for Filter<'a> {
    fn from(selector: Option<&'a str>) -> Self {
        match selector {
            Some(s) => Filter::Selector(s),
            None => Filter::None,
        }
    }
}

fn filtered(doc: &Document, nodes: Vec<NodeId>, filter: Filter<'_>) -> Result<Collection> {
    let collection = Collection::from_nodes(nodes);
    match filter {
        Filter::None => Ok(collection),
        other => collection.filter(doc, other),
    }
}

impl Collection {
    /// Descendants of each member matching `target`, in member order.
    ///
    /// With a node-set target, keeps the candidates contained in (strictly
    /// below) any member. An empty selector finds nothing.
    pub fn find<'a>(&self, doc: &Document, target: impl Into<Filter<'a>>) -> Result<Collection> {
        match target.into() {
            Filter::None => Ok(Collection::default()),
            Filter::Selector(sel) => {
                let sel = sel.trim();
                if sel.is_empty() {
                    return Ok(Collection::default());
                }
                let mut found = Vec::new();
                for node in self {
                    found.extend(query::query_all(doc, node, sel)?);
                }
                Ok(Collection::with_selector(found, sel))
            }
            Filter::Nodes(candidates) => Ok(candidates
                .filter_with(|n| self.iter().any(|member| doc.contains(member, n)))),
        }
    }

    /// First ancestor-or-self of each member matching `target`. The walk
    /// stops at the document node.
    pub fn closest<'a>(
        &self,
        doc: &Document,
        target: impl Into<Filter<'a>>,
    ) -> Result<Collection> {
        self.climb(doc, target.into(), None)
    }

    /// [`Collection::closest`] with an upper boundary: the climb does not
    /// continue past `boundary`. The boundary node itself is still tested.
    pub fn closest_within<'a>(
        &self,
        doc: &Document,
        target: impl Into<Filter<'a>>,
        boundary: NodeId,
    ) -> Result<Collection> {
        self.climb(doc, target.into(), Some(boundary))
    }

    fn climb(
        &self,
        doc: &Document,
        target: Filter<'_>,
        boundary: Option<NodeId>,
    ) -> Result<Collection> {
        let mut found = Vec::new();
        for node in self {
            let mut cur = Some(node);
            while let Some(n) = cur {
                if doc.is_document_node(n) {
                    break;
                }
                let hit = match target {
                    Filter::None => false,
                    Filter::Selector(sel) => query::matches_selector(doc, n, sel)?,
                    Filter::Nodes(set) => set.index_of(n).is_some(),
                };
                if hit {
                    found.push(n);
                    break;
                }
                if boundary == Some(n) {
                    break;
                }
                cur = doc.parent(n);
            }
        }
        Ok(Collection::from_nodes(uniq(found)))
    }

    /// All ancestors of all members, nearest first (level by level), without
    /// duplicates and without the document node.
    pub fn parents<'a>(
        &self,
        doc: &Document,
        filter: impl Into<Filter<'a>>,
    ) -> Result<Collection> {
        let mut ancestors: Vec<NodeId> = Vec::new();
        let mut level = self.to_vec();
        while !level.is_empty() {
            let mut next = Vec::new();
            for node in level {
                let Some(parent) = doc.parent(node) else {
                    continue;
                };
                if doc.is_document_node(parent) || ancestors.contains(&parent) {
                    continue;
                }
                ancestors.push(parent);
                next.push(parent);
            }
            level = next;
        }
        filtered(doc, ancestors, filter.into())
    }

    /// Direct parents, deduplicated. The document node counts: the parent of
    /// the root element is the document.
    pub fn parent<'a>(&self, doc: &Document, filter: impl Into<Filter<'a>>) -> Result<Collection> {
        let nodes = uniq(self.iter().filter_map(|n| doc.parent(n)).collect());
        filtered(doc, nodes, filter.into())
    }

    /// Element children of each member.
    pub fn children<'a>(
        &self,
        doc: &Document,
        filter: impl Into<Filter<'a>>,
    ) -> Result<Collection> {
        let mut nodes = Vec::new();
        for node in self {
            nodes.extend(doc.element_children(node));
        }
        filtered(doc, nodes, filter.into())
    }

    /// Every child node of each member, text and comments included.
    pub fn contents(&self, doc: &Document) -> Collection {
        let mut nodes = Vec::new();
        for node in self {
            nodes.extend(doc.child_nodes(node));
        }
        Collection::from_nodes(nodes)
    }

    /// Element siblings of each member, the member itself excluded.
    pub fn siblings<'a>(
        &self,
        doc: &Document,
        filter: impl Into<Filter<'a>>,
    ) -> Result<Collection> {
        let mut nodes = Vec::new();
        for node in self {
            let Some(parent) = doc.parent(node) else {
                continue;
            };
            nodes.extend(
                doc.element_children(parent)
                    .into_iter()
                    .filter(|&c| c != node),
            );
        }
        filtered(doc, nodes, filter.into())
    }

    /// Next element sibling of each member.
    pub fn next<'a>(&self, doc: &Document, filter: impl Into<Filter<'a>>) -> Result<Collection> {
        let nodes = self
            .iter()
            .filter_map(|n| doc.next_element_sibling(n))
            .collect();
        filtered(doc, nodes, filter.into())
    }

    /// Previous element sibling of each member.
    pub fn prev<'a>(&self, doc: &Document, filter: impl Into<Filter<'a>>) -> Result<Collection> {
        let nodes = self
            .iter()
            .filter_map(|n| doc.prev_element_sibling(n))
            .collect();
        filtered(doc, nodes, filter.into())
    }

    /// Members matching `target`. An empty filter keeps nothing.
    pub fn filter<'a>(&self, doc: &Document, target: impl Into<Filter<'a>>) -> Result<Collection> {
        match target.into() {
            Filter::None => Ok(Collection::default()),
            Filter::Selector(sel) => {
                let mut kept = Vec::new();
                for node in self {
                    if query::matches_selector(doc, node, sel)? {
                        kept.push(node);
                    }
                }
                Ok(Collection::from_nodes(kept))
            }
            Filter::Nodes(allowed) => Ok(self.filter_with(|n| allowed.index_of(n).is_some())),
        }
    }

    /// Members NOT matching `target`. An empty filter keeps everything.
    pub fn not<'a>(&self, doc: &Document, target: impl Into<Filter<'a>>) -> Result<Collection> {
        let excluded = match target.into() {
            Filter::None => return Ok(self.clone()),
            other => self.filter(doc, other)?,
        };
        Ok(self.filter_with(|n| excluded.index_of(n).is_none()))
    }

    /// Members whose subtree contains a match for `target`.
    pub fn has<'a>(&self, doc: &Document, target: impl Into<Filter<'a>>) -> Result<Collection> {
        match target.into() {
            Filter::None => Ok(Collection::default()),
            Filter::Selector(sel) => {
                let sel = sel.trim();
                if sel.is_empty() {
                    return Ok(Collection::default());
                }
                let mut kept = Vec::new();
                for node in self {
                    if !query::query_all(doc, node, sel)?.is_empty() {
                        kept.push(node);
                    }
                }
                Ok(Collection::from_nodes(kept))
            }
            Filter::Nodes(wanted) => {
                Ok(self.filter_with(|n| wanted.iter().any(|w| doc.contains(n, w))))
            }
        }
    }

    /// Does the first member match the selector?
    pub fn is(&self, doc: &Document, selector: &str) -> Result<bool> {
        match self.get(0) {
            Some(first) => query::matches_selector(doc, first, selector),
            None => Ok(false),
        }
    }

    /// Position of the first member among its parent's element children.
    pub fn index(&self, doc: &Document) -> Option<usize> {
        let first = self.get(0)?;
        let parent = doc.parent(first)?;
        doc.element_children(parent)
            .into_iter()
            .position(|c| c == first)
    }
}
