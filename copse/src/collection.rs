//! The ordered node collection and the polymorphic entry point.
//!
//! A [`Collection`] is nothing but node ids in a stable order plus the
//! selector that produced it (when one did). It never borrows the document:
//! every operation takes the [`Document`] explicitly, so holding collections
//! across mutations is fine - ids stay valid for the document's lifetime.

use std::collections::HashSet;
use std::ops::{Bound, Index, RangeBounds};

use indextree::NodeId;

use crate::arena_dom::Document;
use crate::fragment::{self, Props};
use crate::query;
use crate::trace;
use crate::Result;

/// An ordered list of nodes addressed by index.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    nodes: Vec<NodeId>,
    selector: Option<String>,
}

impl Collection {
    pub fn from_nodes(nodes: Vec<NodeId>) -> Self {
        Collection {
            nodes,
            selector: None,
        }
    }

    pub(crate) fn with_selector(nodes: Vec<NodeId>, selector: impl Into<String>) -> Self {
        Collection {
            nodes,
            selector: Some(selector.into()),
        }
    }

    /// The selector this collection was produced by, if any.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Member by index; negative indexes count from the end.
    pub fn get(&self, index: isize) -> Option<NodeId> {
        let len = self.nodes.len() as isize;
        let idx = if index < 0 { index + len } else { index };
        if (0..len).contains(&idx) {
            Some(self.nodes[idx as usize])
        } else {
            None
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn to_vec(&self) -> Vec<NodeId> {
        self.nodes.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Single-member collection at `index` (negative counts from the end).
    pub fn eq(&self, index: isize) -> Collection {
        Collection::from_nodes(self.get(index).into_iter().collect())
    }

    pub fn first(&self) -> Collection {
        self.eq(0)
    }

    pub fn last(&self) -> Collection {
        self.eq(-1)
    }

    /// Subrange as a new collection; out-of-range bounds clamp.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Collection {
        let len = self.nodes.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);

        let nodes = if start < end {
            self.nodes[start..end].to_vec()
        } else {
            Vec::new()
        };
        Collection::from_nodes(nodes)
    }

    /// Union preserving order of first appearance.
    pub fn add(&self, other: &Collection) -> Collection {
        let mut merged = self.nodes.clone();
        merged.extend(other.iter());
        Collection::from_nodes(uniq(merged))
    }

    /// Members the predicate keeps.
    pub fn filter_with(&self, mut keep: impl FnMut(NodeId) -> bool) -> Collection {
        Collection::from_nodes(self.nodes.iter().copied().filter(|&n| keep(n)).collect())
    }

    /// Position of `node` in this collection.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }
}

impl Index<usize> for Collection {
    type Output = NodeId;

    fn index(&self, index: usize) -> &NodeId {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter().copied()
    }
}

/// Drop duplicate ids, keeping first appearances in order.
pub(crate) fn uniq(nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    nodes.into_iter().filter(|n| seen.insert(*n)).collect()
}

/// Everything [`Document::query`] accepts.
///
/// Mirrors the argument soup of `$()`-style entry points as one enum:
/// strings dispatch on content (markup vs selector), node lists are wrapped,
/// callbacks are deferred until the document is ready.
pub enum Input<'a> {
    None,
    Text(&'a str),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    MaybeNodes(Vec<Option<NodeId>>),
    Collection(Collection),
    Ready(Box<dyn FnOnce(&mut Document)>),
}

impl Input<'_> {
    /// A callback to run once the document is ready.
    pub fn ready(callback: impl FnOnce(&mut Document) + 'static) -> Self {
        Input::Ready(Box::new(callback))
    }
}

impl From<()> for Input<'_> {
    fn from(_: ()) -> Self {
        Input::None
    }
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(text: &'a str) -> Self {
        Input::Text(text)
    }
}

impl From<NodeId> for Input<'_> {
    fn from(node: NodeId) -> Self {
        Input::Node(node)
    }
}

impl From<Vec<NodeId>> for Input<'_> {
    fn from(nodes: Vec<NodeId>) -> Self {
        Input::Nodes(nodes)
    }
}

impl From<&[NodeId]> for Input<'_> {
    fn from(nodes: &[NodeId]) -> Self {
        Input::Nodes(nodes.to_vec())
    }
}

impl From<Vec<Option<NodeId>>> for Input<'_> {
    fn from(nodes: Vec<Option<NodeId>>) -> Self {
        Input::MaybeNodes(nodes)
    }
}

impl From<Collection> for Input<'_> {
    fn from(collection: Collection) -> Self {
        Input::Collection(collection)
    }
}

impl From<&Collection> for Input<'_> {
    fn from(collection: &Collection) -> Self {
        Input::Collection(collection.clone())
    }
}

impl Document {
    /// The polymorphic entry point.
    ///
    /// - nothing: an empty collection
    /// - a string: markup synthesizes a detached fragment, anything else
    ///   resolves as a selector against the document (an all-whitespace
    ///   string is an empty collection, not an error)
    /// - a node or node list: wrapped as-is (`None` holes are dropped)
    /// - a collection: handed back unchanged
    /// - a ready callback: queued via [`Document::ready`], yielding the
    ///   document node
    pub fn query<'a>(&mut self, input: impl Into<Input<'a>>) -> Result<Collection> {
        match input.into() {
            Input::None => Ok(Collection::default()),
            Input::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(Collection::default());
                }
                if fragment::looks_like_markup(text) {
                    trace!("dispatching {:?} as markup", text);
                    let nodes = fragment::synthesize(self, text, None, None);
                    return Ok(Collection::from_nodes(nodes));
                }
                trace!("dispatching {:?} as selector", text);
                let nodes = query::query_all(self, self.document(), text)?;
                Ok(Collection::with_selector(nodes, text))
            }
            Input::Node(id) => Ok(Collection::from_nodes(vec![id])),
            Input::Nodes(nodes) => Ok(Collection::from_nodes(nodes)),
            Input::MaybeNodes(nodes) => Ok(Collection::from_nodes(
                nodes.into_iter().flatten().collect(),
            )),
            Input::Collection(collection) => Ok(collection),
            Input::Ready(callback) => {
                self.ready(callback);
                Ok(Collection::from_nodes(vec![self.document()]))
            }
        }
    }

    /// Resolve a selector against the whole document.
    pub fn select(&self, selector: &str) -> Result<Collection> {
        let nodes = query::query_all(self, self.document(), selector)?;
        Ok(Collection::with_selector(nodes, selector.trim()))
    }

    /// Synthesize markup (or plain text) into a detached collection.
    pub fn create(&mut self, markup: &str) -> Collection {
        Collection::from_nodes(fragment::synthesize(self, markup, None, None))
    }

    /// Like [`Document::create`], applying `props` to each produced element.
    pub fn create_with(&mut self, markup: &str, props: &Props) -> Collection {
        Collection::from_nodes(fragment::synthesize(self, markup, None, Some(props)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            "<html><body><ul><li>a</li><li>b</li><li>c</li></ul><p>end</p></body></html>",
        )
    }

    #[test]
    fn indexing_and_negative_get() {
        let d = doc();
        let items = d.select("li").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.get(0), Some(items[0]));
        assert_eq!(items.get(-1), Some(items[2]));
        assert_eq!(items.get(3), None);
        assert_eq!(items.get(-4), None);
        assert_eq!(items.index_of(items[1]), Some(1));
    }

    #[test]
    fn eq_first_last_slice() {
        let d = doc();
        let items = d.select("li").unwrap();

        assert_eq!(items.eq(1).to_vec(), vec![items[1]]);
        assert_eq!(items.eq(9).len(), 0);
        assert_eq!(items.first().to_vec(), vec![items[0]]);
        assert_eq!(items.last().to_vec(), vec![items[2]]);

        assert_eq!(items.slice(1..).to_vec(), vec![items[1], items[2]]);
        assert_eq!(items.slice(..2).len(), 2);
        assert_eq!(items.slice(1..100).len(), 2);
        assert_eq!(items.slice(2..1).len(), 0);
    }

    #[test]
    fn add_dedups_preserving_order() {
        let d = doc();
        let items = d.select("li").unwrap();
        let tail = items.slice(1..);
        let para = d.select("p").unwrap();

        let merged = items.add(&tail).add(&para);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.to_vec()[..3], items.to_vec()[..]);
    }

    #[test]
    fn selector_is_remembered() {
        let d = doc();
        assert_eq!(d.select("li").unwrap().selector(), Some("li"));
        assert_eq!(d.select("  li ").unwrap().selector(), Some("li"));
    }

    #[test]
    fn dispatch_selector_vs_markup() {
        let mut d = doc();

        let found = d.query("li").unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|n| d.is_connected(n)));

        let made = d.query("<li>new</li>").unwrap();
        assert_eq!(made.len(), 1);
        assert!(!d.is_connected(made[0]));

        // Leading whitespace still routes to markup.
        let made = d.query("   <p>x</p>").unwrap();
        assert_eq!(made.len(), 1);
        assert_eq!(d.tag(made[0]), Some("p"));
    }

    #[test]
    fn dispatch_empty_and_whitespace() {
        let mut d = doc();
        assert!(d.query(()).unwrap().is_empty());
        assert!(d.query("").unwrap().is_empty());
        assert!(d.query("   ").unwrap().is_empty());
    }

    #[test]
    fn dispatch_nodes_and_collections() {
        let mut d = doc();
        let items = d.select("li").unwrap();

        let one = d.query(items[0]).unwrap();
        assert_eq!(one.to_vec(), vec![items[0]]);

        let many = d.query(items.to_vec()).unwrap();
        assert_eq!(many.len(), 3);

        let holes: Vec<Option<NodeId>> = vec![Some(items[0]), None, Some(items[2])];
        let compacted = d.query(holes).unwrap();
        assert_eq!(compacted.to_vec(), vec![items[0], items[2]]);

        let same = d.query(&items).unwrap();
        assert_eq!(same.to_vec(), items.to_vec());
    }

    #[test]
    fn dispatch_bad_selector_is_an_error() {
        let mut d = doc();
        assert!(d.query("li >").is_err());
        assert!(d.select("::after").is_err());
    }

    #[test]
    fn dispatch_ready_callback() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut d = doc();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);

        let wrapped = d.query(Input::ready(move |_| flag.set(true))).unwrap();
        assert_eq!(wrapped.to_vec(), vec![d.document()]);
        assert!(!ran.get());

        d.signal_content_loaded();
        assert!(ran.get());
    }
}
