//! Chainable node collections over an arena-based HTML DOM.
//!
//! copse parses HTML documents and fragments with html5ever into an
//! [`indextree`] arena and exposes an ordered, index-addressable
//! [`Collection`] for selecting, traversing, and restructuring nodes in the
//! manner of jQuery-family libraries:
//!
//! - **Parsing**: browser-compatible HTML5 parsing with full error recovery,
//!   for whole documents and for fragments (table parts included)
//! - **Selection**: id/class/tag fast paths plus a CSS selector engine with
//!   combinators, attribute operators, and structural pseudo-classes
//! - **Mutation**: the four adjacency insertions reduced to one
//!   insert-before primitive, with clone fan-out across multiple targets,
//!   wrap/unwrap/replace, and script re-execution on live attachment
//! - **Serialization**: HTML5-correct output with proper escaping
//!
//! # Example
//!
//! ```rust
//! use copse::Document;
//!
//! let mut doc = Document::parse("<html><body><ul id=menu></ul></body></html>");
//!
//! let items = doc.create("<li>first</li><li>second</li>");
//! let menu = doc.select("#menu").unwrap();
//! menu.append(&mut doc, &items).unwrap();
//!
//! let found = doc.select("ul > li").unwrap();
//! assert_eq!(found.len(), 2);
//! assert_eq!(found.text(&doc), "firstsecond");
//! ```

use std::fmt;

mod tracing_macros;

pub mod arena_dom;
pub mod collection;
pub mod fragment;
pub mod mutate;
pub mod query;
pub mod ready;
pub mod serialize;
pub mod traverse;

mod accessors;
mod parser;

pub(crate) use tracing_macros::{debug, trace};

// Re-export the core types at the crate root for convenience
pub use arena_dom::{Document, ElementData, Namespace, NodeData, NodeKind};
pub use collection::{Collection, Input};
pub use fragment::Props;
pub use indextree::NodeId;
pub use mutate::Content;
pub use parser::parse;
pub use ready::ReadyState;
pub use traverse::Filter;

/// Errors surfaced by selector parsing and structural mutation.
///
/// Everything else in the crate is a silent no-op: empty inputs, orphan
/// targets, and missing attributes are normal states, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A selector string could not be parsed or uses unsupported syntax.
    Selector(String),
    /// A structural mutation would corrupt the tree (for example inserting
    /// a node into its own subtree).
    Hierarchy(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Selector(msg) => write!(f, "invalid selector: {msg}"),
            Error::Hierarchy(msg) => write!(f, "invalid insertion: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
