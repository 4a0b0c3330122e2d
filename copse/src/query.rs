//! Selector resolution: fast paths for simple id/class/tag lookups and a
//! right-to-left matching engine for everything else.
//!
//! Supported grammar: type and `*` selectors, `#id`, `.class`, attribute
//! conditions (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`, quoted or bare
//! values), the four combinators (descendant, `>`, `+`, `~`), selector
//! groups, and the structural pseudo-classes `:first-child`, `:last-child`,
//! `:only-child`, `:empty`, `:root`, `:nth-child()`. Anything else is an
//! [`Error::Selector`], which callers propagate untouched.

use indextree::NodeId;
use smallvec::SmallVec;

use crate::arena_dom::{Document, NodeKind};
use crate::trace;
use crate::{Error, Result};

/// A single token containing only `[\w-]` characters, i.e. something a
/// plain id/class/tag lookup can serve without the engine.
pub(crate) fn is_simple_name(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy)]
enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Root,
    /// `An+B` with `a == 0` meaning a fixed position.
    NthChild(i32, i32),
}

/// One compound selector plus its relation to the compound on its left.
#[derive(Debug, Clone)]
struct SelectorStep {
    combinator: Combinator,
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
    attrs: SmallVec<[AttrCondition; 2]>,
    pseudos: SmallVec<[PseudoClass; 1]>,
}

impl SelectorStep {
    fn new(combinator: Combinator) -> Self {
        SelectorStep {
            combinator,
            tag: None,
            id: None,
            classes: SmallVec::new(),
            attrs: SmallVec::new(),
            pseudos: SmallVec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct SelectorChain {
    steps: Vec<SelectorStep>,
}

/// A parsed selector: one or more comma-separated chains.
#[derive(Debug, Clone)]
pub struct SelectorList {
    chains: Vec<SelectorChain>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<SelectorList> {
        if source.trim().is_empty() {
            return Err(Error::Selector("empty selector".into()));
        }
        let chains = split_groups(source)?
            .into_iter()
            .map(parse_chain)
            .collect::<Result<Vec<_>>>()?;
        Ok(SelectorList { chains })
    }

    /// Does this element match any chain? Always `false` for non-elements.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        if !doc.is_element(id) {
            return false;
        }
        self.chains
            .iter()
            .any(|chain| matches_chain(doc, id, &chain.steps))
    }
}

// ---------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------

fn split_groups(source: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in source.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        Error::Selector(format!("unbalanced brackets in {source:?}"))
                    })?;
                }
                ',' if depth == 0 => {
                    parts.push(source[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    if quote.is_some() {
        return Err(Error::Selector(format!("unterminated quote in {source:?}")));
    }
    if depth != 0 {
        return Err(Error::Selector(format!(
            "unbalanced brackets in {source:?}"
        )));
    }
    parts.push(source[start..].trim());
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::Selector(format!("empty selector group in {source:?}")));
    }
    Ok(parts)
}

fn parse_chain(group: &str) -> Result<SelectorChain> {
    let mut steps = Vec::new();
    let mut rest = group;
    let mut combinator = Combinator::Descendant;

    loop {
        let (step_src, tail) = split_step(rest)?;
        steps.push(parse_step(step_src, combinator)?);

        let tail = tail.trim_start();
        if tail.is_empty() {
            break;
        }
        let (next, after) = match tail.as_bytes()[0] {
            b'>' => (Combinator::Child, &tail[1..]),
            b'+' => (Combinator::AdjacentSibling, &tail[1..]),
            b'~' => (Combinator::GeneralSibling, &tail[1..]),
            _ => (Combinator::Descendant, tail),
        };
        combinator = next;
        rest = after.trim_start();
        if rest.is_empty() {
            return Err(Error::Selector(format!("dangling combinator in {group:?}")));
        }
    }

    Ok(SelectorChain { steps })
}

/// Split off the leading compound selector at the first top-level
/// whitespace or combinator.
fn split_step(s: &str) -> Result<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| Error::Selector(format!("unbalanced brackets in {s:?}")))?;
                }
                _ if depth == 0 && (c.is_whitespace() || c == '>' || c == '+' || c == '~') => {
                    if i == 0 {
                        return Err(Error::Selector(format!("unexpected {c:?} in selector")));
                    }
                    return Ok((&s[..i], &s[i..]));
                }
                _ => {}
            },
        }
    }
    Ok((s, ""))
}

fn take_ident(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(s.len());
    &s[..end]
}

fn parse_step(src: &str, combinator: Combinator) -> Result<SelectorStep> {
    let mut step = SelectorStep::new(combinator);
    let mut rest = src;

    if let Some(r) = rest.strip_prefix('*') {
        rest = r;
    } else {
        let ident = take_ident(rest);
        if !ident.is_empty() {
            step.tag = Some(ident.to_ascii_lowercase());
            rest = &rest[ident.len()..];
        }
    }

    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('#') {
            let ident = take_ident(r);
            if ident.is_empty() {
                return Err(Error::Selector(format!("expected id after '#' in {src:?}")));
            }
            if step.id.is_none() {
                step.id = Some(ident.to_string());
            } else {
                // A second id constraint still has to hold.
                step.attrs.push(AttrCondition {
                    name: "id".into(),
                    op: AttrOp::Equals,
                    value: ident.to_string(),
                });
            }
            rest = &r[ident.len()..];
        } else if let Some(r) = rest.strip_prefix('.') {
            let ident = take_ident(r);
            if ident.is_empty() {
                return Err(Error::Selector(format!(
                    "expected class after '.' in {src:?}"
                )));
            }
            step.classes.push(ident.to_string());
            rest = &r[ident.len()..];
        } else if let Some(r) = rest.strip_prefix('[') {
            let end = find_attr_end(r)
                .ok_or_else(|| Error::Selector(format!("missing ']' in {src:?}")))?;
            step.attrs.push(parse_attr(&r[..end])?);
            rest = &r[end + 1..];
        } else if rest.starts_with("::") {
            return Err(Error::Selector(format!(
                "pseudo-elements are not supported: {src:?}"
            )));
        } else if let Some(r) = rest.strip_prefix(':') {
            let ident = take_ident(r);
            if ident.is_empty() {
                return Err(Error::Selector(format!(
                    "expected pseudo-class after ':' in {src:?}"
                )));
            }
            let after = &r[ident.len()..];
            if let Some(args) = after.strip_prefix('(') {
                let close = args
                    .find(')')
                    .ok_or_else(|| Error::Selector(format!("missing ')' in {src:?}")))?;
                step.pseudos
                    .push(parse_functional_pseudo(ident, &args[..close])?);
                rest = &args[close + 1..];
            } else {
                step.pseudos.push(parse_simple_pseudo(ident)?);
                rest = after;
            }
        } else {
            let c = rest.chars().next().unwrap_or(' ');
            return Err(Error::Selector(format!(
                "unexpected {c:?} in selector {src:?}"
            )));
        }
    }

    Ok(step)
}

/// Index of the closing `]`, skipping quoted sections.
fn find_attr_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                ']' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn parse_attr(body: &str) -> Result<AttrCondition> {
    let body = body.trim();

    let Some(eq) = body.find('=') else {
        return if !body.is_empty() && is_simple_name(body) {
            Ok(AttrCondition {
                name: body.to_ascii_lowercase(),
                op: AttrOp::Exists,
                value: String::new(),
            })
        } else {
            Err(Error::Selector(format!("bad attribute name {body:?}")))
        };
    };

    let (name_part, op) = match body[..eq].as_bytes().last() {
        Some(b'~') => (&body[..eq - 1], AttrOp::Includes),
        Some(b'|') => (&body[..eq - 1], AttrOp::DashMatch),
        Some(b'^') => (&body[..eq - 1], AttrOp::Prefix),
        Some(b'$') => (&body[..eq - 1], AttrOp::Suffix),
        Some(b'*') => (&body[..eq - 1], AttrOp::Substring),
        _ => (&body[..eq], AttrOp::Equals),
    };
    let name = name_part.trim();
    if name.is_empty() || !is_simple_name(name) {
        return Err(Error::Selector(format!("bad attribute name in {body:?}")));
    }

    let raw = body[eq + 1..].trim();
    let value = unquote(raw, body)?;

    Ok(AttrCondition {
        name: name.to_ascii_lowercase(),
        op,
        value,
    })
}

fn unquote(raw: &str, context: &str) -> Result<String> {
    if let Some(q) = raw.chars().next().filter(|&c| c == '"' || c == '\'') {
        if raw.len() >= 2 && raw.ends_with(q) {
            return Ok(raw[1..raw.len() - 1].to_string());
        }
        return Err(Error::Selector(format!("unterminated quote in {context:?}")));
    }
    if raw.is_empty() || !is_simple_name(raw) {
        return Err(Error::Selector(format!(
            "bad attribute value in {context:?}"
        )));
    }
    Ok(raw.to_string())
}

fn parse_simple_pseudo(name: &str) -> Result<PseudoClass> {
    match name.to_ascii_lowercase().as_str() {
        "first-child" => Ok(PseudoClass::FirstChild),
        "last-child" => Ok(PseudoClass::LastChild),
        "only-child" => Ok(PseudoClass::OnlyChild),
        "empty" => Ok(PseudoClass::Empty),
        "root" => Ok(PseudoClass::Root),
        other => Err(Error::Selector(format!(
            "unsupported pseudo-class :{other}"
        ))),
    }
}

fn parse_functional_pseudo(name: &str, args: &str) -> Result<PseudoClass> {
    match name.to_ascii_lowercase().as_str() {
        "nth-child" => {
            let (a, b) = parse_nth(args)
                .ok_or_else(|| Error::Selector(format!("bad nth-child argument {args:?}")))?;
            Ok(PseudoClass::NthChild(a, b))
        }
        other => Err(Error::Selector(format!(
            "unsupported pseudo-class :{other}()"
        ))),
    }
}

/// `An+B` notation: `odd`, `even`, `3`, `2n`, `2n+1`, `-n+3`, ...
fn parse_nth(args: &str) -> Option<(i32, i32)> {
    let compact: String = args
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }

    if let Some(n) = compact.find('n') {
        let a = match &compact[..n] {
            "" | "+" => 1,
            "-" => -1,
            digits => digits.parse().ok()?,
        };
        let b = match &compact[n + 1..] {
            "" => 0,
            digits => digits.parse().ok()?,
        };
        Some((a, b))
    } else {
        Some((0, compact.parse().ok()?))
    }
}

// ---------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------

fn matches_chain(doc: &Document, id: NodeId, steps: &[SelectorStep]) -> bool {
    let Some(last) = steps.last() else {
        return false;
    };
    matches_step(doc, id, last) && matches_left(doc, id, steps.len() - 1, steps)
}

/// `steps[k]` already matched at `node`; try to satisfy everything left of
/// it, backtracking over descendant/sibling candidates.
fn matches_left(doc: &Document, node: NodeId, k: usize, steps: &[SelectorStep]) -> bool {
    if k == 0 {
        return true;
    }
    let prev = &steps[k - 1];
    match steps[k].combinator {
        Combinator::Child => match parent_element(doc, node) {
            Some(p) => matches_step(doc, p, prev) && matches_left(doc, p, k - 1, steps),
            None => false,
        },
        Combinator::Descendant => {
            let mut cur = parent_element(doc, node);
            while let Some(p) = cur {
                if matches_step(doc, p, prev) && matches_left(doc, p, k - 1, steps) {
                    return true;
                }
                cur = parent_element(doc, p);
            }
            false
        }
        Combinator::AdjacentSibling => match doc.prev_element_sibling(node) {
            Some(p) => matches_step(doc, p, prev) && matches_left(doc, p, k - 1, steps),
            None => false,
        },
        Combinator::GeneralSibling => {
            let mut cur = doc.prev_element_sibling(node);
            while let Some(p) = cur {
                if matches_step(doc, p, prev) && matches_left(doc, p, k - 1, steps) {
                    return true;
                }
                cur = doc.prev_element_sibling(p);
            }
            false
        }
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|&p| doc.is_element(p))
}

fn matches_step(doc: &Document, id: NodeId, step: &SelectorStep) -> bool {
    let Some(el) = doc.as_element(id) else {
        return false;
    };

    if let Some(tag) = &step.tag {
        if !el.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(want) = &step.id {
        if el.id() != Some(want.as_str()) {
            return false;
        }
    }
    if !step.classes.iter().all(|c| el.has_class(c)) {
        return false;
    }
    if !step.attrs.iter().all(|cond| check_attr(el.attr(&cond.name), cond)) {
        return false;
    }
    step.pseudos.iter().all(|p| check_pseudo(doc, id, *p))
}

fn check_attr(actual: Option<&str>, cond: &AttrCondition) -> bool {
    let Some(v) = actual else {
        return false;
    };
    let want = cond.value.as_str();
    match cond.op {
        AttrOp::Exists => true,
        AttrOp::Equals => v == want,
        AttrOp::Includes => !want.is_empty() && v.split_ascii_whitespace().any(|t| t == want),
        AttrOp::DashMatch => {
            v == want || (v.starts_with(want) && v[want.len()..].starts_with('-'))
        }
        AttrOp::Prefix => !want.is_empty() && v.starts_with(want),
        AttrOp::Suffix => !want.is_empty() && v.ends_with(want),
        AttrOp::Substring => !want.is_empty() && v.contains(want),
    }
}

fn check_pseudo(doc: &Document, id: NodeId, pseudo: PseudoClass) -> bool {
    match pseudo {
        PseudoClass::FirstChild => {
            doc.parent(id).is_some() && doc.prev_element_sibling(id).is_none()
        }
        PseudoClass::LastChild => {
            doc.parent(id).is_some() && doc.next_element_sibling(id).is_none()
        }
        PseudoClass::OnlyChild => {
            doc.parent(id).is_some()
                && doc.prev_element_sibling(id).is_none()
                && doc.next_element_sibling(id).is_none()
        }
        PseudoClass::Empty => doc.children(id).all(|c| match &doc.get(c).kind {
            NodeKind::Comment(_) => true,
            NodeKind::Text(t) => t.is_empty(),
            _ => false,
        }),
        PseudoClass::Root => doc.parent(id).is_some_and(|p| doc.is_document_node(p)),
        PseudoClass::NthChild(a, b) => {
            let Some(parent) = doc.parent(id) else {
                return false;
            };
            let Some(pos) = doc
                .element_children(parent)
                .into_iter()
                .position(|c| c == id)
            else {
                return false;
            };
            nth_matches(a, b, pos as i32 + 1)
        }
    }
}

fn nth_matches(a: i32, b: i32, pos: i32) -> bool {
    if a == 0 {
        return pos == b;
    }
    let d = pos - b;
    d % a == 0 && d / a >= 0
}

// ---------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------

/// Resolve a selector against a scope node: matching descendants in
/// document order (the scope itself is never included).
pub(crate) fn query_all(doc: &Document, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    let sel = selector.trim();
    if sel.is_empty() {
        return Err(Error::Selector("empty selector".into()));
    }

    let maybe_id = sel.starts_with('#');
    let maybe_class = sel.starts_with('.');
    let name_only = if maybe_id || maybe_class { &sel[1..] } else { sel };
    let simple = !name_only.is_empty() && is_simple_name(name_only);

    // Id lookup belongs to the document: first match only.
    if simple && maybe_id && doc.is_document_node(scope) {
        trace!("id fast path for {:?}", sel);
        let found = doc.descendants(scope).skip(1).find(|&n| {
            doc.as_element(n)
                .is_some_and(|el| el.id() == Some(name_only))
        });
        return Ok(found.into_iter().collect());
    }

    if !matches!(
        doc.kind(scope),
        NodeKind::Element(_) | NodeKind::Document
    ) {
        return Ok(Vec::new());
    }

    if simple && !maybe_id {
        trace!("name fast path for {:?}", sel);
        if maybe_class {
            return Ok(doc
                .descendants(scope)
                .skip(1)
                .filter(|&n| doc.as_element(n).is_some_and(|el| el.has_class(name_only)))
                .collect());
        }
        let tag = name_only.to_ascii_lowercase();
        return Ok(doc
            .descendants(scope)
            .skip(1)
            .filter(|&n| doc.tag(n) == Some(tag.as_str()))
            .collect());
    }

    let list = doc.cached_selector(sel)?;
    Ok(doc
        .descendants(scope)
        .skip(1)
        .filter(|&n| list.matches(doc, n))
        .collect())
}

/// Does one node match a selector? Empty selectors and non-elements answer
/// `false` without parsing.
pub(crate) fn matches_selector(doc: &Document, id: NodeId, selector: &str) -> Result<bool> {
    let sel = selector.trim();
    if sel.is_empty() || !doc.is_element(id) {
        return Ok(false);
    }
    let list = doc.cached_selector(sel)?;
    Ok(list.matches(doc, id))
}
