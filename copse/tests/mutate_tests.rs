use std::cell::RefCell;
use std::rc::Rc;

use copse::{Content, Document, Error};

fn page() -> Document {
    Document::parse(
        r#"<html><body><div id="left"><p>one</p></div><div id="right"></div></body></html>"#,
    )
}

fn inner(doc: &Document, sel: &str) -> String {
    let node = doc.select(sel).unwrap().get(0).unwrap();
    doc.inner_html(node)
}

#[test]
fn the_four_adjacency_operations() {
    let mut doc = page();
    let p = doc.select("#left p").unwrap();

    p.before(&mut doc, "<a>b</a>").unwrap();
    p.after(&mut doc, "<a>a</a>").unwrap();
    p.prepend(&mut doc, "<i>p</i>").unwrap();
    p.append(&mut doc, "<i>a</i>").unwrap();

    assert_eq!(
        inner(&doc, "#left"),
        "<a>b</a><p><i>p</i>one<i>a</i></p><a>a</a>"
    );
}

#[test]
fn reverse_operations_mirror_the_forward_ones() {
    let mut a = page();
    let mut b = page();

    a.select("#right").unwrap().append(&mut a, "<p>x</p>").unwrap();
    b.create("<p>x</p>").append_to(&mut b, "#right").unwrap();
    assert_eq!(a.to_html(), b.to_html());

    let mut c = page();
    let mut d = page();
    c.select("#left p").unwrap().before(&mut c, "<hr>").unwrap();
    d.create("<hr>").insert_before(&mut d, "#left p").unwrap();
    assert_eq!(c.to_html(), d.to_html());
}

#[test]
fn multi_target_insertion_clones_for_everyone() {
    let mut doc = page();
    let divs = doc.select("div").unwrap();
    let badge = doc.create("<span class=badge>!</span>");

    divs.append(&mut doc, &badge).unwrap();

    assert_eq!(doc.select(".badge").unwrap().len(), 2);
    assert!(!doc.is_connected(badge[0]));

    // The copies are independent.
    let badges = doc.select(".badge").unwrap();
    copse::Collection::from_nodes(vec![badges[0]])
        .set_text(&mut doc, "changed");
    assert_eq!(doc.text_content(badges[1]), "!");
}

#[test]
fn single_target_insertion_moves_the_original() {
    let mut doc = page();
    let p = doc.select("#left p").unwrap();
    doc.select("#right").unwrap().append(&mut doc, &p).unwrap();

    assert_eq!(inner(&doc, "#left"), "");
    assert_eq!(inner(&doc, "#right"), "<p>one</p>");
    // Same node instance, not a copy.
    assert_eq!(doc.select("#right p").unwrap().to_vec(), p.to_vec());
}

#[test]
fn inserting_beside_a_detached_target_discards_content() {
    let mut doc = page();
    let orphan = doc.create("<div>floating</div>");
    let content = doc.create(r#"<p id="gone">gone</p>"#);
    doc.select("#right").unwrap().append(&mut doc, &content).unwrap();
    assert_eq!(doc.select("#gone").unwrap().len(), 1);

    // No parent to insert next to: the content is pulled out of the tree.
    orphan.after(&mut doc, &content).unwrap();
    assert!(doc.select("#gone").unwrap().is_empty());
    assert!(doc.parent(content[0]).is_none());

    // prepend/append still work on detached targets.
    orphan.append(&mut doc, &content).unwrap();
    assert_eq!(doc.text_content(orphan[0]), "floatinggone");
}

#[test]
fn hierarchy_violations_error() {
    let mut doc = page();
    let left = doc.select("#left").unwrap();
    let body = doc.select("body").unwrap();

    match left.append(&mut doc, &body) {
        Err(Error::Hierarchy(_)) => {}
        other => panic!("expected hierarchy error, got {other:?}"),
    }
}

#[test]
fn replace_and_remove() {
    let mut doc = page();
    doc.select("#left p")
        .unwrap()
        .replace_with(&mut doc, "<h2>two</h2>")
        .unwrap();
    assert_eq!(inner(&doc, "#left"), "<h2>two</h2>");

    doc.select("#right").unwrap().remove(&mut doc);
    assert!(doc.select("#right").unwrap().is_empty());
}

#[test]
fn wrap_all_drills_into_the_structure() {
    let mut doc = page();
    let divs = doc.select("div").unwrap();
    divs.wrap_all(&mut doc, "<section><div class=inner></div></section>")
        .unwrap();

    let body = doc.body().unwrap();
    assert_eq!(
        doc.inner_html(body),
        r#"<section><div class="inner"><div id="left"><p>one</p></div><div id="right"></div></div></section>"#
    );
}

#[test]
fn wrap_clones_per_member_and_unwrap_reverses() {
    let mut doc = page();
    let divs = doc.select("div").unwrap();
    divs.wrap(&mut doc, "<article></article>").unwrap();
    assert_eq!(doc.select("article").unwrap().len(), 2);

    // Unwrapping the divs removes the articles and puts the divs back.
    divs.unwrap(&mut doc).unwrap();
    assert!(doc.select("article").unwrap().is_empty());
    assert_eq!(
        doc.inner_html(doc.body().unwrap()),
        r#"<div id="left"><p>one</p></div><div id="right"></div>"#
    );
}

#[test]
fn wrap_inner_and_empty() {
    let mut doc = page();
    let left = doc.select("#left").unwrap();
    left.wrap_inner(&mut doc, "<blockquote></blockquote>").unwrap();
    assert_eq!(inner(&doc, "#left"), "<blockquote><p>one</p></blockquote>");

    left.empty(&mut doc);
    assert_eq!(inner(&doc, "#left"), "");
}

#[test]
fn scripts_execute_on_live_insertion_only_once() {
    let mut doc = page();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    doc.on_script_eval(move |src| sink.borrow_mut().push(src.to_string()));

    // Detached build-up runs nothing.
    let widget = doc.create("<div class=w></div>");
    widget
        .append(&mut doc, "<script>init()</script>")
        .unwrap();
    assert!(log.borrow().is_empty());

    // Going live runs the inline script.
    widget.append_to(&mut doc, "#left").unwrap();
    assert_eq!(log.borrow().as_slice(), ["init()"]);

    // Moving it elsewhere does not run it again.
    widget.append_to(&mut doc, "#right").unwrap();
    assert_eq!(log.borrow().len(), 1);

    // Fan-out clones are fresh instances: each copy runs.
    let divs = doc.select("div.w, #left").unwrap();
    assert!(divs.len() > 1);
    let snippet = doc.create("<script>more()</script>");
    divs.append(&mut doc, &snippet).unwrap();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn scripts_with_src_or_foreign_type_are_inert() {
    let mut doc = page();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    doc.on_script_eval(move |src| sink.borrow_mut().push(src.to_string()));

    let left = doc.select("#left").unwrap();
    left.append(&mut doc, "<script src=app.js>skip()</script>").unwrap();
    left.append(&mut doc, "<script type=module>skip()</script>").unwrap();
    left.append(&mut doc, "<script type=''>run1()</script>").unwrap();
    left.append(&mut doc, "<script type=text/javascript>run2()</script>").unwrap();

    assert_eq!(log.borrow().as_slice(), ["run1()", "run2()"]);
}

#[test]
fn content_variants_resolve_alike() {
    let mut doc = page();
    let right = doc.select("#right").unwrap();

    let made = doc.create("<em>se</em>");
    right.append(&mut doc, Content::Node(made[0])).unwrap();
    right.append(&mut doc, made.to_vec()).unwrap();
    right.append(&mut doc, "<em>se</em>").unwrap();

    // The first two appends moved the same node; markup made a fresh one.
    assert_eq!(doc.select("#right em").unwrap().len(), 2);
}

#[test]
fn serialization_round_trips_after_mutation() {
    let mut doc = page();
    doc.select("#left")
        .unwrap()
        .append(&mut doc, r#"<a href="/x?a=1&b=2" title='say "hi"'>x & y</a>"#)
        .unwrap();

    let html = doc.to_html();
    let reparsed = Document::parse(&html);
    assert_eq!(reparsed.to_html(), html);

    let a = reparsed.select("a").unwrap();
    assert_eq!(a.attr(&reparsed, "href"), Some("/x?a=1&b=2"));
    assert_eq!(a.attr(&reparsed, "title"), Some(r#"say "hi""#));
    assert_eq!(a.text(&reparsed), "x & y");
}
