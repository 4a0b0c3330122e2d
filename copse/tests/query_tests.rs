use copse::{Document, Error};

fn page() -> Document {
    Document::parse(
        r#"<!DOCTYPE html>
<html>
<body>
  <section id="top" class="box hero" data-theme="dark-blue">
    <h1>title</h1>
    <ul class="menu">
      <li class="item active"><a href="/a" lang="en-US">a</a></li>
      <li class="item"><a href="/b">b</a></li>
      <li class="item"><a href="/c" target="_blank">c</a></li>
    </ul>
  </section>
  <section class="box">
    <p>lone</p>
    <div id="empty"></div>
  </section>
</body>
</html>"#,
    )
}

#[test]
fn id_lookup_returns_the_first_match_only() {
    let doc = page();
    let hit = doc.select("#top").unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(doc.tag(hit[0]), Some("section"));
    assert!(doc.select("#missing").unwrap().is_empty());
}

#[test]
fn fast_paths_agree_with_the_engine() {
    let doc = page();

    // The same constraint expressed simply and via attribute syntax.
    assert_eq!(
        doc.select("#top").unwrap().to_vec(),
        doc.select("[id=top]").unwrap().to_vec()
    );
    assert_eq!(
        doc.select(".item").unwrap().to_vec(),
        doc.select("[class~=item]").unwrap().to_vec()
    );
    // A bare tag runs on the fast path; `:nth-child(n)` matches every
    // element position, forcing the same set through the engine.
    assert_eq!(
        doc.select("li").unwrap().to_vec(),
        doc.select("li:nth-child(n)").unwrap().to_vec()
    );
}

#[test]
fn results_come_back_in_document_order() {
    let doc = page();
    let found = doc.select("h1, a, p").unwrap();
    let tags: Vec<_> = found.iter().map(|n| doc.tag(n).unwrap().to_string()).collect();
    assert_eq!(tags, ["h1", "a", "a", "a", "p"]);
}

#[test]
fn combinators_and_attribute_operators() {
    let doc = page();

    assert_eq!(doc.select("ul > li").unwrap().len(), 3);
    assert_eq!(doc.select("section a").unwrap().len(), 3);
    assert_eq!(doc.select("li + li").unwrap().len(), 2);
    assert_eq!(doc.select("h1 ~ ul").unwrap().len(), 1);

    assert_eq!(doc.select("[href]").unwrap().len(), 3);
    assert_eq!(doc.select(r#"[href="/b"]"#).unwrap().len(), 1);
    assert_eq!(doc.select("[href^='/']").unwrap().len(), 3);
    assert_eq!(doc.select("[href$=c]").unwrap().len(), 1);
    assert_eq!(doc.select("[data-theme*=dark]").unwrap().len(), 1);
    assert_eq!(doc.select("[lang|=en]").unwrap().len(), 1);
    assert_eq!(doc.select("[class~=active]").unwrap().len(), 1);
    assert_eq!(doc.select("[target=_blank]").unwrap().len(), 1);
}

#[test]
fn structural_pseudo_classes() {
    let doc = page();

    assert_eq!(doc.select("li:first-child").unwrap().len(), 1);
    assert_eq!(doc.select("li:last-child").unwrap().len(), 1);
    assert_eq!(doc.select("li:nth-child(2)").unwrap().len(), 1);
    assert_eq!(doc.select("li:nth-child(odd)").unwrap().len(), 2);
    assert_eq!(doc.select("li:nth-child(2n)").unwrap().len(), 1);
    assert_eq!(doc.select("p:only-child").unwrap().len(), 0);
    assert_eq!(doc.select("#empty:empty").unwrap().len(), 1);
    assert_eq!(doc.select(":root").unwrap().to_vec(), vec![doc.root()]);
}

#[test]
fn compound_selectors_combine_constraints() {
    let doc = page();
    assert_eq!(doc.select("li.item.active").unwrap().len(), 1);
    assert_eq!(doc.select("section.box.hero > ul.menu a[href='/a']").unwrap().len(), 1);
    assert_eq!(doc.select("li.active a[lang]").unwrap().len(), 1);
    assert_eq!(doc.select("li.missing a").unwrap().len(), 0);
}

#[test]
fn scoped_search_excludes_the_scope_itself() {
    let doc = page();
    let sections = doc.select("section").unwrap();
    let inner = sections.find(&doc, "section").unwrap();
    assert!(inner.is_empty());

    let lis = sections.find(&doc, "li").unwrap();
    assert_eq!(lis.len(), 3);
}

#[test]
fn matching_is_exact_per_member() {
    let doc = page();
    let lis = doc.select("li").unwrap();
    assert!(lis.is(&doc, ".active").unwrap());
    assert_eq!(lis.filter(&doc, ".active").unwrap().len(), 1);
    assert_eq!(lis.not(&doc, ".active").unwrap().len(), 2);
    assert_eq!(lis.filter(&doc, "li:nth-child(3)").unwrap().len(), 1);
}

#[test]
fn invalid_selectors_surface_as_selector_errors() {
    let doc = page();
    for bad in ["", "  ", "li >", "> li", "[href", "li,,a", ":hover", "::before", "a!!", ":nth-child(x)"] {
        match doc.select(bad) {
            Err(Error::Selector(_)) => {}
            other => panic!("expected selector error for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn traversal_paths_propagate_selector_errors() {
    let doc = page();
    let lis = doc.select("li").unwrap();
    assert!(lis.find(&doc, "[href").is_err());
    assert!(lis.filter(&doc, "::after").is_err());
    assert!(lis.not(&doc, "li,,a").is_err());
    assert!(lis.has(&doc, "> a").is_err());
    assert!(lis.closest(&doc, ":hover").is_err());
    assert!(lis.is(&doc, "a!!").is_err());
    assert!(lis.parents(&doc, "[x=").is_err());
}

#[test]
fn selector_errors_display_their_source() {
    let doc = page();
    let err = doc.select(":hover").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("invalid selector:"), "{msg}");
    assert!(msg.contains("hover"), "{msg}");
}

#[test]
fn queries_are_repeatable() {
    let doc = page();
    // Parsed selectors are cached; repeated runs see identical results.
    let first = doc.select("section.box > ul li a").unwrap();
    let second = doc.select("section.box > ul li a").unwrap();
    assert_eq!(first.to_vec(), second.to_vec());
    assert_eq!(first.len(), 3);
}
