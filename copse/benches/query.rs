use divan::{black_box, Bencher};

use copse::Document;

fn main() {
    divan::main();
}

/// Product-listing page with `items` list entries.
fn build_page(items: usize) -> String {
    let mut html = String::with_capacity(items * 96 + 256);
    html.push_str("<html><head><title>bench</title></head><body>");
    html.push_str(r#"<nav id="menu"><ul class="tabs"><li>a</li><li>b</li></ul></nav>"#);
    html.push_str(r#"<main id="catalog"><ul class="items">"#);
    for i in 0..items {
        html.push_str(&format!(
            r#"<li class="item" data-n="{i}"><a href="/p/{i}" class="link">item {i}</a></li>"#
        ));
    }
    html.push_str("</ul></main></body></html>");
    html
}

#[divan::bench]
fn parse_page(bencher: Bencher) {
    let html = build_page(500);
    bencher.bench_local(|| {
        let doc = Document::parse(black_box(&html));
        black_box(doc);
    });
}

#[divan::bench]
fn select_by_id(bencher: Bencher) {
    let doc = Document::parse(&build_page(500));
    bencher.bench_local(|| {
        let found = doc.select(black_box("#catalog")).unwrap();
        black_box(found);
    });
}

#[divan::bench]
fn select_by_class(bencher: Bencher) {
    let doc = Document::parse(&build_page(500));
    bencher.bench_local(|| {
        let found = doc.select(black_box(".item")).unwrap();
        black_box(found);
    });
}

#[divan::bench]
fn select_descendant_chain(bencher: Bencher) {
    let doc = Document::parse(&build_page(500));
    bencher.bench_local(|| {
        let found = doc.select(black_box("#catalog ul > li a")).unwrap();
        black_box(found);
    });
}

#[divan::bench]
fn select_nth_child(bencher: Bencher) {
    let doc = Document::parse(&build_page(500));
    bencher.bench_local(|| {
        let found = doc.select(black_box(".items li:nth-child(2n+1)")).unwrap();
        black_box(found);
    });
}

#[divan::bench]
fn synthesize_rows(bencher: Bencher) {
    let mut doc = Document::parse(&build_page(10));
    let markup = "<tr><td>a</td><td>b</td><td>c</td></tr>".repeat(50);
    bencher.bench_local(|| {
        let rows = doc.create(black_box(&markup));
        black_box(rows);
    });
}

#[divan::bench]
fn append_fan_out(bencher: Bencher) {
    let html = build_page(100);
    bencher.bench_local(|| {
        let mut doc = Document::parse(black_box(&html));
        let items = doc.select(".item").unwrap();
        let badge = doc.create(r#"<span class="badge">new</span>"#);
        items.append(&mut doc, &badge).unwrap();
        black_box(doc);
    });
}
