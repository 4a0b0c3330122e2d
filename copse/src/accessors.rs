//! Content and attribute accessors: attr/val, text/html, data, inline
//! style, and class manipulation.
//!
//! Getters read from the first member; setters apply to every member and
//! hand the collection back for chaining. Style values live in the `style`
//! attribute - there is no layout or computed style here.

use indextree::NodeId;

use crate::arena_dom::Document;
use crate::collection::Collection;
use crate::fragment;
use crate::Result;

/// Style properties that take bare numbers (everything else gets `px`).
const CSS_UNITLESS: [&str; 7] = [
    "column-count",
    "columns",
    "font-weight",
    "line-height",
    "opacity",
    "z-index",
    "zoom",
];

/// `backgroundColor` to `background-color`; dashed names pass through. An
/// acronym run breaks before its last capital: `HTMLParser` to `html-parser`.
pub(crate) fn dasherize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    let mut prev_upper = false;
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_uppercase() {
            let starts_word = chars.peek().is_some_and(|n| n.is_ascii_lowercase());
            if prev_lower || (prev_upper && starts_word) {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
            prev_upper = true;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            prev_upper = false;
            out.push(c);
        }
    }
    out
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Numeric style value with `px` appended unless the property is unitless.
pub(crate) fn px_value(property: &str, value: f64) -> String {
    let prop = dasherize(property);
    let num = format_number(value);
    if CSS_UNITLESS.contains(&prop.as_str()) {
        num
    } else {
        format!("{num}px")
    }
}

fn style_declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (p, v) = decl.split_once(':')?;
        let p = p.trim();
        let v = v.trim();
        (!p.is_empty()).then_some((p, v))
    })
}

/// Set (or, with an empty value, remove) one declaration in the `style`
/// attribute.
pub(crate) fn set_style(doc: &mut Document, id: NodeId, property: &str, value: &str) {
    if !doc.is_element(id) {
        return;
    }
    let prop = dasherize(property);
    let mut decls: Vec<(String, String)> = doc
        .get_attr(id, "style")
        .map(|s| {
            style_declarations(s)
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    decls.retain(|(p, _)| *p != prop);
    if !value.is_empty() {
        decls.push((prop, value.to_string()));
    }

    if decls.is_empty() {
        doc.remove_attr(id, "style");
    } else {
        let css = decls
            .iter()
            .map(|(p, v)| format!("{p}:{v}"))
            .collect::<Vec<_>>()
            .join(";");
        doc.set_attr(id, "style", &css);
    }
}

/// Replace an element's children with synthesized markup, without running
/// scripts (used while building detached fragments).
pub(crate) fn set_inner_html(doc: &mut Document, id: NodeId, markup: &str) {
    if !doc.is_element(id) {
        return;
    }
    for child in doc.child_nodes(id) {
        doc.detach(child);
    }
    for node in fragment::synthesize(doc, markup, None, None) {
        doc.attach_end(id, node);
    }
}

fn data_attr_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 5);
    out.push_str("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl Collection {
    /// Attribute value from the first member.
    pub fn attr<'d>(&self, doc: &'d Document, name: &str) -> Option<&'d str> {
        doc.get_attr(self.get(0)?, name)
    }

    /// Set an attribute on every member.
    pub fn set_attr(&self, doc: &mut Document, name: &str, value: &str) -> &Self {
        for node in self {
            doc.set_attr(node, name, value);
        }
        self
    }

    /// Remove attributes (whitespace-separated names) from every member.
    pub fn remove_attr(&self, doc: &mut Document, names: &str) -> &Self {
        for node in self {
            for name in names.split_ascii_whitespace() {
                doc.remove_attr(node, name);
            }
        }
        self
    }

    /// The `value` attribute of the first member.
    pub fn val<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        self.attr(doc, "value")
    }

    pub fn set_val(&self, doc: &mut Document, value: &str) -> &Self {
        self.set_attr(doc, "value", value)
    }

    /// Concatenated text content of all members.
    pub fn text(&self, doc: &Document) -> String {
        self.iter().map(|n| doc.text_content(n)).collect()
    }

    /// Replace each member's content with a text node.
    pub fn set_text(&self, doc: &mut Document, text: &str) -> &Self {
        for node in self {
            doc.set_text(node, text);
        }
        self
    }

    /// Serialized inner HTML of the first member (`None` when it is not an
    /// element).
    pub fn html(&self, doc: &Document) -> Option<String> {
        let first = self.get(0)?;
        doc.is_element(first).then(|| doc.inner_html(first))
    }

    /// Replace each member's children with markup, synthesized fresh per
    /// member. Inline scripts in the markup run when the member is part of
    /// the document.
    pub fn set_html(&self, doc: &mut Document, markup: &str) -> Result<&Self> {
        for node in self {
            if !doc.is_element(node) {
                continue;
            }
            let one = Collection::from_nodes(vec![node]);
            one.empty(doc);
            one.append(doc, markup)?;
        }
        Ok(self)
    }

    /// `data-*` attribute of the first member; camelCase keys dash out
    /// (`rowId` reads `data-row-id`).
    pub fn data<'d>(&self, doc: &'d Document, key: &str) -> Option<&'d str> {
        self.attr(doc, &data_attr_name(key))
    }

    pub fn set_data(&self, doc: &mut Document, key: &str, value: &str) -> &Self {
        let name = data_attr_name(key);
        self.set_attr(doc, &name, value)
    }

    /// Inline style declaration of the first member.
    pub fn css<'d>(&self, doc: &'d Document, property: &str) -> Option<&'d str> {
        let style = doc.get_attr(self.get(0)?, "style")?;
        let want = dasherize(property);
        style_declarations(style).find_map(|(p, v)| (p == want).then_some(v))
    }

    /// Set an inline style declaration on every member; an empty value
    /// removes the declaration.
    pub fn set_css(&self, doc: &mut Document, property: &str, value: &str) -> &Self {
        for node in self {
            set_style(doc, node, property, value);
        }
        self
    }

    /// Does any member carry the class?
    pub fn has_class(&self, doc: &Document, name: &str) -> bool {
        self.iter()
            .any(|n| doc.as_element(n).is_some_and(|el| el.has_class(name)))
    }

    /// Add classes (whitespace-separated) each member is missing.
    pub fn add_class(&self, doc: &mut Document, names: &str) -> &Self {
        for node in self {
            if !doc.is_element(node) {
                continue;
            }
            let current = doc.get_attr(node, "class").unwrap_or("").to_string();
            let mut additions: Vec<&str> = Vec::new();
            for name in names.split_ascii_whitespace() {
                if !current.split_ascii_whitespace().any(|c| c == name)
                    && !additions.contains(&name)
                {
                    additions.push(name);
                }
            }
            if additions.is_empty() {
                continue;
            }
            let mut next = current;
            if !next.is_empty() {
                next.push(' ');
            }
            next.push_str(&additions.join(" "));
            doc.set_attr(node, "class", &next);
        }
        self
    }

    /// Remove classes (whitespace-separated) from every member; an empty
    /// name list clears the class attribute.
    pub fn remove_class(&self, doc: &mut Document, names: &str) -> &Self {
        for node in self {
            if !doc.is_element(node) {
                continue;
            }
            if names.trim().is_empty() {
                doc.set_attr(node, "class", "");
                continue;
            }
            let next = doc
                .get_attr(node, "class")
                .unwrap_or("")
                .split_ascii_whitespace()
                .filter(|c| !names.split_ascii_whitespace().any(|n| n == *c))
                .collect::<Vec<_>>()
                .join(" ");
            doc.set_attr(node, "class", &next);
        }
        self
    }

    /// Toggle classes per member; `force` turns the toggle into add (true)
    /// or remove (false).
    pub fn toggle_class(&self, doc: &mut Document, names: &str, force: Option<bool>) -> &Self {
        for node in self {
            if !doc.is_element(node) {
                continue;
            }
            let one = Collection::from_nodes(vec![node]);
            for name in names.split_ascii_whitespace() {
                let has = doc.as_element(node).is_some_and(|el| el.has_class(name));
                if force.unwrap_or(!has) {
                    one.add_class(doc, name);
                } else {
                    one.remove_class(doc, name);
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<html><body><p id="x" class="a b" data-row-id="7">hi</p><p id="y">there</p></body></html>"#,
        )
    }

    #[test]
    fn attr_round_trip() {
        let mut d = doc();
        let ps = d.select("p").unwrap();

        assert_eq!(ps.attr(&d, "id"), Some("x"));
        assert_eq!(ps.attr(&d, "missing"), None);

        ps.set_attr(&mut d, "title", "t");
        assert_eq!(d.get_attr(ps[1], "title"), Some("t"));

        ps.remove_attr(&mut d, "title class");
        assert_eq!(ps.attr(&d, "title"), None);
        assert_eq!(ps.attr(&d, "class"), None);
    }

    #[test]
    fn val_is_the_value_attribute() {
        let mut d = Document::parse(
            r#"<html><body><input name="q" value="old"></body></html>"#,
        );
        let input = d.select("input").unwrap();
        assert_eq!(input.val(&d), Some("old"));
        input.set_val(&mut d, "new");
        assert_eq!(input.val(&d), Some("new"));
    }

    #[test]
    fn text_concatenates_members() {
        let mut d = doc();
        let ps = d.select("p").unwrap();
        assert_eq!(ps.text(&d), "hithere");
        assert_eq!(Collection::default().text(&d), "");

        ps.set_text(&mut d, "z");
        assert_eq!(ps.text(&d), "zz");
    }

    #[test]
    fn html_get_and_set() {
        let mut d = doc();
        let first = d.select("#x").unwrap();
        assert_eq!(first.html(&d).as_deref(), Some("hi"));

        first.set_html(&mut d, "<b>bold</b>").unwrap();
        assert_eq!(first.html(&d).as_deref(), Some("<b>bold</b>"));
        assert_eq!(Collection::default().html(&d), None);
    }

    #[test]
    fn data_uses_dashed_attribute_names() {
        let mut d = doc();
        let p = d.select("#x").unwrap();
        assert_eq!(p.data(&d, "rowId"), Some("7"));
        assert_eq!(p.data(&d, "row-id"), Some("7"));

        p.set_data(&mut d, "someKey", "v");
        assert_eq!(p.attr(&d, "data-some-key"), Some("v"));
    }

    #[test]
    fn css_reads_and_writes_the_style_attribute() {
        let mut d = doc();
        let p = d.select("#x").unwrap();

        p.set_css(&mut d, "color", "red");
        p.set_css(&mut d, "backgroundColor", "blue");
        assert_eq!(p.attr(&d, "style"), Some("color:red;background-color:blue"));
        assert_eq!(p.css(&d, "background-color"), Some("blue"));
        assert_eq!(p.css(&d, "backgroundColor"), Some("blue"));

        // Updating replaces in place, empty removes.
        p.set_css(&mut d, "color", "green");
        assert_eq!(p.css(&d, "color"), Some("green"));
        p.set_css(&mut d, "color", "");
        assert_eq!(p.css(&d, "color"), None);
        p.set_css(&mut d, "background-color", "");
        assert_eq!(p.attr(&d, "style"), None);
    }

    #[test]
    fn px_rules() {
        assert_eq!(px_value("width", 10.0), "10px");
        assert_eq!(px_value("width", 10.5), "10.5px");
        assert_eq!(px_value("opacity", 0.5), "0.5");
        assert_eq!(px_value("zIndex", 3.0), "3");
        assert_eq!(px_value("lineHeight", 1.5), "1.5");
    }

    #[test]
    fn dasherize_forms() {
        assert_eq!(dasherize("backgroundColor"), "background-color");
        assert_eq!(dasherize("zIndex"), "z-index");
        assert_eq!(dasherize("color"), "color");
        assert_eq!(dasherize("border-top"), "border-top");

        // Acronym runs split before their last capital.
        assert_eq!(dasherize("ABTest"), "ab-test");
        assert_eq!(dasherize("HTMLParser"), "html-parser");
        assert_eq!(dasherize("dataXL"), "data-xl");
        assert_eq!(dasherize("x2Y"), "x2-y");
    }

    #[test]
    fn class_manipulation() {
        let mut d = doc();
        let p = d.select("#x").unwrap();

        assert!(p.has_class(&d, "a"));
        assert!(!p.has_class(&d, "z"));

        p.add_class(&mut d, "c a");
        assert_eq!(p.attr(&d, "class"), Some("a b c"));

        p.remove_class(&mut d, "b");
        assert_eq!(p.attr(&d, "class"), Some("a c"));

        p.toggle_class(&mut d, "a z", None);
        assert!(!p.has_class(&d, "a"));
        assert!(p.has_class(&d, "z"));

        p.toggle_class(&mut d, "z", Some(true));
        assert!(p.has_class(&d, "z"));

        p.remove_class(&mut d, "");
        assert_eq!(p.attr(&d, "class"), Some(""));
    }

    #[test]
    fn any_member_satisfies_has_class() {
        let mut d = doc();
        let ps = d.select("p").unwrap();
        d.select("#y").unwrap().add_class(&mut d, "only-y");
        assert!(ps.has_class(&d, "only-y"));
        assert!(!ps.has_class(&d, "nowhere"));
    }
}
