//! Style declarations, author style sheets and resolved-style computation.
//!
//! The cascade here is deliberately small: a fixed table of longhands with
//! initial values, inheritance, a tiny user-agent sheet, author rules from
//! `<style>` elements and the inline `style` attribute. It exists so the
//! host model can answer `getComputedStyle` with an ordered list of
//! `(property, value)` pairs that behaves like a browser's.

use crate::document::Document;
use crate::node::NodeHandle;
use crate::selector::{SelectorList, Specificity};

/// `(name, initial value, inherited)` for every longhand the resolver reports.
/// Kept in alphabetical order, which is the order browsers enumerate them in.
const PROPERTIES: &[(&str, &str, bool)] = &[
    ("align-items", "normal", false),
    ("animation-delay", "0s", false),
    ("animation-duration", "0s", false),
    ("animation-name", "none", false),
    ("background-color", "rgba(0, 0, 0, 0)", false),
    ("background-image", "none", false),
    ("border-bottom-style", "none", false),
    ("border-bottom-width", "0px", false),
    ("border-left-style", "none", false),
    ("border-left-width", "0px", false),
    ("border-right-style", "none", false),
    ("border-right-width", "0px", false),
    ("border-top-style", "none", false),
    ("border-top-width", "0px", false),
    ("bottom", "auto", false),
    ("box-sizing", "content-box", false),
    ("color", "rgb(0, 0, 0)", true),
    ("cursor", "auto", true),
    ("display", "inline", false),
    ("flex-direction", "row", false),
    ("float", "none", false),
    ("font-family", "serif", true),
    ("font-size", "16px", true),
    ("font-style", "normal", true),
    ("font-weight", "400", true),
    ("height", "auto", false),
    ("inline-size", "auto", false),
    ("left", "auto", false),
    ("letter-spacing", "normal", true),
    ("line-height", "normal", true),
    ("margin-bottom", "0px", false),
    ("margin-left", "0px", false),
    ("margin-right", "0px", false),
    ("margin-top", "0px", false),
    ("opacity", "1", false),
    ("overflow-x", "visible", false),
    ("overflow-y", "visible", false),
    ("overscroll-behavior-x", "auto", false),
    ("overscroll-behavior-y", "auto", false),
    ("padding-bottom", "0px", false),
    ("padding-left", "0px", false),
    ("padding-right", "0px", false),
    ("padding-top", "0px", false),
    ("pointer-events", "auto", true),
    ("position", "static", false),
    ("right", "auto", false),
    ("scroll-behavior", "auto", false),
    ("text-align", "start", true),
    ("text-decoration-line", "none", false),
    ("top", "auto", false),
    ("transform", "none", false),
    ("transition-delay", "0s", false),
    ("transition-duration", "0s", false),
    ("transition-property", "all", false),
    ("visibility", "visible", true),
    ("white-space", "normal", true),
    ("width", "auto", false),
    ("z-index", "auto", false),
];

fn user_agent_declarations(tag: &str) -> &'static [(&'static str, &'static str)] {
    match tag {
        "html" | "div" | "section" | "article" | "header" | "footer" | "main" | "nav" | "aside"
        | "ul" | "ol" | "form" | "figure" | "blockquote" | "pre" | "table" => &[("display", "block")],
        "body" => &[
            ("display", "block"),
            ("margin-top", "8px"),
            ("margin-right", "8px"),
            ("margin-bottom", "8px"),
            ("margin-left", "8px"),
        ],
        "p" => &[("display", "block"), ("margin-top", "16px"), ("margin-bottom", "16px")],
        "h1" => &[("display", "block"), ("font-size", "32px"), ("font-weight", "700")],
        "h2" | "h3" | "h4" | "h5" | "h6" => &[("display", "block"), ("font-weight", "700")],
        "li" => &[("display", "list-item")],
        "tr" => &[("display", "table-row")],
        "td" | "th" => &[("display", "table-cell")],
        "b" | "strong" => &[("font-weight", "700")],
        "a" => &[("color", "rgb(0, 0, 238)"), ("cursor", "pointer"), ("text-decoration-line", "underline")],
        "head" | "script" | "style" | "link" | "meta" | "title" | "template" => &[("display", "none")],
        _ => &[],
    }
}

/// A single `name: value` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Ordered declarations of a rule block or `style` attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleDeclarations(Vec<Declaration>);

impl StyleDeclarations {
    pub fn parse(text: &str) -> Self {
        let declarations = split_top_level(text, ';')
            .into_iter()
            .filter_map(|part| {
                let (name, value) = part.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let mut value = value.trim();
                let mut important = false;
                if let Some(bang) = value.rfind('!') {
                    if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
                        important = true;
                        value = value[..bang].trim_end();
                    }
                }
                if name.is_empty() || value.is_empty() {
                    return None;
                }
                Some(Declaration {
                    name,
                    value: value.to_string(),
                    important,
                })
            })
            .collect();
        StyleDeclarations(declarations)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    pub fn css_text(&self) -> String {
        self.0
            .iter()
            .map(|d| {
                if d.important {
                    format!("{}: {} !important;", d.name, d.value)
                } else {
                    format!("{}: {};", d.name, d.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split on `separator` outside of parentheses and quotes.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// A style rule: selector list plus declaration block
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: StyleDeclarations,
}

/// Parsed author style sheet
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
}

impl Stylesheet {
    /// Parse style rules. Comments and at-rules are skipped, as are rules
    /// whose selector the engine does not understand.
    pub fn parse(text: &str) -> Self {
        let text = strip_comments(text);
        let mut rules = Vec::new();
        let mut rest = text.as_str();

        loop {
            rest = rest.trim_start();
            let open = match rest.find('{') {
                Some(open) => open,
                None => break,
            };
            let prelude = rest[..open].trim();
            if prelude.starts_with('@') {
                // Statement at-rule (`@import ...;`) before the next block
                if let Some(end) = prelude.find(';') {
                    rest = &rest[end + 1..];
                    continue;
                }
            }

            let close = match matching_brace(rest, open) {
                Some(close) => close,
                None => break,
            };
            let block = &rest[open + 1..close];

            if prelude.starts_with('@') {
                tracing::trace!(prelude, "skipping at-rule");
            } else {
                match SelectorList::parse(prelude) {
                    Ok(selectors) => rules.push(StyleRule {
                        selectors,
                        declarations: StyleDeclarations::parse(block),
                    }),
                    Err(e) => tracing::debug!(error = %e, "dropping rule"),
                }
            }
            rest = &rest[close + 1..];
        }

        Stylesheet { rules }
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolved style of an element: every property with its final value, in
/// enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputedStyle(Vec<(String, String)>);

impl ComputedStyle {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn set(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
    }
}

/// Author style sheets of a document, in registration order. Linked sheets
/// are never fetched by the host model and contribute no rules.
pub fn author_sheets(document: &Document) -> Vec<Stylesheet> {
    document
        .style_sheets()
        .iter()
        .filter(|n| n.has_local_name("style"))
        .map(|n| Stylesheet::parse(&n.text_content()))
        .collect()
}

/// Resolves the styles of many elements of one document.
///
/// Author sheets are parsed once, and the resolved styles along the path
/// from the root to the last resolved element are kept. Visiting a tree in
/// pre-order therefore resolves every element exactly once, each against its
/// parent's cached style. The resolver is a snapshot: style changes made
/// after it was created are not seen.
#[derive(Debug, Default)]
pub struct StyleResolver {
    sheets: Vec<Stylesheet>,
    path: Vec<(NodeHandle, ComputedStyle)>,
}

impl StyleResolver {
    pub fn new(document: Option<&Document>) -> Self {
        Self {
            sheets: document.map(author_sheets).unwrap_or_default(),
            path: Vec::new(),
        }
    }

    /// A resolver over the author sheets of `node`'s owner document
    pub fn for_node(node: &NodeHandle) -> Self {
        Self::new(node.owner_document().as_ref())
    }

    pub fn sheets(&self) -> &[Stylesheet] {
        &self.sheets
    }

    /// The resolved style of `node`, or `None` for anything but an element.
    pub fn computed_style(&mut self, node: &NodeHandle) -> Option<&ComputedStyle> {
        if !node.is_element() {
            return None;
        }

        match node.parent().filter(NodeHandle::is_element) {
            Some(parent) => {
                while self.path.last().map_or(false, |(n, _)| *n != parent) {
                    self.path.pop();
                }
                if self.path.is_empty() {
                    self.push_chain(&parent);
                }
            }
            None => self.path.clear(),
        }

        self.push_resolved(node.clone());
        self.path.last().map(|(_, style)| style)
    }

    /// Resolve `element` and its element ancestors, outermost first.
    fn push_chain(&mut self, element: &NodeHandle) {
        let mut chain = vec![element.clone()];
        let mut current = element.parent();
        while let Some(ancestor) = current {
            if !ancestor.is_element() {
                break;
            }
            current = ancestor.parent();
            chain.push(ancestor);
        }
        for element in chain.into_iter().rev() {
            self.push_resolved(element);
        }
    }

    fn push_resolved(&mut self, element: NodeHandle) {
        let style = resolve(&element, self.path.last().map(|(_, style)| style), &self.sheets);
        self.path.push((element, style));
    }
}

/// The resolved style of `node`, or `None` for anything but an element.
/// Resolving many elements of one tree is cheaper through [`StyleResolver`].
pub fn computed_style(node: &NodeHandle) -> Option<ComputedStyle> {
    StyleResolver::for_node(node).computed_style(node).cloned()
}

fn resolve(element: &NodeHandle, parent: Option<&ComputedStyle>, sheets: &[Stylesheet]) -> ComputedStyle {
    let initial = |name: &str| {
        PROPERTIES
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, v, _)| *v)
    };
    let inherited = |name: &str| parent.and_then(|p| p.get(name)).map(str::to_string);

    let mut style = ComputedStyle(
        PROPERTIES
            .iter()
            .map(|&(name, value, inherits)| {
                let value = if inherits {
                    inherited(name).unwrap_or_else(|| value.to_string())
                } else {
                    value.to_string()
                };
                (name.to_string(), value)
            })
            .collect(),
    );

    let tag = element.local_name().unwrap_or_default();
    for &(name, value) in user_agent_declarations(&tag) {
        style.set(name, value);
    }

    // (important, inline, specificity, source order)
    let mut cascade: Vec<((bool, bool, Specificity, usize), Declaration)> = Vec::new();
    let mut order = 0usize;
    for sheet in sheets {
        for rule in &sheet.rules {
            if let Some(specificity) = rule.selectors.matching_specificity(element) {
                for declaration in rule.declarations.iter() {
                    cascade.push(((declaration.important, false, specificity, order), declaration.clone()));
                    order += 1;
                }
            }
        }
    }
    for declaration in StyleDeclarations::parse(&element.style_text()).iter() {
        cascade.push(((declaration.important, true, (0, 0, 0), order), declaration.clone()));
        order += 1;
    }
    cascade.sort_by_key(|(key, _)| *key);

    for (_, declaration) in cascade {
        let value = match declaration.value.to_ascii_lowercase().as_str() {
            "inherit" => inherited(&declaration.name)
                .or_else(|| initial(&declaration.name).map(str::to_string)),
            "initial" => initial(&declaration.name).map(str::to_string),
            _ => Some(declaration.value.clone()),
        };
        if let Some(value) = value {
            for (name, value) in expand_shorthand(&declaration.name, &value) {
                style.set(&name, &value);
            }
        }
    }

    style
}

fn expand_shorthand(name: &str, value: &str) -> Vec<(String, String)> {
    let sides = |prefix: &str, suffix: &str| {
        let parts: Vec<&str> = value.split_ascii_whitespace().collect();
        let (top, right, bottom, left) = match parts.as_slice() {
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l, ..] => (*t, *r, *b, *l),
            [] => return Vec::new(),
        };
        [("top", top), ("right", right), ("bottom", bottom), ("left", left)]
            .iter()
            .map(|(side, v)| (format!("{}-{}{}", prefix, side, suffix), v.to_string()))
            .collect()
    };
    let axes = |prefix: &str| {
        let parts: Vec<&str> = value.split_ascii_whitespace().collect();
        let (x, y) = match parts.as_slice() {
            [both] => (*both, *both),
            [x, y, ..] => (*x, *y),
            [] => return Vec::new(),
        };
        vec![(format!("{}-x", prefix), x.to_string()), (format!("{}-y", prefix), y.to_string())]
    };

    match name {
        "margin" => sides("margin", ""),
        "padding" => sides("padding", ""),
        "border-width" => sides("border", "-width"),
        "border-style" => sides("border", "-style"),
        "overflow" => axes("overflow"),
        "overscroll-behavior" => axes("overscroll-behavior"),
        "background" if !value.contains("url(") && !value.contains(' ') => {
            vec![("background-color".to_string(), value.to_string())]
        }
        _ => vec![(name.to_string(), value.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declarations_parse() {
        let decls = StyleDeclarations::parse(
            "color: red; background: url(data:image/png;base64,AAA=) ; width:10px !important;;",
        );
        assert_eq!(decls.len(), 3);
        assert_eq!(decls.get("color"), Some("red"));
        assert_eq!(decls.get("background"), Some("url(data:image/png;base64,AAA=)"));
        assert_eq!(
            decls.css_text(),
            "color: red; background: url(data:image/png;base64,AAA=); width: 10px !important;"
        );
    }

    #[test]
    fn test_stylesheet_parse_skips_at_rules_and_comments() {
        let sheet = Stylesheet::parse(
            "@import url(a.css);\n/* p { color: blue } */\n.a { color: red }\n@media print { .b { color: green } }\np:hover { color: pink }\n#c, div { margin: 0 }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].declarations.get("color"), Some("red"));
        assert_eq!(sheet.rules[1].selectors.selectors().len(), 2);
    }

    #[test]
    fn test_non_elements_have_no_style() {
        assert!(computed_style(&NodeHandle::new_text("x")).is_none());
    }

    #[test]
    fn test_cascade_order() {
        let doc = Document::new();
        let style = doc.create_element("style");
        style
            .append_child(&doc.create_text_node(
                "p { color: red; margin: 1px 2px } .x { color: green } p { font-size: 20px !important }",
            ))
            .unwrap();
        doc.head().unwrap().append_child(&style).unwrap();

        let body = doc.body().unwrap();
        body.set_style_text("color: blue; cursor: pointer").unwrap();
        let p = doc.create_element("p");
        p.set_attribute("class", "x").unwrap();
        p.set_style_text("font-size: 10px").unwrap();
        body.append_child(&p).unwrap();

        let computed = computed_style(&p).unwrap();
        assert_eq!(computed.get("color"), Some("green"));
        assert_eq!(computed.get("font-size"), Some("20px"));
        assert_eq!(computed.get("margin-left"), Some("2px"));
        assert_eq!(computed.get("margin-top"), Some("1px"));
        assert_eq!(computed.get("display"), Some("block"));
        assert_eq!(computed.get("cursor"), Some("pointer"));
        assert_eq!(computed.len(), PROPERTIES.len());
    }

    #[test]
    fn test_resolver_matches_fresh_resolution() {
        let doc = Document::parse_html(
            "<head><style>.a { color: red } .a > i { font-style: normal } b { font-weight: 700 }</style></head>\
             <body><div class=\"a\"><p>x<i>y</i></p><b>z</b></div><section><i>w</i></section></body>",
        )
        .unwrap();

        let mut resolver = StyleResolver::for_node(doc.node());
        assert_eq!(resolver.sheets().len(), 1);

        let nodes = doc.body().unwrap().descendants();
        for node in &nodes {
            assert_eq!(resolver.computed_style(node).cloned(), computed_style(node));
        }
        // Out of tree order and repeated
        for node in nodes.iter().rev().chain(nodes.iter()) {
            assert_eq!(resolver.computed_style(node).cloned(), computed_style(node));
        }

        let italic = doc.query_selector("p > i").unwrap().unwrap();
        assert_eq!(resolver.computed_style(&italic).unwrap().get("color"), Some("red"));
    }

    #[test]
    fn test_resolver_reuses_parent_styles() {
        let doc = Document::new();
        let mut node = doc.body().unwrap();
        node.set_style_text("color: teal").unwrap();
        for _ in 0..2_000 {
            let child = doc.create_element("div");
            node.append_child(&child).unwrap();
            node = child;
        }

        let mut resolver = StyleResolver::for_node(&node);
        for element in doc.body().unwrap().descendants() {
            assert_eq!(resolver.computed_style(&element).unwrap().get("color"), Some("teal"));
        }
        // html, body and the chain
        assert_eq!(resolver.path.len(), 2_002);
    }

    #[test]
    fn test_unknown_properties_are_appended() {
        let div = NodeHandle::new_element("div");
        div.set_style_text("--accent: teal; color: inherit").unwrap();

        let computed = computed_style(&div).unwrap();
        assert_eq!(computed.get("--accent"), Some("teal"));
        assert_eq!(computed.get("color"), Some("rgb(0, 0, 0)"));
        assert_eq!(computed.iter().last(), Some(("--accent", "teal")));
    }
}
