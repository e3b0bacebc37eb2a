//! Freezing resolved styles into inline declarations.

use isoprint_dom::{NodeHandle, StyleResolver};
use regex::Regex;

/// Serialize the resolved style of `node` as `prop:value;` pairs, in the
/// order the style reports them, leaving out every property whose name
/// matches `exclude`. Non-element nodes freeze to an empty string.
pub fn freeze(node: &NodeHandle, exclude: &Regex) -> String {
    freeze_with(&mut StyleResolver::for_node(node), node, exclude)
}

/// [`freeze`] against a resolver shared across a whole subtree.
pub fn freeze_with(styles: &mut StyleResolver, node: &NodeHandle, exclude: &Regex) -> String {
    let style = match styles.computed_style(node) {
        Some(style) => style,
        None => return String::new(),
    };

    let mut css_text = String::new();
    for (name, value) in style.iter().filter(|(name, _)| !exclude.is_match(name)) {
        css_text.push_str(name);
        css_text.push(':');
        css_text.push_str(value);
        css_text.push(';');
    }
    css_text
}
