//! Cloning a source subtree with frozen styles.
//!
//! The source tree is only read. Clones are tracked in a side-table keyed
//! by source node identity for the duration of one call, so each clone can
//! be attached under the clone of its nearest visited ancestor.

use std::collections::HashMap;

use isoprint_dom::{DomResult, NodeHandle, NodeKind, StyleResolver};

use crate::config::{HookOutcome, NodeHook, PrintOptions, StyleArgs};
use crate::error::{PrintError, PrintResult};
use crate::freeze::freeze_with;
use crate::walk::{try_walk, Signal};

/// Run the customization hook for one node and apply the resulting style
/// and class to whichever node ends up in the output.
///
/// Without a hook the defaults in `args` apply. A hook may edit `args` in
/// place and return [`HookOutcome::Unchanged`], hand back new arguments, or
/// replace the node; a replacement still receives the arguments. Empty
/// values are never assigned, and non-element outputs receive nothing.
pub(crate) fn customize(
    hook: Option<&NodeHook>,
    source: &NodeHandle,
    clone: NodeHandle,
    mut args: StyleArgs,
) -> DomResult<NodeHandle> {
    let output = match hook.map(|hook| hook(source, &clone, &mut args)) {
        None | Some(HookOutcome::Unchanged) => clone,
        Some(HookOutcome::Override(overridden)) => {
            args = overridden;
            clone
        }
        Some(HookOutcome::Replace(replacement)) => replacement,
    };

    if output.is_element() {
        if !args.css_text.is_empty() {
            output.set_style_text(&args.css_text)?;
        }
        if !args.class_name.is_empty() {
            output.set_class_name(&args.class_name)?;
        }
    }
    Ok(output)
}

/// The node that is actually printed for `node`: printing the document or
/// its root element prints the body.
pub fn printable_root(node: &NodeHandle) -> NodeHandle {
    if let Some(document) = node.owner_document() {
        let is_root = node.is_document() || document.document_element().as_ref() == Some(node);
        if is_root {
            if let Some(body) = document.body() {
                return body;
            }
        }
    }
    node.clone()
}

fn is_skipped(node: &NodeHandle) -> bool {
    node.kind() == NodeKind::Comment || node.has_local_name("script")
}

/// A static image of the canvas's current pixels
fn snapshot_canvas(canvas: &NodeHandle) -> DomResult<NodeHandle> {
    let image = NodeHandle::new_element("img");
    image.set_attribute("src", &canvas.to_data_url()?)?;
    Ok(image)
}

fn clone_node(source: &NodeHandle, styles: &mut StyleResolver, options: &PrintOptions) -> DomResult<NodeHandle> {
    let clone = if source.is_canvas() {
        snapshot_canvas(source)?
    } else {
        source.clone_shallow()
    };
    let frozen = freeze_with(styles, source, &options.exclude_style_pattern);
    let args = StyleArgs::new(frozen, source.class_name());
    customize(options.on_node.as_ref(), source, clone, args)
}

/// Clone `root` and its subtree with every element's resolved style frozen
/// inline. Comments and scripts are left out together with their subtrees.
/// Canvases become images of their current content.
pub fn clone_tree(root: &NodeHandle, options: &PrintOptions) -> PrintResult<NodeHandle> {
    let root = printable_root(root);
    let mut clones: HashMap<NodeHandle, NodeHandle> = HashMap::new();
    let mut styles = StyleResolver::for_node(&root);

    try_walk([root.clone()], NodeHandle::children, |source, ctx| -> PrintResult<Signal> {
        if is_skipped(source) {
            return Ok(Signal::Skip);
        }
        let clone = clone_node(source, &mut styles, options)?;
        if let Some(parent) = ctx.parent().and_then(|parent| clones.get(parent)) {
            parent.append_child(&clone)?;
        }
        clones.insert(source.clone(), clone);
        Ok(Signal::Descend)
    })?;

    tracing::debug!(nodes = clones.len(), root = ?root, "cloned print subtree");
    clones
        .remove(&root)
        .ok_or_else(|| PrintError::Unprintable(format!("{:?} has no printable content", root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXCLUDE;
    use crate::freeze::freeze;
    use isoprint_dom::Document;
    use pretty_assertions::assert_eq;

    fn sample() -> (Document, NodeHandle) {
        let doc = Document::parse_html(
            "<html><head><style>.card { color: rgb(1, 2, 3) }</style></head><body>\
             <div id=\"target\" class=\"card\"><h1>Title</h1><!-- hidden -->\
             <script>alert(1)</script><p>Body <b>text</b></p><canvas width=\"2\" height=\"2\"></canvas></div>\
             </body></html>",
        )
        .unwrap();
        let target = doc.query_selector("#target").unwrap().unwrap();
        (doc, target)
    }

    fn shape(node: &NodeHandle) -> String {
        let name = match node.local_name() {
            Some(name) => name,
            None => format!("{:?}", node.kind()),
        };
        let children: Vec<String> = node.children().iter().map(shape).collect();
        if children.is_empty() {
            name
        } else {
            format!("{}({})", name, children.join(","))
        }
    }

    #[test]
    fn test_clone_skips_comments_and_scripts() {
        let (_, target) = sample();
        let clone = clone_tree(&target, &PrintOptions::default()).unwrap();
        assert_eq!(shape(&clone), "div(h1(Text),p(Text,b(Text)),img)");
        assert!(clone.parent().is_none());
    }

    #[test]
    fn test_clone_freezes_styles_and_keeps_classes() {
        let (_, target) = sample();
        let clone = clone_tree(&target, &PrintOptions::default()).unwrap();

        assert_eq!(clone.class_name(), "card");
        let style = clone.style_text();
        assert!(style.contains("color:rgb(1, 2, 3);"));
        assert!(!style.contains("cursor:"));
        assert_eq!(clone.get_attribute("id").as_deref(), Some("target"));
    }

    #[test]
    fn test_clone_is_repeatable() {
        let (_, target) = sample();
        let first = clone_tree(&target, &PrintOptions::default()).unwrap();
        let second = clone_tree(&target, &PrintOptions::default()).unwrap();

        let styles = |root: &NodeHandle| -> Vec<(String, String)> {
            std::iter::once(root.clone())
                .chain(root.descendants())
                .map(|n| (n.style_text(), n.class_name()))
                .collect()
        };
        assert_eq!(styles(&first), styles(&second));
    }

    #[test]
    fn test_source_is_untouched() {
        let (_, target) = sample();
        let before: Vec<(String, usize)> = target
            .descendants()
            .iter()
            .map(|n| (n.style_text(), n.child_count()))
            .collect();
        clone_tree(&target, &PrintOptions::default()).unwrap();
        let after: Vec<(String, usize)> = target
            .descendants()
            .iter()
            .map(|n| (n.style_text(), n.child_count()))
            .collect();
        assert_eq!(before, after);
        assert_eq!(target.style_text(), "");
    }

    #[test]
    fn test_canvas_becomes_image() {
        let (doc, _) = sample();
        let canvas = doc.query_selector("canvas").unwrap().unwrap();
        canvas.set_attribute("class", "chart").unwrap();

        let image = clone_tree(&canvas, &PrintOptions::default()).unwrap();
        assert!(image.has_local_name("img"));
        assert!(image
            .get_attribute("src")
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(image.class_name(), "chart");
    }

    #[test]
    fn test_hook_sees_image_substitution() {
        let (doc, _) = sample();
        let canvas = doc.query_selector("canvas").unwrap().unwrap();
        let options = PrintOptions::default().on_node(|source, clone, args| {
            if source.is_canvas() {
                assert!(clone.has_local_name("img"));
                args.class_name = "snapshot".to_string();
            }
            HookOutcome::Unchanged
        });

        let image = clone_tree(&canvas, &options).unwrap();
        assert_eq!(image.class_name(), "snapshot");
    }

    #[test]
    fn test_hook_override_and_replace() {
        let (_, target) = sample();
        let options = PrintOptions::default().on_node(|source, _, _| {
            if source.has_local_name("h1") {
                let replacement = NodeHandle::new_element("h2");
                HookOutcome::Replace(replacement)
            } else if source.has_local_name("b") {
                HookOutcome::Override(StyleArgs::new("font-weight: 900;", ""))
            } else {
                HookOutcome::Unchanged
            }
        });

        let clone = clone_tree(&target, &options).unwrap();
        assert_eq!(shape(&clone), "div(h2(Text),p(Text,b(Text)),img)");

        let h2 = clone.children()[0].clone();
        assert!(h2.style_text().contains("display:block;"));
        let b = clone.children()[1].children()[1].clone();
        assert_eq!(b.style_text(), "font-weight: 900;");
        assert_eq!(b.get_attribute("class"), None);
    }

    #[test]
    fn test_large_subtree_freezes_like_single_nodes() {
        let rules: String = (0..120)
            .map(|i| format!(".c{} {{ margin-left: {}px; color: rgb({}, 0, 0) }}\n", i, i, i))
            .collect();
        let items: String = (0..120)
            .map(|i| format!("<li class=\"c{}\"><span>{}</span><em class=\"c{}\">x</em></li>", i, i, (i + 7) % 120))
            .collect();
        let doc = Document::parse_html(&format!(
            "<head><style>{}</style></head><body><ul id=\"list\" style=\"font-size: 11px\">{}</ul></body>",
            rules, items
        ))
        .unwrap();
        let list = doc.query_selector("#list").unwrap().unwrap();

        let clone = clone_tree(&list, &PrintOptions::default()).unwrap();
        let sources: Vec<NodeHandle> = std::iter::once(list.clone()).chain(list.descendants()).collect();
        let clones: Vec<NodeHandle> = std::iter::once(clone.clone()).chain(clone.descendants()).collect();
        assert_eq!(sources.len(), clones.len());
        for (source, copy) in sources.iter().zip(&clones) {
            assert_eq!(copy.style_text(), freeze(source, &DEFAULT_EXCLUDE));
        }

        let last_em = clones.last().unwrap().parent().unwrap();
        assert!(last_em.style_text().contains("color:rgb(6, 0, 0);"));
        assert!(last_em.style_text().contains("font-size:11px;"));
    }

    #[test]
    fn test_document_and_root_print_the_body() {
        let (doc, _) = sample();
        let from_document = clone_tree(doc.node(), &PrintOptions::default()).unwrap();
        let from_html = clone_tree(&doc.document_element().unwrap(), &PrintOptions::default()).unwrap();
        assert!(from_document.has_local_name("body"));
        assert!(from_html.has_local_name("body"));
    }

    #[test]
    fn test_skipped_root_is_unprintable() {
        let (doc, _) = sample();
        let script = doc.query_selector("script").unwrap().unwrap();
        assert!(matches!(
            clone_tree(&script, &PrintOptions::default()),
            Err(PrintError::Unprintable(_))
        ));
    }
}
