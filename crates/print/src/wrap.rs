//! Rebuilding the target's ancestor chain around its clone.

use isoprint_dom::{Document, NodeHandle};

use crate::clone::customize;
use crate::config::{PrintOptions, StyleArgs};
use crate::error::PrintResult;

/// Marker class added to every wrapper node
pub const WRAP_CLASS: &str = "print-surface__wrap";

/// Style forced onto wrappers so a positioned ancestor cannot move the
/// printed content out of flow
pub const WRAP_STYLE: &str = "position: static;";

fn is_boundary(node: &NodeHandle, document: Option<&Document>) -> bool {
    if node.is_document() {
        return true;
    }
    match document {
        Some(document) => {
            document.body().as_ref() == Some(node) || document.document_element().as_ref() == Some(node)
        }
        None => false,
    }
}

/// Nest `cloned` inside shallow clones of `source`'s ancestors, up to but
/// excluding the body and the root element. Returns `cloned` itself when
/// wrapping is off or no ancestor qualifies.
pub fn wrap(source: &NodeHandle, cloned: NodeHandle, options: &PrintOptions) -> PrintResult<NodeHandle> {
    if !options.wrap {
        return Ok(cloned);
    }

    let document = source.owner_document();
    let mut innermost: Option<NodeHandle> = None;
    let mut outermost: Option<NodeHandle> = None;
    let mut current = source.parent();

    while let Some(ancestor) = current {
        if is_boundary(&ancestor, document.as_ref()) {
            break;
        }

        let class_name = format!("{} {}", ancestor.class_name(), WRAP_CLASS);
        let args = StyleArgs::new(WRAP_STYLE, class_name.trim());
        let wrapper = customize(options.on_node.as_ref(), &ancestor, ancestor.clone_shallow(), args)?;

        if wrapper.is_element() {
            match &outermost {
                Some(inner) => wrapper.append_child(inner)?,
                None => innermost = Some(wrapper.clone()),
            }
            outermost = Some(wrapper);
        } else {
            tracing::trace!(ancestor = ?ancestor, "hook dropped wrapper");
        }
        current = ancestor.parent();
    }

    match (innermost, outermost) {
        (Some(innermost), Some(outermost)) => {
            innermost.append_child(&cloned)?;
            Ok(outermost)
        }
        _ => Ok(cloned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clone::clone_tree;
    use crate::config::HookOutcome;
    use pretty_assertions::assert_eq;

    fn nested() -> (Document, NodeHandle) {
        let doc = Document::parse_html(
            "<body><main class=\"page\" style=\"position: fixed\"><section><article>\
             <p id=\"target\">x</p></article></section></main></body>",
        )
        .unwrap();
        let target = doc.query_selector("#target").unwrap().unwrap();
        (doc, target)
    }

    #[test]
    fn test_wrap_off_returns_clone() {
        let (_, target) = nested();
        let options = PrintOptions::default();
        let clone = clone_tree(&target, &options).unwrap();
        let result = wrap(&target, clone.clone(), &options).unwrap();
        assert_eq!(result, clone);
    }

    #[test]
    fn test_wrap_rebuilds_ancestors() {
        let (_, target) = nested();
        let options = PrintOptions::default().wrap(true);
        let clone = clone_tree(&target, &options).unwrap();
        let root = wrap(&target, clone.clone(), &options).unwrap();

        assert!(root.has_local_name("main"));
        assert_eq!(root.class_name(), "page print-surface__wrap");
        assert_eq!(root.style_text(), WRAP_STYLE);

        let mut node = root.clone();
        for name in ["section", "article"] {
            node = node.children()[0].clone();
            assert!(node.has_local_name(name));
            assert_eq!(node.class_name(), WRAP_CLASS);
        }
        assert_eq!(node.children(), vec![clone]);
    }

    #[test]
    fn test_direct_child_of_body_is_not_wrapped() {
        let (doc, _) = nested();
        let main = doc.query_selector("main").unwrap().unwrap();
        let options = PrintOptions::default().wrap(true);
        let clone = clone_tree(&main, &options).unwrap();
        assert_eq!(wrap(&main, clone.clone(), &options).unwrap(), clone);
    }

    #[test]
    fn test_hook_can_drop_a_wrapper() {
        let (_, target) = nested();
        let options = PrintOptions::default().wrap(true).on_node(|source, _, _| {
            if source.has_local_name("section") {
                HookOutcome::Replace(NodeHandle::new_text(""))
            } else {
                HookOutcome::Unchanged
            }
        });
        let clone = clone_tree(&target, &options).unwrap();
        let root = wrap(&target, clone.clone(), &options).unwrap();

        assert!(root.has_local_name("main"));
        let article = root.children()[0].clone();
        assert!(article.has_local_name("article"));
        assert_eq!(article.children(), vec![clone]);
    }
}
