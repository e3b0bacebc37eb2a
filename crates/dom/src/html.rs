//! Building documents from markup.
//!
//! Markup is parsed with kuchiki and the resulting tree is converted node by
//! node into the host model, so resource elements pick up their load state
//! and frames get their nested documents the same way scripted creation does.

use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData as KuchikiNodeData, NodeRef};

use crate::document::Document;
use crate::error::DomResult;
use crate::node::{NodeData, NodeHandle};

impl Document {
    /// Parse a full HTML document. The parser never fails on malformed
    /// markup; it recovers the way browsers do.
    pub fn parse_html(html: &str) -> DomResult<Document> {
        tracing::debug!(bytes = html.len(), "parsing document");
        let parsed = kuchiki::parse_html().one(html);
        let document = Document::empty();
        convert_children(&parsed, document.node(), &document)?;
        Ok(document)
    }
}

fn convert_children(source: &NodeRef, target: &NodeHandle, document: &Document) -> DomResult<()> {
    let mut stack: Vec<(NodeRef, NodeHandle)> = source
        .children()
        .rev()
        .map(|child| (child, target.clone()))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        let converted = match convert_node(&node, document)? {
            Some(converted) => converted,
            None => continue,
        };
        parent.append_child(&converted)?;
        stack.extend(node.children().rev().map(|child| (child, converted.clone())));
    }
    Ok(())
}

fn convert_node(node: &NodeRef, document: &Document) -> DomResult<Option<NodeHandle>> {
    let converted = match node.data() {
        KuchikiNodeData::Element(element) => {
            let handle = document.create_element(&element.name.local);
            for (name, attribute) in element.attributes.borrow().map.iter() {
                handle.set_attribute(&name.local, &attribute.value)?;
            }
            handle
        }
        KuchikiNodeData::Text(text) => document.create_text_node(&text.borrow()),
        KuchikiNodeData::Comment(comment) => NodeHandle::new_comment(&comment.borrow()),
        KuchikiNodeData::Doctype(doctype) => NodeHandle::from_data(NodeData::Doctype {
            name: doctype.name.clone(),
        }),
        _ => return Ok(None),
    };
    Ok(Some(converted))
}
