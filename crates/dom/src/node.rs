//! Defines the core Node structure and the shared handles used to walk and
//! mutate the tree.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::canvas::{self, Canvas};
use crate::document::{Document, DocumentState};
use crate::error::{DomError, DomResult};
use crate::resource::{LoadSignal, LoadState};

/// Represents a single attribute (name-value pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Represents an HTML element within the DOM.
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    canvas: Option<Canvas>,
    load: Option<LoadSignal>,
    content_document: Option<Document>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        let mut element = Self {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
            canvas: None,
            load: None,
            content_document: None,
        };
        if element.name == "canvas" {
            element.canvas = Some(Canvas::default());
        }
        element.load = element.resource_state().map(LoadSignal::new);
        element
    }

    /// Lower-case local name
    pub fn local_name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
            .map(|attr| attr.value.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.clone(),
                value: value.to_string(),
            }),
        }
        self.attribute_changed(&name);
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|attr| !attr.name.eq_ignore_ascii_case(name));
        let removed = self.attributes.len() != before;
        if removed {
            self.attribute_changed(&name.to_ascii_lowercase());
        }
        removed
    }

    fn attribute_changed(&mut self, name: &str) {
        match (self.name.as_str(), name) {
            ("img", "src") | ("link", "href") | ("link", "rel") => {
                if let Some(state) = self.resource_state() {
                    match &self.load {
                        Some(signal) => signal.set(state),
                        None => self.load = Some(LoadSignal::new(state)),
                    }
                }
            }
            ("canvas", "width") | ("canvas", "height") => {
                let size = self.canvas_dimensions();
                if let Some(canvas) = self.canvas.as_mut() {
                    canvas.resize(size.0, size.1);
                }
            }
            _ => {}
        }
    }

    fn canvas_dimensions(&self) -> (u32, u32) {
        let read = |name: &str, fallback: u32| {
            self.get_attribute(name)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(fallback)
        };
        (read("width", canvas::DEFAULT_WIDTH), read("height", canvas::DEFAULT_HEIGHT))
    }

    fn is_stylesheet_link(&self) -> bool {
        self.name == "link"
            && self
                .get_attribute("rel")
                .map(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
                .unwrap_or(false)
    }

    /// The state a freshly inserted resource element starts in, or `None`
    /// for elements that never fire load events.
    fn resource_state(&self) -> Option<LoadState> {
        match self.name.as_str() {
            "img" => Some(LoadState::for_reference(self.get_attribute("src"))),
            "link" if self.is_stylesheet_link() => {
                Some(LoadState::for_reference(self.get_attribute("href")))
            }
            "link" | "style" => Some(LoadState::Loaded),
            _ => None,
        }
    }

    /// Tag and attributes only. A cloned canvas starts blank, a cloned
    /// resource restarts its load and a cloned frame has no document yet.
    fn shallow_copy(&self) -> Element {
        let mut element = Element {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            canvas: None,
            load: None,
            content_document: None,
        };
        if let Some(canvas) = &self.canvas {
            let (width, height) = canvas.size();
            element.canvas = Some(Canvas::new(width, height));
        }
        element.load = element.resource_state().map(LoadSignal::new);
        element
    }
}

/// Represents the different types of nodes in the DOM
#[derive(Debug, Clone)]
pub enum NodeData {
    /// The document root
    Document(Arc<DocumentState>),
    /// An HTML element
    Element(Element),
    /// A text node
    Text(String),
    /// A comment node
    Comment(String),
    /// A doctype declaration
    Doctype { name: String },
}

/// Node kind without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    Doctype,
}

/// Represents a node in the DOM tree.
#[derive(Debug)]
pub struct Node {
    /// The actual node data
    pub data: NodeData,
    parent: Option<Weak<RwLock<Node>>>,
    children: Vec<NodeHandle>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Document(_) => NodeKind::Document,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Doctype { .. } => NodeKind::Doctype,
        }
    }

    pub fn element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

/// Children are freed from an explicit stack so that dropping an
/// arbitrarily deep tree does not recurse. A child still referenced from
/// elsewhere keeps its own subtree.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(child) = stack.pop() {
            if let Ok(lock) = Arc::try_unwrap(child.0) {
                let mut node = lock.into_inner();
                stack.append(&mut node.children);
            }
        }
    }
}

/// Shared handle to a node. Equality and hashing go by identity, so a
/// handle can key a side-table for the lifetime of a traversal.
#[derive(Clone)]
pub struct NodeHandle(Arc<RwLock<Node>>);

impl NodeHandle {
    pub fn from_data(data: NodeData) -> Self {
        NodeHandle(Arc::new(RwLock::new(Node {
            data,
            parent: None,
            children: Vec::new(),
        })))
    }

    /// A detached element. It gains an owner document once appended under one.
    pub fn new_element(tag: &str) -> Self {
        Self::from_data(NodeData::Element(Element::new(tag)))
    }

    pub fn new_text(text: &str) -> Self {
        Self::from_data(NodeData::Text(text.to_string()))
    }

    pub fn new_comment(text: &str) -> Self {
        Self::from_data(NodeData::Comment(text.to_string()))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Node> {
        self.0.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Node> {
        self.0.write()
    }

    pub fn ptr_eq(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> NodeKind {
        self.read().kind()
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_document(&self) -> bool {
        self.kind() == NodeKind::Document
    }

    /// Lower-case tag name for elements
    pub fn local_name(&self) -> Option<String> {
        self.read().element().map(|e| e.local_name().to_string())
    }

    pub fn has_local_name(&self, name: &str) -> bool {
        self.read()
            .element()
            .map(|e| e.local_name().eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.read()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(NodeHandle)
    }

    pub fn children(&self) -> Vec<NodeHandle> {
        self.read().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.read().children.len()
    }

    /// Every node below this one in tree order, excluding itself.
    pub fn descendants(&self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeHandle> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    fn is_inclusive_ancestor_of(&self, other: &NodeHandle) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Append `child`, moving it out of its current parent first.
    pub fn append_child(&self, child: &NodeHandle) -> DomResult<()> {
        if !matches!(self.kind(), NodeKind::Element | NodeKind::Document) {
            return Err(DomError::HierarchyRequest(format!(
                "{:?} nodes cannot have children",
                self.kind()
            )));
        }
        if child.is_document() {
            return Err(DomError::HierarchyRequest("a document cannot be a child".to_string()));
        }
        // A childless node can only be an inclusive ancestor of itself
        let may_contain = child.ptr_eq(self) || !child.read().children.is_empty();
        if may_contain && child.is_inclusive_ancestor_of(self) {
            return Err(DomError::HierarchyRequest(
                "the new child is an ancestor of the parent".to_string(),
            ));
        }

        self.adopt(child);
        Ok(())
    }

    /// Link `child` as the last child without hierarchy checks.
    pub(crate) fn adopt(&self, child: &NodeHandle) {
        child.detach();
        child.write().parent = Some(Arc::downgrade(&self.0));
        self.write().children.push(child.clone());
    }

    pub fn remove_child(&self, child: &NodeHandle) -> bool {
        match child.parent() {
            Some(parent) if parent.ptr_eq(self) => {
                child.detach();
                true
            }
            _ => false,
        }
    }

    /// Remove this node from its parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.write().children.retain(|c| !c.ptr_eq(self));
        }
        self.write().parent = None;
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.read()
            .element()
            .and_then(|e| e.get_attribute(name))
            .map(str::to_string)
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> DomResult<()> {
        let mut node = self.write();
        let kind = node.kind();
        match node.element_mut() {
            Some(element) => {
                element.set_attribute(name, value);
                Ok(())
            }
            None => Err(DomError::NotAnElement(format!("{:?}", kind))),
        }
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        self.write()
            .element_mut()
            .map(|e| e.remove_attribute(name))
            .unwrap_or(false)
    }

    /// The `class` attribute, empty when absent
    pub fn class_name(&self) -> String {
        self.get_attribute("class").unwrap_or_default()
    }

    pub fn set_class_name(&self, class_name: &str) -> DomResult<()> {
        self.set_attribute("class", class_name)
    }

    pub fn class_list(&self) -> Vec<String> {
        self.class_name()
            .split_ascii_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Inline `style` attribute text, empty when absent
    pub fn style_text(&self) -> String {
        self.get_attribute("style").unwrap_or_default()
    }

    pub fn set_style_text(&self, css_text: &str) -> DomResult<()> {
        self.set_attribute("style", css_text)
    }

    /// Duplicate the node without its descendants.
    pub fn clone_shallow(&self) -> NodeHandle {
        let data = match &self.read().data {
            NodeData::Element(element) => NodeData::Element(element.shallow_copy()),
            NodeData::Document(state) => NodeData::Document(Arc::new(DocumentState::inherit(state))),
            other => other.clone(),
        };
        NodeHandle::from_data(data)
    }

    /// Duplicate the node and its whole subtree.
    pub fn clone_deep(&self) -> DomResult<NodeHandle> {
        let root = self.clone_shallow();
        let mut stack = vec![(self.clone(), root.clone())];
        while let Some((source, copy)) = stack.pop() {
            for child in source.children() {
                let child_copy = child.clone_shallow();
                copy.append_child(&child_copy)?;
                stack.push((child, child_copy));
            }
        }
        Ok(root)
    }

    /// The document this node is connected to. A document is its own owner;
    /// a node that was never attached has none.
    pub fn owner_document(&self) -> Option<Document> {
        let mut root = self.clone();
        while let Some(parent) = root.parent() {
            root = parent;
        }
        Document::from_node(&root)
    }

    pub fn text_content(&self) -> String {
        if let NodeData::Text(text) = &self.read().data {
            return text.clone();
        }
        self.descendants()
            .iter()
            .filter_map(|n| match &n.read().data {
                NodeData::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// The nested document of an `<iframe>`
    pub fn content_document(&self) -> Option<Document> {
        self.read().element().and_then(|e| e.content_document.clone())
    }

    pub(crate) fn set_content_document(&self, document: Document) {
        if let Some(element) = self.write().element_mut() {
            element.content_document = Some(document);
        }
    }

    pub fn is_canvas(&self) -> bool {
        self.read().element().map(|e| e.canvas.is_some()).unwrap_or(false)
    }

    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.read().element().and_then(|e| e.canvas.as_ref()).map(Canvas::size)
    }

    /// Paint the whole canvas bitmap at once.
    pub fn set_canvas_pixels(&self, width: u32, height: u32, pixels: Vec<u8>) -> DomResult<()> {
        let mut node = self.write();
        let element = node
            .element_mut()
            .ok_or_else(|| DomError::NotAnElement("non-element".to_string()))?;
        let name = element.name.clone();
        let canvas = element
            .canvas
            .as_mut()
            .ok_or(DomError::NotACanvas { element_name: name })?;
        canvas.set_pixels(width, height, pixels)?;
        element.attributes.retain(|a| a.name != "width" && a.name != "height");
        element.attributes.push(Attribute { name: "width".into(), value: width.to_string() });
        element.attributes.push(Attribute { name: "height".into(), value: height.to_string() });
        Ok(())
    }

    /// Snapshot of the canvas bitmap as a PNG data URL
    pub fn to_data_url(&self) -> DomResult<String> {
        let node = self.read();
        let element = node
            .element()
            .ok_or_else(|| DomError::NotAnElement(format!("{:?}", node.kind())))?;
        match &element.canvas {
            Some(canvas) => canvas.to_data_url(),
            None => Err(DomError::NotACanvas {
                element_name: element.local_name().to_string(),
            }),
        }
    }

    pub fn load_signal(&self) -> Option<LoadSignal> {
        self.read().element().and_then(|e| e.load.clone())
    }

    pub fn load_state(&self) -> Option<LoadState> {
        self.load_signal().map(|s| s.state())
    }

    /// Fire `load` (or `error`) on a resource element. Returns false for
    /// elements that carry no resource.
    pub fn finish_load(&self, state: LoadState) -> bool {
        match self.load_signal() {
            Some(signal) => {
                signal.set(state);
                true
            }
            None => false,
        }
    }

    /// Resolves once the element fired `load` or `error`. Elements without a
    /// resource count as loaded.
    pub async fn loaded(&self) -> LoadState {
        match self.load_signal() {
            Some(signal) => signal.settled().await,
            None => LoadState::Loaded,
        }
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for NodeHandle {}

impl Hash for NodeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.read().data {
            NodeData::Document(_) => write!(f, "#document"),
            NodeData::Element(e) => write!(f, "<{}>", e.local_name()),
            NodeData::Text(t) => write!(f, "#text {:?}", t),
            NodeData::Comment(c) => write!(f, "<!-- {} -->", c),
            NodeData::Doctype { name } => write!(f, "<!DOCTYPE {}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_creation() {
        let node = NodeHandle::new_element("DIV");
        assert_eq!(node.local_name().as_deref(), Some("div"));
        assert!(node.is_element());
        assert!(node.parent().is_none());
        assert!(node.owner_document().is_none());
    }

    #[test]
    fn test_append_reparents() {
        let a = NodeHandle::new_element("div");
        let b = NodeHandle::new_element("div");
        let child = NodeHandle::new_text("hi");

        a.append_child(&child).unwrap();
        b.append_child(&child).unwrap();

        assert_eq!(a.child_count(), 0);
        assert_eq!(b.children(), vec![child.clone()]);
        assert_eq!(child.parent(), Some(b));
    }

    #[test]
    fn test_hierarchy_errors() {
        let parent = NodeHandle::new_element("div");
        let child = NodeHandle::new_element("span");
        parent.append_child(&child).unwrap();

        assert!(matches!(child.append_child(&parent), Err(DomError::HierarchyRequest(_))));
        assert!(matches!(parent.append_child(&parent), Err(DomError::HierarchyRequest(_))));

        let text = NodeHandle::new_text("x");
        assert!(matches!(text.append_child(&child), Err(DomError::HierarchyRequest(_))));
    }

    #[test]
    fn test_shallow_clone_drops_children() {
        let div = NodeHandle::new_element("div");
        div.set_attribute("class", "a b").unwrap();
        div.append_child(&NodeHandle::new_text("x")).unwrap();

        let copy = div.clone_shallow();
        assert_ne!(copy, div);
        assert_eq!(copy.class_list(), vec!["a", "b"]);
        assert_eq!(copy.child_count(), 0);
    }

    #[test]
    fn test_dropping_deep_tree_does_not_overflow() {
        const DEPTH: usize = 150_000;
        let mut node = NodeHandle::new_element("div");
        let leaf = node.clone();
        for _ in 0..DEPTH {
            let parent = NodeHandle::new_element("div");
            parent.append_child(&node).unwrap();
            node = parent;
        }
        assert_eq!(node.descendants().len(), DEPTH);

        let deep_copy = node.clone_deep().unwrap();
        drop(node);
        drop(deep_copy);

        // A node still held elsewhere survives its ancestors
        assert!(leaf.parent().is_none());
        assert_eq!(leaf.local_name().as_deref(), Some("div"));
    }

    #[test]
    fn test_deep_clone_of_document() {
        let doc = Document::new();
        let copy = doc.node().clone_deep().unwrap();
        assert!(copy.is_document());
        let html = copy.children()[0].clone();
        let names: Vec<Option<String>> = html.children().iter().map(|n| n.local_name()).collect();
        assert_eq!(names, vec![Some("head".to_string()), Some("body".to_string())]);
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let style = NodeHandle::new_element("style");
        style.append_child(&NodeHandle::new_text("p { color: red }")).unwrap();

        let copy = style.clone_deep().unwrap();
        assert_eq!(copy.text_content(), "p { color: red }");
        assert_eq!(copy.load_state(), Some(LoadState::Loaded));
    }

    #[test]
    fn test_image_load_state_follows_src() {
        let img = NodeHandle::new_element("img");
        assert_eq!(img.load_state(), Some(LoadState::Failed));

        img.set_attribute("src", "/a.png").unwrap();
        assert_eq!(img.load_state(), Some(LoadState::Pending));

        img.set_attribute("src", "data:image/png;base64,AA==").unwrap();
        assert_eq!(img.load_state(), Some(LoadState::Loaded));
    }

    #[test]
    fn test_canvas_pixels() {
        let canvas = NodeHandle::new_element("canvas");
        assert_eq!(canvas.canvas_size(), Some((300, 150)));

        canvas.set_canvas_pixels(1, 1, vec![1, 2, 3, 255]).unwrap();
        assert_eq!(canvas.canvas_size(), Some((1, 1)));
        assert_eq!(canvas.get_attribute("width").as_deref(), Some("1"));

        let div = NodeHandle::new_element("div");
        assert!(matches!(div.to_data_url(), Err(DomError::NotACanvas { .. })));
    }
}
