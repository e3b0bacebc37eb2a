//! Documents: the `#document` node of a tree plus the state a browsing
//! context keeps next to it (viewport, fonts, print dialog).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::DomResult;
use crate::node::{NodeData, NodeHandle};
use crate::resource::{LoadSignal, LoadState};
use crate::selector::SelectorList;

/// Size of the layout viewport, as reported by the root element's
/// `clientWidth`/`clientHeight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024, height: 768 }
    }
}

/// The native print flow of a browsing context. Opening it blocks until the
/// user dismisses the dialog; whether anything was printed is not reported.
pub trait PrintDialog: Send + Sync {
    fn open(&self, document: &Document);
}

/// Dialog used when the embedder installs none; it only records the call.
#[derive(Debug, Default)]
pub struct LoggingDialog;

impl PrintDialog for LoggingDialog {
    fn open(&self, document: &Document) {
        tracing::info!(
            nodes = document.node().descendants().len(),
            "print dialog opened"
        );
    }
}

/// Per-document state shared by every handle to the same document.
pub struct DocumentState {
    viewport: RwLock<Viewport>,
    fonts: LoadSignal,
    dialog: RwLock<Arc<dyn PrintDialog>>,
    prints: AtomicUsize,
}

impl DocumentState {
    pub fn new() -> Self {
        Self {
            viewport: RwLock::new(Viewport::default()),
            fonts: LoadSignal::new(LoadState::Loaded),
            dialog: RwLock::new(Arc::new(LoggingDialog)),
            prints: AtomicUsize::new(0),
        }
    }

    /// State for a nested browsing context: same viewport and dialog, its
    /// own font set and print counter.
    pub fn inherit(parent: &DocumentState) -> Self {
        Self {
            viewport: RwLock::new(*parent.viewport.read()),
            fonts: LoadSignal::new(LoadState::Loaded),
            dialog: RwLock::new(parent.dialog.read().clone()),
            prints: AtomicUsize::new(0),
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("viewport", &*self.viewport.read())
            .field("fonts", &self.fonts.state())
            .field("prints", &self.prints.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to a document
#[derive(Clone, Debug)]
pub struct Document {
    node: NodeHandle,
    state: Arc<DocumentState>,
}

impl Document {
    /// A document with no children at all.
    pub fn empty() -> Self {
        Self::with_state(Arc::new(DocumentState::new()))
    }

    /// A document with the usual `html > (head, body)` skeleton.
    pub fn new() -> Self {
        let document = Self::empty();
        document.build_skeleton();
        document
    }

    fn with_state(state: Arc<DocumentState>) -> Self {
        let node = NodeHandle::from_data(NodeData::Document(state.clone()));
        Self { node, state }
    }

    fn build_skeleton(&self) {
        let html = self.create_element("html");
        let head = self.create_element("head");
        let body = self.create_element("body");
        html.adopt(&head);
        html.adopt(&body);
        self.node.adopt(&html);
    }

    /// The document owning `node`, when `node` is a `#document`.
    pub fn from_node(node: &NodeHandle) -> Option<Document> {
        match &node.read().data {
            NodeData::Document(state) => Some(Document {
                node: node.clone(),
                state: state.clone(),
            }),
            _ => None,
        }
    }

    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        self.node.ptr_eq(&other.node)
    }

    /// The root element (`<html>`)
    pub fn document_element(&self) -> Option<NodeHandle> {
        self.node.children().into_iter().find(NodeHandle::is_element)
    }

    pub fn head(&self) -> Option<NodeHandle> {
        self.root_child("head")
    }

    pub fn body(&self) -> Option<NodeHandle> {
        self.root_child("body")
    }

    fn root_child(&self, name: &str) -> Option<NodeHandle> {
        self.document_element()?
            .children()
            .into_iter()
            .find(|n| n.has_local_name(name))
    }

    /// Create a detached element. Frames get their own content document.
    pub fn create_element(&self, tag: &str) -> NodeHandle {
        let element = NodeHandle::new_element(tag);
        if element.has_local_name("iframe") {
            let frame = Self::with_state(Arc::new(DocumentState::inherit(&self.state)));
            frame.build_skeleton();
            element.set_content_document(frame);
        }
        element
    }

    pub fn create_text_node(&self, text: &str) -> NodeHandle {
        NodeHandle::new_text(text)
    }

    /// First element in tree order matching `selectors`.
    pub fn query_selector(&self, selectors: &str) -> DomResult<Option<NodeHandle>> {
        let list = SelectorList::parse(selectors)?;
        Ok(self
            .node
            .descendants()
            .into_iter()
            .find(|n| list.matches(n)))
    }

    pub fn query_selector_all(&self, selectors: &str) -> DomResult<Vec<NodeHandle>> {
        let list = SelectorList::parse(selectors)?;
        Ok(self
            .node
            .descendants()
            .into_iter()
            .filter(|n| list.matches(n))
            .collect())
    }

    pub fn images(&self) -> Vec<NodeHandle> {
        self.elements_named(&["img"])
    }

    /// Owner nodes of the document's style sheets, in registration order.
    pub fn style_sheets(&self) -> Vec<NodeHandle> {
        self.elements_named(&["style", "link"])
            .into_iter()
            .filter(|n| {
                n.has_local_name("style")
                    || n.get_attribute("rel")
                        .map(|rel| {
                            rel.split_ascii_whitespace()
                                .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                        })
                        .unwrap_or(false)
            })
            .collect()
    }

    fn elements_named(&self, names: &[&str]) -> Vec<NodeHandle> {
        self.node
            .descendants()
            .into_iter()
            .filter(|n| names.iter().any(|name| n.has_local_name(name)))
            .collect()
    }

    pub fn viewport(&self) -> Viewport {
        *self.state.viewport.read()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.state.viewport.write() = viewport;
    }

    /// The document's font set readiness (`document.fonts.ready`)
    pub fn fonts(&self) -> &LoadSignal {
        &self.state.fonts
    }

    pub fn set_print_dialog(&self, dialog: Arc<dyn PrintDialog>) {
        *self.state.dialog.write() = dialog;
    }

    /// Open the native print dialog for this document. Blocks until the
    /// dialog returns.
    pub fn print(&self) {
        self.state.prints.fetch_add(1, Ordering::SeqCst);
        let dialog = self.state.dialog.read().clone();
        dialog.open(self);
    }

    /// How many times the print dialog was opened on this document
    pub fn print_count(&self) -> usize {
        self.state.prints.load(Ordering::SeqCst)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
