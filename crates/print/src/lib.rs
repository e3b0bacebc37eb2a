//! Isolated printing of a single DOM subtree
//!
//! The target is cloned with its resolved styles frozen inline, optionally
//! wrapped in shallow copies of its ancestors, and placed into an off-screen
//! frame. Once the frame's images, style resources and fonts have settled,
//! the print dialog is opened on the frame alone and the frame is removed.
//!
//! ```no_run
//! # async fn demo() -> Result<(), isoprint::PrintError> {
//! use isoprint::{Printer, PrintOptions};
//! use isoprint_dom::Document;
//!
//! let host = Document::parse_html("<body><div id=\"invoice\">Total: 42</div></body>")?;
//! let printer = Printer::new(host);
//! printer.print("#invoice", PrintOptions::default().wrap(true))?.await;
//! # Ok(())
//! # }
//! ```

use std::future::IntoFuture;

use futures::future::BoxFuture;
use isoprint_dom::{Document, NodeHandle};

pub mod clone;
pub mod config;
pub mod error;
pub mod freeze;
pub mod ready;
pub mod surface;
pub mod walk;
pub mod wrap;

/// Re-export common types
pub use config::{HookOutcome, NodeHook, PrintOptions, StyleArgs, DEFAULT_EXCLUDE_PATTERN};
pub use error::{PrintError, PrintResult};
pub use surface::Surface;

/// What to print: a node, or a selector resolved against the host document
#[derive(Debug, Clone)]
pub enum Target {
    Selector(String),
    Node(NodeHandle),
    /// No target at all
    Missing,
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeHandle> for Target {
    fn from(node: NodeHandle) -> Self {
        Target::Node(node)
    }
}

impl From<&NodeHandle> for Target {
    fn from(node: &NodeHandle) -> Self {
        Target::Node(node.clone())
    }
}

impl From<Option<NodeHandle>> for Target {
    fn from(node: Option<NodeHandle>) -> Self {
        node.map(Target::Node).unwrap_or(Target::Missing)
    }
}

/// Prints subtrees of a host document
#[derive(Debug, Clone)]
pub struct Printer {
    host: Document,
}

impl Printer {
    pub fn new(host: Document) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Document {
        &self.host
    }

    fn resolve(&self, target: Target) -> PrintResult<NodeHandle> {
        match target {
            Target::Node(node) => Ok(node),
            Target::Selector(selector) if selector.trim().is_empty() => {
                Err(PrintError::TargetNotFound("empty selector".to_string()))
            }
            Target::Selector(selector) => self
                .host
                .query_selector(&selector)?
                .ok_or(PrintError::TargetNotFound(selector)),
            Target::Missing => Err(PrintError::TargetNotFound("no target given".to_string())),
        }
    }

    /// Prepare an isolated print of `target`.
    ///
    /// Validation, cloning and surface creation all happen here, and any
    /// failure is returned before a surface exists. The returned job opens
    /// the print dialog once awaited; it resolves when the dialog has been
    /// invoked, which says nothing about whether anything was printed.
    pub fn print(&self, target: impl Into<Target>, options: impl Into<PrintOptions>) -> PrintResult<PrintJob> {
        let options = options.into();
        let target = self.resolve(target.into())?;
        let document = target.owner_document().ok_or(PrintError::DetachedTarget)?;

        let target = clone::printable_root(&target);
        let content = clone::clone_tree(&target, &options)?;
        let content = wrap::wrap(&target, content, &options)?;
        let surface = Surface::create(&document, content, &options)?;

        tracing::info!(node = ?target, wrap = options.wrap, debug = options.debug, "print job prepared");
        Ok(PrintJob {
            surface,
            debug: options.debug,
        })
    }
}

/// A prepared print. Await it to wait for the surface's resources, open the
/// print dialog and tear the surface down. Dropping it leaves the surface
/// where it is.
#[derive(Debug)]
#[must_use = "the print dialog only opens once the job is awaited"]
pub struct PrintJob {
    surface: Surface,
    debug: bool,
}

impl PrintJob {
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    async fn run(self) {
        ready::when_ready(self.surface.document()).await;

        tracing::debug!("opening print dialog");
        self.surface.print();

        if !self.debug {
            self.surface.remove();
        }
    }
}

impl IntoFuture for PrintJob {
    type Output = ();
    type IntoFuture = BoxFuture<'static, ()>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}
