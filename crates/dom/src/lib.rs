//! Host document model for isoprint
//!
//! A small, thread-safe stand-in for the parts of a browser DOM that
//! isolated printing touches: a node tree with identity-based handles,
//! documents with nested frames, selector queries, resolved styles,
//! canvas snapshots and the load signals of images and style sheets.

pub mod canvas;
pub mod document;
pub mod error;
pub mod html;
pub mod node;
pub mod resource;
pub mod selector;
pub mod style;

/// Re-export common types
pub use canvas::Canvas;
pub use document::{Document, LoggingDialog, PrintDialog, Viewport};
pub use error::{DomError, DomResult};
pub use node::{Attribute, Element, Node, NodeData, NodeHandle, NodeKind};
pub use resource::{LoadSignal, LoadState};
pub use selector::SelectorList;
pub use style::{computed_style, ComputedStyle, StyleDeclarations, StyleResolver, Stylesheet};
