//! The off-screen frame that hosts a print clone.

use isoprint_dom::{Document, NodeHandle};
use parking_lot::Mutex;

use crate::clone::customize;
use crate::config::{NodeHook, PrintOptions, StyleArgs};
use crate::error::{PrintError, PrintResult};

/// Class carried by every render surface frame
pub const FRAME_CLASS: &str = "print-surface__frame";

/// Keeps a non-debug frame out of sight while it still lays out
pub const HIDDEN_STYLE: &str = "position: absolute; z-index: -1; left: -9999px; top: -9999px;";

lazy_static::lazy_static! {
    /// The one debug surface kept alive for inspection
    static ref RETAINED: Mutex<Option<NodeHandle>> = Mutex::new(None);
}

/// The frame currently retained by a debug print, if any
pub fn retained_frame() -> Option<NodeHandle> {
    RETAINED.lock().clone()
}

fn retain(frame: &NodeHandle) {
    let previous = RETAINED.lock().replace(frame.clone());
    if let Some(previous) = previous {
        if previous != *frame {
            previous.detach();
            tracing::debug!("evicted previously retained debug surface");
        }
    }
}

/// An embedded frame holding the content to print
#[derive(Debug, Clone)]
pub struct Surface {
    frame: NodeHandle,
    document: Document,
}

impl Surface {
    /// Create the frame under the host body and fill it with `content`.
    /// If filling fails the frame is taken out again before returning.
    pub fn create(host: &Document, content: NodeHandle, options: &PrintOptions) -> PrintResult<Surface> {
        let host_body = host
            .body()
            .ok_or_else(|| PrintError::Unprintable("host document has no body".to_string()))?;

        let frame = host.create_element("iframe");
        frame.set_class_name(FRAME_CLASS)?;
        frame.set_style_text(if options.debug { "" } else { HIDDEN_STYLE })?;
        let viewport = host.viewport();
        frame.set_attribute("width", &viewport.width.to_string())?;
        frame.set_attribute("height", &viewport.height.to_string())?;
        host_body.append_child(&frame)?;

        let surface = match Self::populate(host, &frame, content, options) {
            Ok(document) => Surface { frame, document },
            Err(e) => {
                frame.detach();
                return Err(e);
            }
        };

        if options.debug {
            retain(&surface.frame);
        }
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            debug = options.debug,
            "render surface ready"
        );
        Ok(surface)
    }

    fn populate(
        host: &Document,
        frame: &NodeHandle,
        content: NodeHandle,
        options: &PrintOptions,
    ) -> PrintResult<Document> {
        let document = frame
            .content_document()
            .ok_or_else(|| PrintError::Unprintable("frame has no content document".to_string()))?;
        let hook = options.on_node.as_ref();

        mirror(hook, host.document_element(), document.document_element())?;
        mirror(hook, host.body(), document.body())?;

        let body = document
            .body()
            .ok_or_else(|| PrintError::Unprintable("frame document has no body".to_string()))?;
        if content.has_local_name("body") {
            for child in content.children() {
                body.append_child(&child)?;
            }
        } else {
            body.append_child(&content)?;
        }

        if let Some(head) = document.head() {
            let sheets = host.style_sheets();
            for owner in sheets.iter().rev() {
                head.append_child(&owner.clone_deep()?)?;
            }
            tracing::trace!(count = sheets.len(), "copied style resources");
        }

        Ok(document)
    }

    pub fn frame(&self) -> &NodeHandle {
        &self.frame
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_attached(&self) -> bool {
        self.frame.parent().is_some()
    }

    /// Open the print dialog on the surface document. Blocks until the
    /// dialog returns.
    pub fn print(&self) {
        self.document.print();
    }

    /// Take the frame out of the host document.
    pub fn remove(&self) {
        self.frame.detach();
        let mut retained = RETAINED.lock();
        if retained.as_ref() == Some(&self.frame) {
            *retained = None;
        }
    }
}

/// Carry a host root node's inline style and class over to its surface
/// counterpart through the hook.
fn mirror(hook: Option<&NodeHook>, source: Option<NodeHandle>, target: Option<NodeHandle>) -> PrintResult<()> {
    if let (Some(source), Some(target)) = (source, target) {
        let args = StyleArgs::new(source.style_text(), source.class_name());
        customize(hook, &source, target, args)?;
    }
    Ok(())
}
