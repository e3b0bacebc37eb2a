//! Waiting for a render surface's resources before printing.

use std::time::Duration;

use futures::future::join_all;
use isoprint_dom::{Document, LoadState, NodeHandle};

/// Extra time given to late reflow once every resource has settled
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

fn style_resources(document: &Document) -> Vec<NodeHandle> {
    document
        .node()
        .descendants()
        .into_iter()
        .filter(|n| n.has_local_name("link") || n.has_local_name("style"))
        .collect()
}

fn failures(states: &[LoadState]) -> usize {
    states.iter().filter(|s| **s == LoadState::Failed).count()
}

/// Resolves once every image and style resource in `document` has loaded or
/// failed and its fonts are ready, plus [`SETTLE_DELAY`]. A failed resource
/// counts as ready.
pub async fn when_ready(document: &Document) {
    let images = document.images();
    let styles = style_resources(document);

    let (image_states, style_states, fonts) = futures::join!(
        join_all(images.iter().map(|image| image.loaded())),
        join_all(styles.iter().map(|style| style.loaded())),
        document.fonts().settled(),
    );

    let failed = failures(&image_states) + failures(&style_states);
    if failed > 0 {
        tracing::warn!(failed, "some surface resources failed to load");
    }
    tracing::debug!(
        images = image_states.len(),
        styles = style_states.len(),
        ?fonts,
        "surface resources settled"
    );

    tokio::time::sleep(SETTLE_DELAY).await;
}
