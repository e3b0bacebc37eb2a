//! Load/error notification for resource-bearing elements and font sets.
//!
//! A [`LoadSignal`] stands in for the `load`/`error` events a browser fires
//! on images and style resources, and for `document.fonts.ready`. Waiters
//! subscribe at any time; a signal that already left [`LoadState::Pending`]
//! resolves immediately, so a late subscriber never misses the event.

use std::sync::Arc;
use tokio::sync::watch;

/// Loading state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Still fetching
    Pending,
    /// Fired `load`
    Loaded,
    /// Fired `error`
    Failed,
}

impl LoadState {
    pub fn is_settled(self) -> bool {
        !matches!(self, LoadState::Pending)
    }

    /// Initial state of a resource reference: `data:` URLs are available
    /// immediately, an absent reference errors straight away.
    pub fn for_reference(reference: Option<&str>) -> Self {
        match reference.map(str::trim) {
            None | Some("") => LoadState::Failed,
            Some(url) if url.starts_with("data:") => LoadState::Loaded,
            Some(_) => LoadState::Pending,
        }
    }
}

/// Broadcast of a resource's [`LoadState`].
#[derive(Debug, Clone)]
pub struct LoadSignal {
    tx: Arc<watch::Sender<LoadState>>,
}

impl LoadSignal {
    pub fn new(state: LoadState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> LoadState {
        *self.tx.borrow()
    }

    /// Move to `state`, waking every waiter.
    pub fn set(&self, state: LoadState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::trace!(?previous, ?state, "resource state changed");
        }
    }

    /// Resolves once the state is no longer pending.
    pub async fn settled(&self) -> LoadState {
        let mut rx = self.tx.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_settled() {
                return state;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

impl Default for LoadSignal {
    fn default() -> Self {
        Self::new(LoadState::Loaded)
    }
}
