//! Iterative pre-order tree traversal.
//!
//! The walker keeps its own explicit stacks instead of recursing, so trees
//! of any depth are safe to traverse. It never writes to the nodes it
//! visits: all bookkeeping (pending work, ancestor frames, sibling
//! counters) lives in locals that are dropped when the walk returns, on
//! success, on `Stop`, and on an error from the visitor alike.

use std::convert::Infallible;

/// What the walker should do after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    /// Visit the node's children next
    #[default]
    Descend,
    /// Do not visit any of the node's descendants
    Skip,
    /// Abort the whole walk; no further callbacks
    Stop,
}

/// How a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    Stopped,
}

/// One level of the ancestor stack. The bottom frame is a sentinel without
/// a node, so the top-level roots still have a frame to count against.
#[derive(Debug)]
struct Frame<N> {
    node: Option<N>,
    visited: usize,
}

/// Position of the node being visited
#[derive(Debug)]
pub struct VisitContext<'a, N> {
    index: usize,
    frames: &'a [Frame<N>],
}

impl<'a, N> VisitContext<'a, N> {
    /// Global visitation index, starting at zero
    pub fn index(&self) -> usize {
        self.index
    }

    /// The nearest visited ancestor, `None` for the walk's roots
    pub fn parent(&self) -> Option<&'a N> {
        self.frames.last().and_then(|frame| frame.node.as_ref())
    }

    /// Position of the node among the siblings visited before it
    pub fn sibling_index(&self) -> usize {
        self.frames.last().map(|frame| frame.visited).unwrap_or(0)
    }

    /// Number of visited ancestors
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Visited ancestors, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = &'a N> + 'a {
        self.frames.iter().rev().filter_map(|frame| frame.node.as_ref())
    }
}

enum Pending<N> {
    Visit(N),
    /// Pops the frame pushed when the node's children were scheduled
    Leave,
}

/// Walk `roots` and their descendants depth-first in pre-order.
///
/// `children` lists a node's children in order; `visit` is called once per
/// node and decides whether to descend. An error from `visit` ends the walk
/// and is returned as-is.
pub fn try_walk<N, E, C, V>(
    roots: impl IntoIterator<Item = N>,
    mut children: C,
    mut visit: V,
) -> Result<WalkOutcome, E>
where
    C: FnMut(&N) -> Vec<N>,
    V: FnMut(&N, &VisitContext<'_, N>) -> Result<Signal, E>,
{
    let roots: Vec<N> = roots.into_iter().collect();
    let mut pending: Vec<Pending<N>> = roots.into_iter().rev().map(Pending::Visit).collect();
    let mut frames = vec![Frame { node: None, visited: 0 }];
    let mut index = 0;

    while let Some(item) = pending.pop() {
        let node = match item {
            Pending::Visit(node) => node,
            Pending::Leave => {
                frames.pop();
                continue;
            }
        };

        let signal = visit(&node, &VisitContext { index, frames: &frames })?;
        index += 1;
        if let Some(frame) = frames.last_mut() {
            frame.visited += 1;
        }

        match signal {
            Signal::Stop => return Ok(WalkOutcome::Stopped),
            Signal::Skip => {}
            Signal::Descend => {
                let kids = children(&node);
                if !kids.is_empty() {
                    pending.push(Pending::Leave);
                    pending.extend(kids.into_iter().rev().map(Pending::Visit));
                    frames.push(Frame {
                        node: Some(node),
                        visited: 0,
                    });
                }
            }
        }
    }

    Ok(WalkOutcome::Completed)
}

/// [`try_walk`] for visitors that cannot fail
pub fn walk<N, C, V>(roots: impl IntoIterator<Item = N>, children: C, mut visit: V) -> WalkOutcome
where
    C: FnMut(&N) -> Vec<N>,
    V: FnMut(&N, &VisitContext<'_, N>) -> Signal,
{
    match try_walk(roots, children, |node, ctx| Ok::<_, Infallible>(visit(node, ctx))) {
        Ok(outcome) => outcome,
        Err(never) => match never {},
    }
}
