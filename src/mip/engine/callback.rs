//! The user-callback surface of the branch-and-cut engine.
//!
//! One [`Callback`] value is shared by every worker thread. Each worker owns
//! an `Option<C::Local>` slot that the callback fills on
//! [`Where::ThreadUp`] and releases on [`Where::ThreadDown`]; the other
//! contexts hand that slot back so per-thread scratch never needs locking.

use std::sync::atomic::{AtomicBool, Ordering};

use super::model::Row;
use crate::error::Result;

/// Identifies the worker invoking a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub thread_id: usize,
    pub num_threads: usize,
}

/// How a user cut may be managed by the engine once added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purgeable {
    /// Kept for the rest of the solve.
    Force,
    /// May be dropped when the pool grows large.
    Purge,
    /// May be dropped, and is only added while it cuts off the current point.
    Filter,
}

/// A cut handed to the engine from a relaxation callback.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCut {
    pub row: Row,
    pub purgeable: Purgeable,
    /// Valid only in the subtree of the current node.
    pub local: bool,
}

/// An integral point proposed as a new incumbent.
pub struct CandidateCtx<'a> {
    point: &'a [f64],
    obj: f64,
    rejected: bool,
    lazy: Vec<Row>,
    abort: &'a AtomicBool,
}

impl<'a> CandidateCtx<'a> {
    pub(crate) fn new(point: &'a [f64], obj: f64, abort: &'a AtomicBool) -> Self {
        Self {
            point,
            obj,
            rejected: false,
            lazy: Vec::new(),
            abort,
        }
    }

    pub fn point(&self) -> &'a [f64] {
        self.point
    }

    pub fn obj(&self) -> f64 {
        self.obj
    }

    /// Rejects the candidate and adds `row` as a lazy constraint. `row`
    /// must be violated by [`point`](Self::point).
    pub fn reject(&mut self, row: Row) {
        self.rejected = true;
        self.lazy.push(row);
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Requests the engine to stop as soon as possible.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub(crate) fn into_lazy(self) -> Vec<Row> {
        self.lazy
    }
}

/// A fractional LP optimum offered for separation.
pub struct RelaxationCtx<'a> {
    point: &'a [f64],
    obj: f64,
    depth: usize,
    cuts: Vec<UserCut>,
    abort: &'a AtomicBool,
}

impl<'a> RelaxationCtx<'a> {
    pub(crate) fn new(point: &'a [f64], obj: f64, depth: usize, abort: &'a AtomicBool) -> Self {
        Self {
            point,
            obj,
            depth,
            cuts: Vec::new(),
            abort,
        }
    }

    pub fn point(&self) -> &'a [f64] {
        self.point
    }

    pub fn obj(&self) -> f64 {
        self.obj
    }

    /// Depth of the node being processed; the root is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn add_user_cut(&mut self, row: Row, purgeable: Purgeable, local: bool) {
        self.cuts.push(UserCut {
            row,
            purgeable,
            local,
        });
    }

    pub fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub(crate) fn into_cuts(self) -> Vec<UserCut> {
        self.cuts
    }
}

/// A snapshot of the global search state. At most one thread at a time
/// receives it.
pub struct ProgressCtx<'a> {
    pub(crate) best_bound: f64,
    pub(crate) incumbent: f64,
    pub(crate) nodes: usize,
    pub(crate) open_nodes: usize,
    pub(crate) lp_solves: usize,
    pub(crate) abort: &'a AtomicBool,
}

impl ProgressCtx<'_> {
    pub fn best_bound(&self) -> f64 {
        self.best_bound
    }

    /// Objective of the incumbent; `+∞` when none exists.
    pub fn incumbent(&self) -> f64 {
        self.incumbent
    }

    pub fn has_incumbent(&self) -> bool {
        self.incumbent.is_finite()
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn open_nodes(&self) -> usize {
        self.open_nodes
    }

    pub fn lp_solves(&self) -> usize {
        self.lp_solves
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}

/// The context in which a callback is invoked.
pub enum Where<'w, 'a> {
    ThreadUp,
    ThreadDown,
    Candidate(&'w mut CandidateCtx<'a>),
    Relaxation(&'w mut RelaxationCtx<'a>),
    GlobalProgress(&'w ProgressCtx<'a>),
}

/// User hooks into the branch-and-cut search.
///
/// Returning `Err` from any context stops the search with
/// [`EngineStatus::CallbackError`](super::EngineStatus::CallbackError).
pub trait Callback: Sync {
    /// Per-thread state, created on `ThreadUp` and released on `ThreadDown`.
    type Local;

    fn callback(
        &self,
        local: &mut Option<Self::Local>,
        thread: ThreadInfo,
        context: Where<'_, '_>,
    ) -> Result<()>;
}
