//! Built-in branch-and-cut engine.
//!
//! A small mixed-integer host exposing the surface a cut-and-branch
//! formulation needs: columns and rows, a MIP start, and a callback that
//! sees integral candidates (to reject them with lazy constraints) and
//! fractional relaxations (to add user cuts).
//!
//! # Algorithm
//!
//! LP-based branch and bound over the integral columns. Every node solves
//! its relaxation with `minilp`, using the model rows, the global cut pool,
//! the lazy constraints gathered so far and the node's local cuts. Then:
//!
//! 1. an integral optimum is offered to the candidate callback; rejected
//!    points add lazy rows and the node is re-solved,
//! 2. a fractional optimum is offered to the relaxation callback; violated
//!    cuts are added and the node is re-solved, up to a bounded number of
//!    rounds,
//! 3. otherwise the most fractional column is branched on.
//!
//! Worker threads share the open-node queue behind a `parking_lot` mutex
//! and each keep a callback-owned thread-local slot.
//!
//! # Reference
//!
//! Padberg, M. & Rinaldi, G. (1991). "A branch-and-cut algorithm for the
//! resolution of large-scale symmetric traveling salesman problems."
//! *SIAM Review*, 33(1), 60-100.

mod callback;
mod lp;
mod model;
mod tree;
mod worker;

pub use callback::{
    Callback, CandidateCtx, ProgressCtx, Purgeable, RelaxationCtx, ThreadInfo, UserCut, Where,
};
pub use model::{ColKind, Column, Model, Row, Sense};
pub use tree::NodeSelection;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::constants::{INTEGRALITY_TOLERANCE, MAX_NUM_CORES};
use crate::error::{Error, Result};
use worker::Shared;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Worker threads; 0 uses every available core.
    pub num_threads: usize,
    pub time_limit: Option<Duration>,
    pub seed: u64,
    /// Log search progress at `info` level.
    pub display: bool,
    /// Nodes whose bound reaches this value are pruned.
    pub upper_cutoff: Option<f64>,
    /// A known valid lower bound on the optimum.
    pub lower_cutoff: Option<f64>,
    pub node_selection: NodeSelection,
    /// Separation rounds per node before branching.
    pub max_cut_rounds: usize,
    pub integrality_tol: f64,
    /// Purgeable cuts beyond this size are dropped oldest first.
    pub cut_pool_limit: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            num_threads: 0,
            time_limit: None,
            seed: 0,
            display: false,
            upper_cutoff: None,
            lower_cutoff: None,
            node_selection: NodeSelection::BestFirst,
            max_cut_rounds: 25,
            integrality_tol: INTEGRALITY_TOLERANCE,
            cut_pool_limit: 20_000,
        }
    }
}

/// Resolves a requested thread count against the hardware, capped at
/// [`MAX_NUM_CORES`].
pub fn effective_num_threads(requested: usize) -> usize {
    let cores = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let n = if requested == 0 {
        cores
    } else {
        requested.min(cores)
    };
    n.clamp(1, MAX_NUM_CORES)
}

/// Raw termination status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Optimal,
    Infeasible,
    TimeLimitFeasible,
    TimeLimitInfeasible,
    AbortFeasible,
    AbortInfeasible,
    CallbackError,
    Unbounded,
    Numerical,
}

/// Search counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub nodes: usize,
    pub lp_solves: usize,
    pub user_cuts: usize,
    pub lazy_constraints: usize,
}

/// Result of [`MipEngine::solve`].
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub status: EngineStatus,
    /// Best proven lower bound.
    pub best_bound: f64,
    /// Incumbent objective; `+∞` without an incumbent.
    pub objective: f64,
    pub point: Option<Vec<f64>>,
    pub stats: EngineStats,
    /// Error text for `CallbackError` and `Numerical`.
    pub message: Option<String>,
}

/// A model plus parameters, ready to solve.
///
/// # Examples
///
/// ```
/// use u_cptp::error::Result;
/// use u_cptp::mip::engine::*;
///
/// struct Accept;
/// impl Callback for Accept {
///     type Local = ();
///     fn callback(&self, _: &mut Option<()>, _: ThreadInfo, _: Where<'_, '_>) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// // max x + y  s.t.  2x + 2y <= 3, binary
/// let mut model = Model::new();
/// let x = model.add_col("x", -1.0, 0.0, 1.0, ColKind::Binary);
/// let y = model.add_col("y", -1.0, 0.0, 1.0, ColKind::Binary);
/// model.add_row(Row::new(Sense::Le, 3.0).with_coef(x, 2.0).with_coef(y, 2.0));
///
/// let params = EngineParams { num_threads: 1, ..EngineParams::default() };
/// let outcome = MipEngine::new(model).with_params(params).solve(&Accept);
/// assert_eq!(outcome.status, EngineStatus::Optimal);
/// assert!((outcome.objective + 1.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct MipEngine {
    model: Model,
    params: EngineParams,
    starts: Vec<Vec<f64>>,
    abort: Arc<AtomicBool>,
}

impl MipEngine {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            params: EngineParams::default(),
            starts: Vec::new(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut EngineParams {
        &mut self.params
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Registers a full assignment to try as the first incumbent. It goes
    /// through the candidate callback like any other integral point.
    pub fn add_mip_start(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.model.num_cols() {
            return Err(Error::invalid_input(format!(
                "MIP start has {} values for {} columns",
                values.len(),
                self.model.num_cols()
            )));
        }
        self.starts.push(values);
        Ok(())
    }

    /// Flag that stops the search once set.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Runs branch and cut with `cb` attached to every worker thread.
    pub fn solve<C: Callback>(&self, cb: &C) -> EngineOutcome {
        let num_threads = effective_num_threads(self.params.num_threads);
        let shared = Shared::new(&self.model, &self.params, &self.abort, num_threads);

        thread::scope(|scope| {
            for thread_id in 0..num_threads {
                let shared = &shared;
                let starts: &[Vec<f64>] = if thread_id == 0 { &self.starts } else { &[] };
                let info = ThreadInfo {
                    thread_id,
                    num_threads,
                };
                scope.spawn(move || shared.run_worker(cb, info, starts));
            }
        });

        shared.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;

    struct Accept;

    impl Callback for Accept {
        type Local = ();
        fn callback(&self, _: &mut Option<()>, _: ThreadInfo, _: Where<'_, '_>) -> Result<()> {
            Ok(())
        }
    }

    /// Knapsack: max 5a + 4b + 3c  s.t. 2a + 3b + c <= 4.
    fn knapsack() -> Model {
        let mut m = Model::new();
        let a = m.add_col("a", -5.0, 0.0, 1.0, ColKind::Binary);
        let b = m.add_col("b", -4.0, 0.0, 1.0, ColKind::Binary);
        let c = m.add_col("c", -3.0, 0.0, 1.0, ColKind::Binary);
        m.add_row(
            Row::new(Sense::Le, 4.0)
                .with_coef(a, 2.0)
                .with_coef(b, 3.0)
                .with_coef(c, 1.0),
        );
        m
    }

    fn single_thread() -> EngineParams {
        EngineParams {
            num_threads: 1,
            ..EngineParams::default()
        }
    }

    #[test]
    fn test_knapsack_optimum() {
        let outcome = MipEngine::new(knapsack())
            .with_params(single_thread())
            .solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::Optimal);
        assert!((outcome.objective + 8.0).abs() < 1e-6);
        assert!((outcome.best_bound + 8.0).abs() < 1e-6);
        assert_eq!(outcome.point, Some(vec![1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_knapsack_multithreaded() {
        let params = EngineParams {
            num_threads: 4,
            ..EngineParams::default()
        };
        let outcome = MipEngine::new(knapsack()).with_params(params).solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::Optimal);
        assert!((outcome.objective + 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_model() {
        let mut m = Model::new();
        let x = m.add_col("x", 1.0, 0.0, 1.0, ColKind::Binary);
        m.add_row(Row::new(Sense::Ge, 0.4).with_coef(x, 1.0));
        m.add_row(Row::new(Sense::Le, 0.6).with_coef(x, 1.0));
        let outcome = MipEngine::new(m).with_params(single_thread()).solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::Infeasible);
        assert!(outcome.point.is_none());
    }

    #[test]
    fn test_integer_column_branching() {
        // min -x  s.t. 2x <= 3, x in {0,1,2}
        let mut m = Model::new();
        let x = m.add_col("x", -1.0, 0.0, 2.0, ColKind::Integer);
        m.add_row(Row::new(Sense::Le, 3.0).with_coef(x, 2.0));
        let outcome = MipEngine::new(m).with_params(single_thread()).solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::Optimal);
        assert_eq!(outcome.point, Some(vec![1.0]));
    }

    /// Rejects every candidate with `a + c >= 2` until the point has `b = 1`.
    struct RejectWithoutB;

    impl Callback for RejectWithoutB {
        type Local = usize;
        fn callback(&self, local: &mut Option<usize>, _: ThreadInfo, w: Where<'_, '_>) -> Result<()> {
            match w {
                Where::ThreadUp => *local = Some(0),
                Where::Candidate(ctx) => {
                    if ctx.point()[1] < 0.5 {
                        ctx.reject(Row::new(Sense::Ge, 1.0).with_coef(1, 1.0));
                        if let Some(n) = local.as_mut() {
                            *n += 1;
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_lazy_constraints() {
        let outcome = MipEngine::new(knapsack())
            .with_params(single_thread())
            .solve(&RejectWithoutB);
        assert_eq!(outcome.status, EngineStatus::Optimal);
        // b forced: best is b + c = 7
        assert!((outcome.objective + 7.0).abs() < 1e-6);
        assert_eq!(outcome.stats.lazy_constraints, 1);
    }

    struct BadReject;

    impl Callback for BadReject {
        type Local = ();
        fn callback(&self, _: &mut Option<()>, _: ThreadInfo, w: Where<'_, '_>) -> Result<()> {
            if let Where::Candidate(ctx) = w {
                // satisfied by every point
                ctx.reject(Row::new(Sense::Ge, -1.0).with_coef(0, 1.0));
            }
            Ok(())
        }
    }

    #[test]
    fn test_reject_without_violated_row_is_error() {
        let outcome = MipEngine::new(knapsack())
            .with_params(single_thread())
            .solve(&BadReject);
        assert_eq!(outcome.status, EngineStatus::CallbackError);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn test_pre_aborted() {
        let engine = MipEngine::new(knapsack()).with_params(single_thread());
        engine.abort_handle().store(true, Ordering::Relaxed);
        let outcome = engine.solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::AbortInfeasible);
    }

    #[test]
    fn test_mip_start_and_abort() {
        struct AbortOnFirst;
        impl Callback for AbortOnFirst {
            type Local = ();
            fn callback(&self, _: &mut Option<()>, _: ThreadInfo, w: Where<'_, '_>) -> Result<()> {
                if let Where::Candidate(ctx) = w {
                    ctx.abort();
                }
                Ok(())
            }
        }
        let mut engine = MipEngine::new(knapsack()).with_params(single_thread());
        engine.add_mip_start(vec![0.0, 1.0, 0.0]).expect("sized");
        assert!(engine.add_mip_start(vec![0.0]).is_err());
        let outcome = engine.solve(&AbortOnFirst);
        assert_eq!(outcome.status, EngineStatus::AbortFeasible);
        assert!((outcome.objective + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_upper_cutoff_prunes_everything() {
        let params = EngineParams {
            num_threads: 1,
            upper_cutoff: Some(-100.0),
            ..EngineParams::default()
        };
        let outcome = MipEngine::new(knapsack()).with_params(params).solve(&Accept);
        assert_eq!(outcome.status, EngineStatus::Infeasible);
    }

    #[test]
    fn test_progress_is_monotone() {
        struct Record(Mutex<Vec<(f64, f64)>>);
        impl Callback for Record {
            type Local = ();
            fn callback(&self, _: &mut Option<()>, _: ThreadInfo, w: Where<'_, '_>) -> Result<()> {
                if let Where::GlobalProgress(ctx) = w {
                    self.0.lock().push((ctx.best_bound(), ctx.incumbent()));
                }
                Ok(())
            }
        }
        let rec = Record(Mutex::new(Vec::new()));
        let params = EngineParams {
            num_threads: 2,
            ..EngineParams::default()
        };
        let outcome = MipEngine::new(knapsack()).with_params(params).solve(&rec);
        assert_eq!(outcome.status, EngineStatus::Optimal);
        let seen = rec.0.into_inner();
        assert!(!seen.is_empty());
        for w in seen.windows(2) {
            assert!(w[1].0 >= w[0].0);
            assert!(w[1].1 <= w[0].1);
        }
    }

    #[test]
    fn test_effective_threads() {
        assert!(effective_num_threads(0) >= 1);
        assert_eq!(effective_num_threads(1), 1);
        assert!(effective_num_threads(100_000) <= MAX_NUM_CORES);
    }
}
