//! Shared search state and the per-thread node loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::callback::{
    Callback, CandidateCtx, ProgressCtx, Purgeable, RelaxationCtx, ThreadInfo, UserCut, Where,
};
use super::lp::{solve_relaxation, LpOutcome};
use super::model::{Model, Row};
use super::tree::{Node, NodeQueue};
use super::{EngineOutcome, EngineParams, EngineStats, EngineStatus};
use crate::constants::COST_TOLERANCE;

/// Cuts and lazy rows must be violated by at least this much to count.
const MIN_VIOLATION: f64 = 1e-6;

/// Idle workers re-check limits at this interval.
const IDLE_WAIT: Duration = Duration::from_millis(20);

/// Progress is reported at least this often when nothing else changes.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
enum StopReason {
    TimeLimit,
    Abort,
    Callback(String),
    Unbounded,
    Numerical(String),
}

#[derive(Debug)]
struct PoolCut {
    row: Row,
    purgeable: Purgeable,
}

enum NodeResult {
    Pruned,
    Branched(Vec<Node>),
    Interrupted(Node),
}

#[derive(Debug)]
struct SearchState {
    queue: NodeQueue,
    /// `(id, bound)` of nodes currently being processed.
    active: Vec<(u64, f64)>,
    next_id: u64,
    incumbent: Option<(f64, Vec<f64>)>,
    pool: Vec<Arc<PoolCut>>,
    lazy: Vec<Arc<Row>>,
    stats: EngineStats,
    stop: Option<StopReason>,
    finished: bool,
}

impl SearchState {
    fn incumbent_obj(&self) -> f64 {
        self.incumbent
            .as_ref()
            .map_or(f64::INFINITY, |(obj, _)| *obj)
    }
}

#[derive(Debug)]
struct ProgressMark {
    bound: f64,
    incumbent: f64,
    nodes: usize,
    at: Option<Instant>,
}

/// State shared by every worker of one solve.
pub(crate) struct Shared<'s> {
    model: &'s Model,
    params: &'s EngineParams,
    abort: &'s AtomicBool,
    num_threads: usize,
    started: Instant,
    state: Mutex<SearchState>,
    wake: Condvar,
    progress: Mutex<ProgressMark>,
}

impl<'s> Shared<'s> {
    pub fn new(
        model: &'s Model,
        params: &'s EngineParams,
        abort: &'s AtomicBool,
        num_threads: usize,
    ) -> Self {
        let mut queue = NodeQueue::new(params.node_selection);
        queue.push(Node::root());
        Self {
            model,
            params,
            abort,
            num_threads,
            started: Instant::now(),
            state: Mutex::new(SearchState {
                queue,
                active: Vec::new(),
                next_id: 1,
                incumbent: None,
                pool: Vec::new(),
                lazy: Vec::new(),
                stats: EngineStats::default(),
                stop: None,
                finished: false,
            }),
            wake: Condvar::new(),
            progress: Mutex::new(ProgressMark {
                bound: f64::NEG_INFINITY,
                incumbent: f64::INFINITY,
                nodes: 0,
                at: None,
            }),
        }
    }

    /// Worker entry point.
    pub fn run_worker<C: Callback>(&self, cb: &C, thread: ThreadInfo, starts: &[Vec<f64>]) {
        let mut local: Option<C::Local> = None;
        let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(thread.thread_id as u64));

        match cb.callback(&mut local, thread, Where::ThreadUp) {
            Ok(()) => {
                if let Err(reason) = self.search(cb, &mut local, thread, &mut rng, starts) {
                    self.stop_with(reason);
                }
            }
            Err(e) => self.stop_with(StopReason::Callback(e.to_string())),
        }

        if let Err(e) = cb.callback(&mut local, thread, Where::ThreadDown) {
            self.stop_with(StopReason::Callback(e.to_string()));
        }
    }

    fn search<C: Callback>(
        &self,
        cb: &C,
        local: &mut Option<C::Local>,
        thread: ThreadInfo,
        rng: &mut StdRng,
        starts: &[Vec<f64>],
    ) -> Result<(), StopReason> {
        for start in starts {
            self.try_mip_start(cb, local, thread, start)?;
        }

        while let Some(node) = self.next_node() {
            let id = node.id;
            let result = self.process_node(cb, local, thread, rng, node);
            match result {
                Ok(result) => self.finish_node(id, result),
                Err(reason) => {
                    self.finish_node(id, NodeResult::Pruned);
                    return Err(reason);
                }
            }
            self.report_progress(cb, local, thread)?;
        }
        Ok(())
    }

    fn try_mip_start<C: Callback>(
        &self,
        cb: &C,
        local: &mut Option<C::Local>,
        thread: ThreadInfo,
        start: &[f64],
    ) -> Result<(), StopReason> {
        let integral = self.round_if_integral(start);
        let Some(point) = integral.filter(|p| self.model.is_feasible(p, MIN_VIOLATION)) else {
            warn!("discarding infeasible MIP start");
            return Ok(());
        };
        let obj = self.model.objective(&point);
        let mut ctx = CandidateCtx::new(&point, obj, self.abort);
        cb.callback(local, thread, Where::Candidate(&mut ctx))
            .map_err(|e| StopReason::Callback(e.to_string()))?;
        if ctx.is_rejected() {
            debug!("MIP start rejected by the candidate callback");
            let rows = ctx.into_lazy();
            self.add_lazy(rows.into_iter().filter(|r| r.violation(&point) > MIN_VIOLATION));
            return Ok(());
        }
        self.offer_incumbent(obj, point);
        Ok(())
    }

    fn process_node<C: Callback>(
        &self,
        cb: &C,
        local: &mut Option<C::Local>,
        thread: ThreadInfo,
        rng: &mut StdRng,
        mut node: Node,
    ) -> Result<NodeResult, StopReason> {
        let mut bounds: Vec<(f64, f64)> =
            self.model.cols().iter().map(|c| (c.lb, c.ub)).collect();
        for &(col, lb, ub) in &node.branchings {
            let b = &mut bounds[col];
            *b = (b.0.max(lb), b.1.min(ub));
        }

        let mut rounds = 0;
        loop {
            if self.limits_reached() {
                return Ok(NodeResult::Interrupted(node));
            }

            let (pool, lazy) = self.snapshot_rows();
            let rows = pool
                .iter()
                .map(|c| &c.row)
                .chain(lazy.iter().map(|r| r.as_ref()))
                .chain(node.local_cuts.iter());
            let outcome = solve_relaxation(self.model, &bounds, rows)
                .map_err(|e| StopReason::Numerical(e.to_string()))?;
            self.state.lock().stats.lp_solves += 1;

            let (obj, point) = match outcome {
                LpOutcome::Infeasible => return Ok(NodeResult::Pruned),
                LpOutcome::Unbounded => return Err(StopReason::Unbounded),
                LpOutcome::Optimal { obj, point } => (obj, point),
            };

            node.bound = node.bound.max(obj);
            if node.bound >= self.update_active(node.id, node.bound) {
                return Ok(NodeResult::Pruned);
            }

            if let Some(rounded) = self.round_if_integral(&point) {
                let cand_obj = self.model.objective(&rounded);
                let mut ctx = CandidateCtx::new(&rounded, cand_obj, self.abort);
                cb.callback(local, thread, Where::Candidate(&mut ctx))
                    .map_err(|e| StopReason::Callback(e.to_string()))?;
                if !ctx.is_rejected() {
                    self.offer_incumbent(cand_obj, rounded);
                    return Ok(NodeResult::Pruned);
                }
                let violated: Vec<Row> = ctx
                    .into_lazy()
                    .into_iter()
                    .filter(|r| r.violation(&rounded) > MIN_VIOLATION)
                    .collect();
                if violated.is_empty() {
                    return Err(StopReason::Callback(
                        "candidate rejected without a violated lazy constraint".to_string(),
                    ));
                }
                self.add_lazy(violated);
                continue;
            }

            if rounds < self.params.max_cut_rounds {
                let mut ctx = RelaxationCtx::new(&point, obj, node.depth, self.abort);
                cb.callback(local, thread, Where::Relaxation(&mut ctx))
                    .map_err(|e| StopReason::Callback(e.to_string()))?;
                let mut separated = false;
                let mut global = Vec::new();
                for cut in ctx.into_cuts() {
                    let violated = cut.row.violation(&point) > MIN_VIOLATION;
                    if !violated && cut.purgeable != Purgeable::Force {
                        continue;
                    }
                    separated |= violated;
                    if cut.local {
                        node.local_cuts.push(cut.row);
                    } else {
                        global.push(cut);
                    }
                }
                self.add_cuts(global);
                if separated {
                    rounds += 1;
                    continue;
                }
            }

            return Ok(NodeResult::Branched(self.branch(&node, &point, &bounds, rng)));
        }
    }

    /// Returns `point` with integral columns rounded, or `None` if one of
    /// them is fractional.
    fn round_if_integral(&self, point: &[f64]) -> Option<Vec<f64>> {
        let tol = self.params.integrality_tol;
        let mut rounded = point.to_vec();
        for (v, col) in rounded.iter_mut().zip(self.model.cols()) {
            if col.kind.is_integral() {
                let r = v.round();
                if (*v - r).abs() > tol {
                    return None;
                }
                *v = r;
            }
        }
        Some(rounded)
    }

    /// Splits on the most fractional integral column.
    fn branch(
        &self,
        node: &Node,
        point: &[f64],
        bounds: &[(f64, f64)],
        rng: &mut StdRng,
    ) -> Vec<Node> {
        let tol = self.params.integrality_tol;
        let mut best: Option<(f64, u32, usize)> = None;
        for (col, (v, c)) in point.iter().zip(self.model.cols()).enumerate() {
            if !c.kind.is_integral() {
                continue;
            }
            let frac = v - v.floor();
            let score = frac.min(1.0 - frac);
            if score <= tol {
                continue;
            }
            let key = (score, rng.random::<u32>(), col);
            if best.map_or(true, |b| (key.0, key.1) > (b.0, b.1)) {
                best = Some(key);
            }
        }

        let Some((_, _, col)) = best else {
            return Vec::new();
        };
        let v = point[col];
        let (lb, ub) = bounds[col];
        let (down, up) = {
            let mut st = self.state.lock();
            st.next_id += 2;
            (st.next_id - 2, st.next_id - 1)
        };
        vec![
            node.child(down, node.bound, col, lb, v.floor()),
            node.child(up, node.bound, col, v.ceil(), ub),
        ]
    }

    fn cutoff(&self, st: &SearchState) -> f64 {
        let mut cutoff = st.incumbent_obj() - COST_TOLERANCE;
        if let Some(upper) = self.params.upper_cutoff {
            cutoff = cutoff.min(upper);
        }
        cutoff
    }

    fn global_bound(&self, st: &SearchState) -> f64 {
        let inc = st.incumbent_obj();
        let mut bound = st
            .active
            .iter()
            .map(|&(_, b)| b)
            .fold(st.queue.min_bound(), f64::min);
        if bound == f64::INFINITY {
            bound = inc;
        }
        if let Some(lower) = self.params.lower_cutoff {
            bound = bound.max(lower);
        }
        bound.min(inc)
    }

    /// Sets the stop reason when the abort flag or the time limit fired.
    fn check_limits(&self, st: &mut SearchState) -> bool {
        if st.stop.is_none() {
            if self.abort.load(Ordering::Relaxed) {
                st.stop = Some(StopReason::Abort);
            } else if self
                .params
                .time_limit
                .is_some_and(|limit| self.started.elapsed() >= limit)
            {
                st.stop = Some(StopReason::TimeLimit);
            }
            if st.stop.is_some() {
                self.wake.notify_all();
            }
        }
        st.stop.is_some()
    }

    fn limits_reached(&self) -> bool {
        let mut st = self.state.lock();
        self.check_limits(&mut st)
    }

    fn stop_with(&self, reason: StopReason) {
        let mut st = self.state.lock();
        if st.stop.is_none() {
            debug!("search stopped: {reason:?}");
            st.stop = Some(reason);
        }
        self.wake.notify_all();
    }

    fn next_node(&self) -> Option<Node> {
        let mut st = self.state.lock();
        loop {
            if st.finished || self.check_limits(&mut st) {
                return None;
            }
            if st.queue.is_empty() && st.active.is_empty() {
                st.finished = true;
                self.wake.notify_all();
                return None;
            }
            if let Some(node) = st.queue.pop() {
                if node.bound >= self.cutoff(&st) {
                    continue;
                }
                st.active.push((node.id, node.bound));
                return Some(node);
            }
            self.wake.wait_for(&mut st, IDLE_WAIT);
        }
    }

    /// Records the bound of an active node and returns the current cutoff.
    fn update_active(&self, id: u64, bound: f64) -> f64 {
        let mut st = self.state.lock();
        if let Some(entry) = st.active.iter_mut().find(|(n, _)| *n == id) {
            entry.1 = bound;
        }
        self.cutoff(&st)
    }

    fn finish_node(&self, id: u64, result: NodeResult) {
        let mut st = self.state.lock();
        st.active.retain(|(n, _)| *n != id);
        match result {
            NodeResult::Pruned => st.stats.nodes += 1,
            NodeResult::Branched(children) => {
                st.stats.nodes += 1;
                let cutoff = self.cutoff(&st);
                for child in children.into_iter().filter(|c| c.bound < cutoff) {
                    st.queue.push(child);
                }
            }
            NodeResult::Interrupted(node) => st.queue.push(node),
        }
        self.wake.notify_all();
    }

    fn offer_incumbent(&self, obj: f64, point: Vec<f64>) {
        let mut st = self.state.lock();
        if obj >= st.incumbent_obj() {
            return;
        }
        debug!("new incumbent {obj:.6}");
        st.incumbent = Some((obj, point));
        let cutoff = self.cutoff(&st);
        st.queue.prune(cutoff);
        if self
            .params
            .lower_cutoff
            .is_some_and(|lower| obj <= lower + COST_TOLERANCE)
        {
            st.finished = true;
        }
        self.wake.notify_all();
    }

    fn snapshot_rows(&self) -> (Vec<Arc<PoolCut>>, Vec<Arc<Row>>) {
        let st = self.state.lock();
        (st.pool.clone(), st.lazy.clone())
    }

    fn add_lazy(&self, rows: impl IntoIterator<Item = Row>) {
        let mut st = self.state.lock();
        for row in rows {
            if st.lazy.iter().any(|r| **r == row) {
                continue;
            }
            st.lazy.push(Arc::new(row));
            st.stats.lazy_constraints += 1;
        }
    }

    fn add_cuts(&self, cuts: Vec<UserCut>) {
        if cuts.is_empty() {
            return;
        }
        let mut st = self.state.lock();
        for cut in cuts {
            if st.pool.iter().any(|c| c.row == cut.row) {
                continue;
            }
            st.pool.push(Arc::new(PoolCut {
                row: cut.row,
                purgeable: cut.purgeable,
            }));
            st.stats.user_cuts += 1;
        }

        let limit = self.params.cut_pool_limit;
        if st.pool.len() > limit {
            let mut excess = st.pool.len() - limit;
            st.pool.retain(|c| {
                if excess > 0 && c.purgeable != Purgeable::Force {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
        }
    }

    fn report_progress<C: Callback>(
        &self,
        cb: &C,
        local: &mut Option<C::Local>,
        thread: ThreadInfo,
    ) -> Result<(), StopReason> {
        let Some(mut mark) = self.progress.try_lock() else {
            return Ok(());
        };

        let (bound, incumbent, nodes, open, lp_solves) = {
            let st = self.state.lock();
            (
                self.global_bound(&st),
                st.incumbent_obj(),
                st.stats.nodes,
                st.queue.len() + st.active.len(),
                st.stats.lp_solves,
            )
        };
        let bound = bound.max(mark.bound);

        let changed = bound > mark.bound || incumbent < mark.incumbent;
        let stale = mark.at.map_or(true, |at| at.elapsed() >= PROGRESS_INTERVAL);
        if !changed && !stale && nodes < mark.nodes + 100 {
            return Ok(());
        }

        if self.params.display {
            info!(
                "[engine] {nodes} nodes, {open} open, {lp_solves} LPs, bound {bound:.4}, incumbent {incumbent:.4}, {} threads",
                self.num_threads
            );
        }

        let ctx = ProgressCtx {
            best_bound: bound,
            incumbent,
            nodes,
            open_nodes: open,
            lp_solves,
            abort: self.abort,
        };
        *mark = ProgressMark {
            bound,
            incumbent,
            nodes,
            at: Some(Instant::now()),
        };
        cb.callback(local, thread, Where::GlobalProgress(&ctx))
            .map_err(|e| StopReason::Callback(e.to_string()))
    }

    pub fn outcome(&self) -> EngineOutcome {
        let mut st = self.state.lock();
        let has_incumbent = st.incumbent.is_some();
        let (status, message) = match &st.stop {
            None if has_incumbent => (EngineStatus::Optimal, None),
            None => (EngineStatus::Infeasible, None),
            Some(StopReason::TimeLimit) if has_incumbent => (EngineStatus::TimeLimitFeasible, None),
            Some(StopReason::TimeLimit) => (EngineStatus::TimeLimitInfeasible, None),
            Some(StopReason::Abort) if has_incumbent => (EngineStatus::AbortFeasible, None),
            Some(StopReason::Abort) => (EngineStatus::AbortInfeasible, None),
            Some(StopReason::Callback(msg)) => (EngineStatus::CallbackError, Some(msg.clone())),
            Some(StopReason::Unbounded) => (EngineStatus::Unbounded, None),
            Some(StopReason::Numerical(msg)) => (EngineStatus::Numerical, Some(msg.clone())),
        };

        let best_bound = match status {
            EngineStatus::Optimal => st.incumbent_obj(),
            EngineStatus::Infeasible => f64::INFINITY,
            _ => self.global_bound(&st),
        };

        let (objective, point) = match st.incumbent.take() {
            Some((obj, point)) => (obj, Some(point)),
            None => (f64::INFINITY, None),
        };

        EngineOutcome {
            status,
            best_bound,
            objective,
            point,
            stats: st.stats,
            message,
        }
    }
}
