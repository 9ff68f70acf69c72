//! Callback dispatch between the branch-and-cut engine and the separators.
//!
//! Every worker thread owns a [`ThreadScratch`]: the support graph of the
//! current fractional point, max-flow scratch, a tour buffer for decoding
//! candidates, and one [`CutSeparator`] per enabled family with its
//! statistics. Scratch is created on thread-up and merged into the shared
//! totals on thread-down.
//!
//! # Fractional separation
//!
//! The support graph has capacity `max(0, v*(i,j))` on both arcs of every
//! edge. One Gomory–Hu tree is built per relaxation; for every customer with
//! a positive visit value, the minimum depot/customer cut is read off the
//! tree and handed to every family once (identical cuts are deduplicated).

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info, trace};
use parking_lot::Mutex;

use super::cuts::{CutFamily, CutSeparator, CutStats, SepStats};
use super::decoder::decode_tour;
use super::engine::{
    Callback, CandidateCtx, ProgressCtx, RelaxationCtx, ThreadInfo, Where,
};
use super::formulation::{x_var, y_var};
use crate::constants::{COST_TOLERANCE, SUPPORT_GRAPH_ZERO};
use crate::error::{Error, Result};
use crate::evaluation::tour_load;
use crate::models::{relgap, Instance, Tour};
use crate::network::{Color, FlowNetwork, GomoryHuTree, MaxFlowResult, PushRelabel};
use crate::signals::CancellationToken;

/// Which families separate on which path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeparationSettings {
    /// Families rejecting integral candidates.
    pub integral: Vec<CutFamily>,
    /// Families adding user cuts at fractional points. A family listed here
    /// but not in `integral` is ignored.
    pub fractional: Vec<CutFamily>,
    /// Stop the search at the first accepted tour of negative cost.
    pub pricer_mode: bool,
}

impl SeparationSettings {
    /// Every family on both paths.
    pub fn all() -> Self {
        Self {
            integral: CutFamily::ALL.to_vec(),
            fractional: CutFamily::ALL.to_vec(),
            pricer_mode: false,
        }
    }
}

struct FamilySlot {
    separator: CutSeparator,
    fractional: bool,
    stats: CutStats,
}

/// Per-thread state of [`CptpCallback`].
pub struct ThreadScratch {
    support: FlowNetwork<f64>,
    solver: PushRelabel<f64>,
    tour: Tour,
    families: Vec<FamilySlot>,
}

impl ThreadScratch {
    fn new(instance: &Instance, settings: &SeparationSettings) -> Self {
        let n = instance.num_nodes();
        let families = settings
            .integral
            .iter()
            .map(|&family| FamilySlot {
                separator: CutSeparator::activate(family, instance),
                fractional: settings.fractional.contains(&family),
                stats: CutStats::default(),
            })
            .collect();
        Self {
            support: FlowNetwork::new(n),
            solver: PushRelabel::new(n),
            tour: Tour::new(n),
            families,
        }
    }
}

/// The callback installed by [`MipSolver`](super::MipSolver).
pub struct CptpCallback<'a> {
    instance: &'a Instance,
    settings: &'a SeparationSettings,
    token: &'a CancellationToken,
    totals: Mutex<Vec<(CutFamily, CutStats)>>,
}

impl<'a> CptpCallback<'a> {
    pub fn new(
        instance: &'a Instance,
        settings: &'a SeparationSettings,
        token: &'a CancellationToken,
    ) -> Self {
        let totals = settings
            .integral
            .iter()
            .map(|&family| (family, CutStats::default()))
            .collect();
        Self {
            instance,
            settings,
            token,
            totals: Mutex::new(totals),
        }
    }

    /// Statistics summed over every thread that has shut down.
    pub fn cut_stats(&self) -> Vec<(CutFamily, CutStats)> {
        self.totals.lock().clone()
    }

    fn on_candidate(&self, scratch: &mut ThreadScratch, ctx: &mut CandidateCtx<'_>) -> Result<()> {
        let n = self.instance.num_nodes();
        let vstar = ctx.point();
        decode_tour(n, vstar, &mut scratch.tour);

        if scratch.tour.num_comps() >= 2 {
            let mut added = 0;
            for slot in &mut scratch.families {
                let start = Instant::now();
                let mut stats = SepStats::default();
                added += slot
                    .separator
                    .integral_sep(self.instance, vstar, &scratch.tour, ctx, &mut stats);
                stats.accum_usecs = start.elapsed().as_micros() as u64;
                slot.stats.integral.merge(&stats);
            }
            debug!(
                "candidate :: {} components, {added} lazy constraints",
                scratch.tour.num_comps()
            );
            if added == 0 {
                return Err(Error::callback(format!(
                    "candidate with {} components was not cut off by any enabled family",
                    scratch.tour.num_comps()
                )));
            }
            return Ok(());
        }

        debug_assert!(
            tour_load(self.instance, &scratch.tour) <= self.instance.vehicle_cap() + COST_TOLERANCE
        );
        debug!("candidate :: accepted tour of cost {:.4}", ctx.obj());
        if self.settings.pricer_mode && ctx.obj() < -COST_TOLERANCE {
            info!(
                "pricer mode :: negative reduced cost tour found ({:.4}), stopping",
                ctx.obj()
            );
            ctx.abort();
        }
        Ok(())
    }

    fn on_relaxation(
        &self,
        scratch: &mut ThreadScratch,
        ctx: &mut RelaxationCtx<'_>,
    ) -> Result<()> {
        if !scratch.families.iter().any(|slot| slot.fractional) {
            return Ok(());
        }
        let n = self.instance.num_nodes();
        let vstar = ctx.point();

        fill_support_graph(&mut scratch.support, vstar)?;
        let tree = GomoryHuTree::build_with(&scratch.support, &mut scratch.solver);

        let mut seen: HashSet<Vec<Color>> = HashSet::new();
        let cuts: Vec<MaxFlowResult<f64>> = (1..n)
            .filter(|&i| vstar[y_var(n, i)] > SUPPORT_GRAPH_ZERO)
            .map(|i| tree.query(0, i))
            .filter(|mf| seen.insert(mf.colors.clone()))
            .collect();

        for slot in scratch.families.iter_mut().filter(|slot| slot.fractional) {
            let start = Instant::now();
            let mut stats = SepStats::default();
            for mf in &cuts {
                slot.separator
                    .fractional_sep(self.instance, vstar, mf, ctx, &mut stats);
            }
            stats.accum_usecs = start.elapsed().as_micros() as u64;
            slot.stats.fractional.merge(&stats);
        }
        trace!(
            "relaxation :: depth {}, {} distinct cuts, {} user cuts",
            ctx.depth(),
            cuts.len(),
            ctx.num_cuts()
        );
        Ok(())
    }

    fn on_progress(&self, ctx: &ProgressCtx<'_>) {
        let gap = if ctx.has_incumbent() {
            100.0 * relgap(ctx.best_bound(), ctx.incumbent())
        } else {
            f64::INFINITY
        };
        info!(
            "progress :: nodes {} (open {}), LPs {}, bounds [{:.4}, {:.4}], gap {:.2}%",
            ctx.nodes(),
            ctx.open_nodes(),
            ctx.lp_solves(),
            ctx.best_bound(),
            ctx.incumbent(),
            gap
        );
    }

    fn on_thread_down(&self, thread: ThreadInfo, scratch: ThreadScratch) {
        let mut totals = self.totals.lock();
        for slot in scratch.families {
            let family = slot.separator.family();
            debug!(
                "thread {} :: {family} fractional {} cuts in {}us, integral {} cuts in {}us",
                thread.thread_id,
                slot.stats.fractional.num_cuts,
                slot.stats.fractional.accum_usecs,
                slot.stats.integral.num_cuts,
                slot.stats.integral.accum_usecs
            );
            if let Some((_, total)) = totals.iter_mut().find(|(f, _)| *f == family) {
                total.merge(&slot.stats);
            }
        }
    }
}

impl Callback for CptpCallback<'_> {
    type Local = ThreadScratch;

    fn callback(
        &self,
        local: &mut Option<ThreadScratch>,
        thread: ThreadInfo,
        context: Where<'_, '_>,
    ) -> Result<()> {
        match context {
            Where::ThreadUp => {
                *local = Some(ThreadScratch::new(self.instance, self.settings));
                Ok(())
            }
            Where::ThreadDown => {
                if let Some(scratch) = local.take() {
                    self.on_thread_down(thread, scratch);
                }
                Ok(())
            }
            Where::Candidate(ctx) => {
                if self.token.is_cancelled() {
                    ctx.abort();
                }
                let scratch = local
                    .as_mut()
                    .ok_or_else(|| Error::callback("candidate before thread-up"))?;
                self.on_candidate(scratch, ctx)
            }
            Where::Relaxation(ctx) => {
                if self.token.is_cancelled() {
                    ctx.abort();
                    return Ok(());
                }
                let scratch = local
                    .as_mut()
                    .ok_or_else(|| Error::callback("relaxation before thread-up"))?;
                self.on_relaxation(scratch, ctx)
            }
            Where::GlobalProgress(ctx) => {
                if self.token.is_cancelled() {
                    ctx.abort();
                }
                self.on_progress(ctx);
                Ok(())
            }
        }
    }
}

/// Writes `max(0, v*(i,j))` on both arcs of every edge, snapping values
/// below [`SUPPORT_GRAPH_ZERO`] to zero.
fn fill_support_graph(support: &mut FlowNetwork<f64>, vstar: &[f64]) -> Result<()> {
    let n = support.nnodes();
    for i in 0..n {
        for j in i + 1..n {
            let v = vstar[x_var(n, i, j)];
            let cap = if v < SUPPORT_GRAPH_ZERO { 0.0 } else { v };
            support.set_cap(i, j, cap)?;
            support.set_cap(j, i, cap)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::formulation::num_mip_vars;
    use crate::models::Point;
    use std::sync::atomic::AtomicBool;

    fn line_instance() -> Instance {
        let pts = (0..7).map(|i| Point::new(i as f64, 0.0)).collect();
        let mut demands = vec![1.0; 7];
        demands[0] = 0.0;
        let mut profits = vec![5.0; 7];
        profits[0] = 0.0;
        Instance::new(4.0, pts, demands, profits).expect("valid")
    }

    fn thread() -> ThreadInfo {
        ThreadInfo {
            thread_id: 0,
            num_threads: 1,
        }
    }

    fn two_cycles(n: usize) -> Vec<f64> {
        let mut v = vec![0.0; num_mip_vars(n)];
        for (i, j) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            v[x_var(n, i, j)] = 1.0;
        }
        for i in 0..6 {
            v[y_var(n, i)] = 1.0;
        }
        v
    }

    #[test]
    fn test_subtour_candidate_is_rejected_by_every_family() {
        let inst = line_instance();
        let settings = SeparationSettings::all();
        let token = CancellationToken::new();
        let cb = CptpCallback::new(&inst, &settings, &token);
        let mut local = None;
        cb.callback(&mut local, thread(), Where::ThreadUp).expect("up");

        let v = two_cycles(7);
        let abort = AtomicBool::new(false);
        let mut ctx = CandidateCtx::new(&v, -10.0, &abort);
        cb.callback(&mut local, thread(), Where::Candidate(&mut ctx))
            .expect("candidate");
        assert!(ctx.is_rejected());
        let rows = ctx.into_lazy();
        // GSEC: 3 vertices; GLM: 1; RCI: 1
        assert_eq!(rows.len(), 5);
        for row in &rows {
            assert!(row.violation(&v) > 1e-2);
            assert!(row.coefs.iter().all(|&(col, _)| col != y_var(7, 0)));
        }

        cb.callback(&mut local, thread(), Where::ThreadDown).expect("down");
        assert!(local.is_none());
        let stats = cb.cut_stats();
        let gsec = stats.iter().find(|(f, _)| *f == CutFamily::Gsec).expect("gsec");
        assert_eq!(gsec.1.integral.num_cuts, 3);
    }

    #[test]
    fn test_disabled_families_cannot_reject() {
        let inst = line_instance();
        let settings = SeparationSettings::default();
        let token = CancellationToken::new();
        let cb = CptpCallback::new(&inst, &settings, &token);
        let mut local = None;
        cb.callback(&mut local, thread(), Where::ThreadUp).expect("up");

        let v = two_cycles(7);
        let abort = AtomicBool::new(false);
        let mut ctx = CandidateCtx::new(&v, -10.0, &abort);
        assert!(cb
            .callback(&mut local, thread(), Where::Candidate(&mut ctx))
            .is_err());
    }

    #[test]
    fn test_pricer_mode_aborts_on_negative_tour() {
        let inst = line_instance();
        let settings = SeparationSettings {
            pricer_mode: true,
            ..SeparationSettings::all()
        };
        let token = CancellationToken::new();
        let cb = CptpCallback::new(&inst, &settings, &token);
        let mut local = None;
        cb.callback(&mut local, thread(), Where::ThreadUp).expect("up");

        let n = 7;
        let mut v = vec![0.0; num_mip_vars(n)];
        v[x_var(n, 0, 1)] = 2.0;
        v[y_var(n, 0)] = 1.0;
        v[y_var(n, 1)] = 1.0;
        let abort = AtomicBool::new(false);
        let mut ctx = CandidateCtx::new(&v, -3.0, &abort);
        cb.callback(&mut local, thread(), Where::Candidate(&mut ctx))
            .expect("candidate");
        assert!(!ctx.is_rejected());
        assert!(abort.load(std::sync::atomic::Ordering::Relaxed));
    }

    #[test]
    fn test_fractional_subtour_gets_cut() {
        let inst = line_instance();
        let settings = SeparationSettings::all();
        let token = CancellationToken::new();
        let cb = CptpCallback::new(&inst, &settings, &token);
        let mut local = None;
        cb.callback(&mut local, thread(), Where::ThreadUp).expect("up");

        // triangle 3-4-5 at one half, detached from the depot
        let n = 7;
        let mut v = vec![0.0; num_mip_vars(n)];
        v[y_var(n, 0)] = 1.0;
        for (i, j) in [(3, 4), (4, 5), (3, 5)] {
            v[x_var(n, i, j)] = 0.5;
        }
        for i in 3..6 {
            v[y_var(n, i)] = 0.5;
        }
        let abort = AtomicBool::new(false);
        let mut ctx = RelaxationCtx::new(&v, -1.0, 0, &abort);
        cb.callback(&mut local, thread(), Where::Relaxation(&mut ctx))
            .expect("relaxation");
        let cuts = ctx.into_cuts();
        assert!(!cuts.is_empty());
        for cut in &cuts {
            assert!(cut.row.violation(&v) > 0.0);
            assert!(cut.row.coefs.iter().all(|&(col, _)| col != y_var(n, 0)));
        }
    }

    #[test]
    fn test_cancelled_token_aborts_relaxation() {
        let inst = line_instance();
        let settings = SeparationSettings::all();
        let token = CancellationToken::new();
        token.cancel();
        let cb = CptpCallback::new(&inst, &settings, &token);
        let mut local = None;
        cb.callback(&mut local, thread(), Where::ThreadUp).expect("up");
        let v = vec![0.0; num_mip_vars(7)];
        let abort = AtomicBool::new(false);
        let mut ctx = RelaxationCtx::new(&v, 0.0, 0, &abort);
        cb.callback(&mut local, thread(), Where::Relaxation(&mut ctx))
            .expect("relaxation");
        assert!(abort.load(std::sync::atomic::Ordering::Relaxed));
        assert_eq!(ctx.num_cuts(), 0);
    }
}
