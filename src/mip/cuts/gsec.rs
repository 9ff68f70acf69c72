//! Generalized subtour elimination constraints.
//!
//! For a customer set `S` and a vertex `i ∈ S`:
//!
//! ```text
//! Σ_{a∈S, b∉S} x(a,b) − 2·y(i) ≥ 0
//! ```
//!
//! Integral candidates get one cut per vertex of every component that misses
//! the depot. Fractional points get a single cut per min-cut set, at the
//! vertex whose visit variable violates it most.

use super::{
    mark_component, mark_non_depot_side, push_boundary, push_fractional_cut, push_integral_cut,
    SepStats, SeparationInfo,
};
use crate::constants::{GSEC_FRACTIONAL_VIOLATION_TOLERANCE, INTEGRAL_VIOLATION_TOLERANCE};
use crate::mip::engine::{CandidateCtx, Purgeable, RelaxationCtx, Sense};
use crate::mip::formulation::y_var;
use crate::models::{Instance, Tour};
use crate::network::MaxFlowResult;

const NAME: &str = "GSEC";

#[derive(Debug, Clone)]
pub struct GsecSeparator {
    in_s: Vec<bool>,
}

impl GsecSeparator {
    pub fn new(instance: &Instance) -> Self {
        Self {
            in_s: vec![false; instance.num_nodes()],
        }
    }

    pub fn fractional_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        mf: &MaxFlowResult<f64>,
        ctx: &mut RelaxationCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        let n = instance.num_nodes();
        let size = mark_non_depot_side(mf, &mut self.in_s);
        if size < 2 {
            return 0;
        }

        let mut info = SeparationInfo::with_capacity(Sense::Ge, 0.0, 1 + size * (n - size));
        let flow = push_boundary(&mut info, &self.in_s, vstar, |_| 1.0);

        let most_violated = (1..n)
            .filter(|&i| self.in_s[i])
            .map(|i| (i, 2.0 * vstar[y_var(n, i)] - flow))
            .filter(|&(_, violation)| violation > GSEC_FRACTIONAL_VIOLATION_TOLERANCE)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((i, _)) = most_violated else {
            return 0;
        };

        info.push_var_lhs(vstar, -2.0, y_var(n, i));
        debug_assert!(info.is_violated(GSEC_FRACTIONAL_VIOLATION_TOLERANCE));
        push_fractional_cut(NAME, ctx, info, Purgeable::Filter, false, stats);
        1
    }

    pub fn integral_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        tour: &Tour,
        ctx: &mut CandidateCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        if tour.num_comps() <= 1 {
            return 0;
        }
        let n = instance.num_nodes();
        let mut added = 0;

        // component 0 holds the depot
        for c in 1..tour.num_comps() {
            let size = mark_component(tour, c, &mut self.in_s);
            debug_assert!(size >= 2, "component {c} has {size} vertices");

            let mut boundary = SeparationInfo::with_capacity(Sense::Ge, 0.0, 1 + size * (n - size));
            push_boundary(&mut boundary, &self.in_s, vstar, |_| 1.0);

            for i in (1..n).filter(|&i| self.in_s[i]) {
                let mut info = boundary.clone();
                info.push_var_lhs(vstar, -2.0, y_var(n, i));
                if info.is_violated(INTEGRAL_VIOLATION_TOLERANCE) {
                    push_integral_cut(NAME, ctx, info, stats);
                    added += 1;
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::cuts::test_support::{cut_of, line_instance, two_cycles};
    use crate::mip::formulation::{num_mip_vars, x_var};
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_two_cycles_reject_with_one_cut_per_vertex() {
        let inst = line_instance();
        let (v, tour) = two_cycles(7);
        assert_eq!(tour.num_comps(), 2);

        let abort = AtomicBool::new(false);
        let mut ctx = CandidateCtx::new(&v, -1.0, &abort);
        let mut stats = SepStats::default();
        let mut sep = GsecSeparator::new(&inst);
        assert_eq!(sep.integral_sep(&inst, &v, &tour, &mut ctx, &mut stats), 3);
        assert!(ctx.is_rejected());
        assert_eq!(stats.num_cuts, 3);

        let rows = ctx.into_lazy();
        for row in &rows {
            // the candidate is cut off, so it cannot come back
            assert!(row.violation(&v) >= 2.0 - 1e-9);
            // depot and the depot's cycle are outside S
            assert!(row.coefs.iter().any(|&(col, _)| col == x_var(7, 0, 3)));
            assert!(row.coefs.iter().all(|&(col, _)| col != x_var(7, 0, 1)));
        }
    }

    #[test]
    fn test_single_component_needs_no_cut() {
        let inst = line_instance();
        let n = 7;
        let mut v = vec![0.0; num_mip_vars(n)];
        for (i, j) in [(0, 1), (1, 2), (0, 2)] {
            v[x_var(n, i, j)] = 1.0;
            v[y_var(n, i)] = 1.0;
            v[y_var(n, j)] = 1.0;
        }
        let mut tour = Tour::new(n);
        crate::mip::decode_tour(n, &v, &mut tour);
        let abort = AtomicBool::new(false);
        let mut ctx = CandidateCtx::new(&v, 0.0, &abort);
        let mut sep = GsecSeparator::new(&inst);
        assert_eq!(sep.integral_sep(&inst, &v, &tour, &mut ctx, &mut SepStats::default()), 0);
        assert!(!ctx.is_rejected());
    }

    #[test]
    fn test_fractional_picks_most_violated_vertex() {
        let inst = line_instance();
        let n = 7;
        let mut v = vec![0.0; num_mip_vars(n)];
        // S = {3, 4}: boundary flow 0.4, y(3) = 1, y(4) = 0.5
        v[x_var(n, 3, 4)] = 1.0;
        v[x_var(n, 2, 3)] = 0.4;
        v[y_var(n, 3)] = 1.0;
        v[y_var(n, 4)] = 0.5;
        let mf = cut_of(n, &[3, 4], 0.4);

        let abort = AtomicBool::new(false);
        let mut ctx = RelaxationCtx::new(&v, 0.0, 0, &abort);
        let mut sep = GsecSeparator::new(&inst);
        let mut stats = SepStats::default();
        assert_eq!(sep.fractional_sep(&inst, &v, &mf, &mut ctx, &mut stats), 1);
        let cuts = ctx.into_cuts();
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].purgeable, Purgeable::Filter);
        assert!(cuts[0].row.coefs.contains(&(y_var(n, 3), -2.0)));
        assert!((cuts[0].row.violation(&v) - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_skips_small_sets() {
        let inst = line_instance();
        let n = 7;
        let v = vec![0.0; num_mip_vars(n)];
        let abort = AtomicBool::new(false);
        let mut ctx = RelaxationCtx::new(&v, 0.0, 0, &abort);
        let mut sep = GsecSeparator::new(&inst);
        let mf = cut_of(n, &[5], 0.0);
        assert_eq!(sep.fractional_sep(&inst, &v, &mf, &mut ctx, &mut SepStats::default()), 0);
    }
}
