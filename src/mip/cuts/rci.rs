//! Rounded capacity inequalities.
//!
//! For a customer set `S` with demand `q(S)`, `k = ⌈q(S)/Q⌉` and
//! `Q_r = q(S) mod Q`:
//!
//! ```text
//! Σ_{i∈S, j∉S} x(i,j) − (2/Q_r)·Σ_{i∈S} d(i)·y(i) ≥ 2·(k − q(S)/Q_r)
//! ```
//!
//! With every vertex of `S` visited this reads `x(δ(S)) ≥ 2k`; each vertex
//! left out relaxes the bound by `2·d(i)/Q_r`. Sets whose demand is an exact
//! multiple of `Q` yield no cut.
//!
//! # Reference
//!
//! Jepsen, M.K., Petersen, B., Spoorendonk, S. & Pisinger, D. (2014). "A
//! branch-and-cut algorithm for the capacitated profitable tour problem".
//! *Discrete Optimization* 14, 78-96.

use log::trace;

use super::{
    mark_component, mark_non_depot_side, push_boundary, push_fractional_cut, push_integral_cut,
    SepStats, SeparationInfo,
};
use crate::constants::{
    COST_TOLERANCE, INTEGRAL_VIOLATION_TOLERANCE, RCI_FRACTIONAL_VIOLATION_TOLERANCE,
};
use crate::mip::engine::{CandidateCtx, Purgeable, RelaxationCtx, Sense};
use crate::mip::formulation::y_var;
use crate::models::{Instance, Tour};
use crate::network::MaxFlowResult;

const NAME: &str = "RCI";

#[derive(Debug, Clone)]
pub struct RciSeparator {
    in_s: Vec<bool>,
}

impl RciSeparator {
    pub fn new(instance: &Instance) -> Self {
        Self {
            in_s: vec![false; instance.num_nodes()],
        }
    }

    /// Builds the cut over the marked set unless `flow`, the boundary value
    /// at `vstar`, already satisfies it.
    fn separate(
        &self,
        instance: &Instance,
        vstar: &[f64],
        flow: f64,
        eps: f64,
    ) -> Option<SeparationInfo> {
        let n = instance.num_nodes();
        let cap = instance.vehicle_cap();
        debug_assert!(!self.in_s[0]);

        let members = || (1..n).filter(|&i| self.in_s[i]);
        let q: f64 = members().map(|i| instance.demand(i)).sum();
        let q_r = q % cap;
        if q_r <= COST_TOLERANCE {
            return None;
        }
        let k = (q / cap).ceil();
        let rhs = 2.0 * (k - q / q_r);
        let scale = 2.0 / q_r;

        let served: f64 = members()
            .map(|i| instance.demand(i) * vstar[y_var(n, i)])
            .sum();
        if flow - scale * served >= rhs - eps {
            return None;
        }

        let size = members().count();
        let mut info = SeparationInfo::with_capacity(Sense::Ge, rhs, size * (n - size) + size);
        push_boundary(&mut info, &self.in_s, vstar, |_| 1.0);
        for i in members() {
            info.push_var_lhs(vstar, -scale * instance.demand(i), y_var(n, i));
        }
        Some(info)
    }

    pub fn fractional_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        mf: &MaxFlowResult<f64>,
        ctx: &mut RelaxationCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        if mark_non_depot_side(mf, &mut self.in_s) == 0 {
            return 0;
        }
        let eps = RCI_FRACTIONAL_VIOLATION_TOLERANCE;
        match self.separate(instance, vstar, mf.maxflow, eps) {
            Some(info) if info.is_violated(eps) => {
                push_fractional_cut(NAME, ctx, info, Purgeable::Filter, false, stats);
                1
            }
            _ => 0,
        }
    }

    pub fn integral_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        tour: &Tour,
        ctx: &mut CandidateCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        let eps = INTEGRAL_VIOLATION_TOLERANCE;
        let mut added = 0;
        for c in 1..tour.num_comps() {
            if mark_component(tour, c, &mut self.in_s) == 0 {
                continue;
            }
            let mut scratch = SeparationInfo::new(Sense::Ge, 0.0);
            let flow = push_boundary(&mut scratch, &self.in_s, vstar, |_| 1.0);
            match self.separate(instance, vstar, flow, eps) {
                Some(info) if info.is_violated(eps) => {
                    push_integral_cut(NAME, ctx, info, stats);
                    added += 1;
                }
                _ => trace!("{NAME} :: component {c} yields no cut"),
            }
        }
        added
    }
}
