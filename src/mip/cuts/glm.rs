//! Generalized large multistar (GLM) inequalities.
//!
//! For a customer set `S` with `|S| ≥ 2`:
//!
//! ```text
//! Σ_{i∈S, j∉S} (1 − 2·d(j)/Q)·x(i,j) − Σ_{i∈S} (2·d(i)/Q)·y(i) ≥ 0
//! ```
//!
//! # Reference
//!
//! Letchford, A.N., Eglese, R.W. & Lysgaard, J. (2002). "Multistars, partial
//! multistars and the capacitated vehicle routing problem". *Mathematical
//! Programming* 94, 21-40.

use log::trace;

use super::{
    mark_component, mark_non_depot_side, push_boundary, push_fractional_cut, push_integral_cut,
    SepStats, SeparationInfo,
};
use crate::constants::{GLM_FRACTIONAL_VIOLATION_TOLERANCE, INTEGRAL_VIOLATION_TOLERANCE};
use crate::mip::engine::{CandidateCtx, Purgeable, RelaxationCtx, Sense};
use crate::mip::formulation::y_var;
use crate::models::{Instance, Tour};
use crate::network::MaxFlowResult;

const NAME: &str = "GLM";

#[derive(Debug, Clone)]
pub struct GlmSeparator {
    in_s: Vec<bool>,
}

impl GlmSeparator {
    pub fn new(instance: &Instance) -> Self {
        Self {
            in_s: vec![false; instance.num_nodes()],
        }
    }

    /// The GLM row over the marked set, evaluated at `vstar`.
    fn separate(&self, instance: &Instance, vstar: &[f64], size: usize) -> Option<SeparationInfo> {
        if size < 2 {
            return None;
        }
        debug_assert!(!self.in_s[0]);
        let n = instance.num_nodes();
        let q = instance.vehicle_cap();

        let mut info = SeparationInfo::with_capacity(Sense::Ge, 0.0, size * (n - size) + size);
        push_boundary(&mut info, &self.in_s, vstar, |j| {
            1.0 - 2.0 * instance.demand(j) / q
        });
        for i in (1..n).filter(|&i| self.in_s[i]) {
            info.push_var_lhs(vstar, -2.0 * instance.demand(i) / q, y_var(n, i));
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
        let size = mark_non_depot_side(mf, &mut self.in_s);
        match self.separate(instance, vstar, size) {
            Some(info) if info.is_violated(GLM_FRACTIONAL_VIOLATION_TOLERANCE) => {
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
        let mut added = 0;
        for c in 1..tour.num_comps() {
            let size = mark_component(tour, c, &mut self.in_s);
            match self.separate(instance, vstar, size) {
                Some(info) if info.is_violated(INTEGRAL_VIOLATION_TOLERANCE) => {
                    push_integral_cut(NAME, ctx, info, stats);
                    added += 1;
                }
                Some(info) => trace!(
                    "{NAME} :: component {c} not violated (lhs {:.4})",
                    info.lhs()
                ),
                None => {}
            }
        }
        added
    }
}
