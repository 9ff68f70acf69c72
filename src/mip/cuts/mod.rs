//! Cut separation framework and the GSEC, GLM and RCI families.
//!
//! A family is activated once per callback thread into a [`CutSeparator`],
//! which owns its scratch for the lifetime of the thread. Separators see
//! either an integral candidate (decoded into a [`Tour`]) or a fractional
//! point together with a minimum cut of its support graph, and push their
//! rows through [`push_integral_cut`] (rejecting the candidate) or
//! [`push_fractional_cut`] (adding a user cut).
//!
//! Every separated set `S` excludes the depot: cuts over sets containing the
//! depot are not valid for this formulation.

mod glm;
mod gsec;
mod rci;

pub use glm::GlmSeparator;
pub use gsec::GsecSeparator;
pub use rci::RciSeparator;

use std::fmt;

use log::trace;

use super::engine::{CandidateCtx, Purgeable, RelaxationCtx, Row, Sense};
use super::formulation::x_var;
use crate::models::{Instance, Tour};
use crate::network::MaxFlowResult;

/// The cut families known to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutFamily {
    Gsec,
    Glm,
    Rci,
}

impl CutFamily {
    pub const ALL: [CutFamily; 3] = [CutFamily::Gsec, CutFamily::Glm, CutFamily::Rci];

    pub fn name(self) -> &'static str {
        match self {
            CutFamily::Gsec => "GSEC",
            CutFamily::Glm => "GLM",
            CutFamily::Rci => "RCI",
        }
    }
}

impl fmt::Display for CutFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cut count and time spent in one separation path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SepStats {
    pub num_cuts: usize,
    pub accum_usecs: u64,
}

impl SepStats {
    pub fn merge(&mut self, other: &SepStats) {
        self.num_cuts += other.num_cuts;
        self.accum_usecs += other.accum_usecs;
    }
}

/// Fractional and integral statistics of one family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutStats {
    pub fractional: SepStats,
    pub integral: SepStats,
}

impl CutStats {
    pub fn merge(&mut self, other: &CutStats) {
        self.fractional.merge(&other.fractional);
        self.integral.merge(&other.integral);
    }
}

/// A cut under construction, with its left-hand side evaluated at the
/// point being separated.
#[derive(Debug, Clone)]
pub struct SeparationInfo {
    row: Row,
    lhs: f64,
}

impl SeparationInfo {
    pub fn new(sense: Sense, rhs: f64) -> Self {
        Self {
            row: Row::new(sense, rhs),
            lhs: 0.0,
        }
    }

    pub fn with_capacity(sense: Sense, rhs: f64, nnz: usize) -> Self {
        Self {
            row: Row::with_capacity(sense, rhs, nnz),
            lhs: 0.0,
        }
    }

    /// Adds `coef · col` to the left-hand side.
    #[inline]
    pub fn push_var_lhs(&mut self, vstar: &[f64], coef: f64, col: usize) {
        self.row.push(col, coef);
        self.lhs += coef * vstar[col];
    }

    /// Adds `coef · col` to the right-hand side.
    #[inline]
    pub fn push_var_rhs(&mut self, vstar: &[f64], coef: f64, col: usize) {
        self.push_var_lhs(vstar, -coef, col);
    }

    pub fn sense(&self) -> Sense {
        self.row.sense
    }

    pub fn lhs(&self) -> f64 {
        self.lhs
    }

    pub fn rhs(&self) -> f64 {
        self.row.rhs
    }

    pub fn nnz(&self) -> usize {
        self.row.nnz()
    }

    /// How far the point is from satisfying the cut; ≤ 0 when satisfied.
    pub fn violation(&self) -> f64 {
        match self.row.sense {
            Sense::Ge => self.row.rhs - self.lhs,
            Sense::Le => self.lhs - self.row.rhs,
            Sense::Eq => (self.lhs - self.row.rhs).abs(),
        }
    }

    pub fn is_violated(&self, eps: f64) -> bool {
        self.nnz() > 0 && self.violation() > eps
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

/// Rejects the current candidate with `info` as a lazy constraint.
pub fn push_integral_cut(
    name: &str,
    ctx: &mut CandidateCtx<'_>,
    info: SeparationInfo,
    stats: &mut SepStats,
) {
    trace!(
        "{name} :: rejecting candidate (lhs {:.4}, rhs {:.4}, nnz {})",
        info.lhs(),
        info.rhs(),
        info.nnz()
    );
    ctx.reject(info.into_row().with_name(name));
    stats.num_cuts += 1;
}

/// Adds `info` as a user cut at the current relaxation.
pub fn push_fractional_cut(
    name: &str,
    ctx: &mut RelaxationCtx<'_>,
    info: SeparationInfo,
    purgeable: Purgeable,
    local: bool,
    stats: &mut SepStats,
) {
    trace!(
        "{name} :: adding user cut (lhs {:.4}, rhs {:.4}, nnz {})",
        info.lhs(),
        info.rhs(),
        info.nnz()
    );
    ctx.add_user_cut(info.into_row().with_name(name), purgeable, local);
    stats.num_cuts += 1;
}

/// Marks the side of `mf` opposite to the depot; returns its size.
fn mark_non_depot_side(mf: &MaxFlowResult<f64>, in_s: &mut [bool]) -> usize {
    let depot_color = mf.colors[0];
    let mut size = 0;
    for (flag, &color) in in_s.iter_mut().zip(&mf.colors) {
        *flag = color != depot_color;
        size += usize::from(*flag);
    }
    size
}

/// Marks the customers of component `c`; returns their number.
fn mark_component(tour: &Tour, c: usize, in_s: &mut [bool]) -> usize {
    let mut size = 0;
    for (i, flag) in in_s.iter_mut().enumerate() {
        *flag = i > 0 && tour.comp(i) == Some(c);
        size += usize::from(*flag);
    }
    size
}

/// Pushes `coef(j) · x(i,j)` for every boundary edge `i ∈ S, j ∉ S` and
/// returns the boundary flow `Σ v*(i,j)`.
fn push_boundary(
    info: &mut SeparationInfo,
    in_s: &[bool],
    vstar: &[f64],
    coef: impl Fn(usize) -> f64,
) -> f64 {
    let n = in_s.len();
    let mut flow = 0.0;
    for i in (0..n).filter(|&i| in_s[i]) {
        for j in (0..n).filter(|&j| !in_s[j]) {
            let col = x_var(n, i, j);
            info.push_var_lhs(vstar, coef(j), col);
            flow += vstar[col];
        }
    }
    flow
}

/// Per-thread separation state of one family.
#[derive(Debug, Clone)]
pub enum CutSeparator {
    Gsec(GsecSeparator),
    Glm(GlmSeparator),
    Rci(RciSeparator),
}

impl CutSeparator {
    /// Allocates the scratch of `family` for `instance`.
    pub fn activate(family: CutFamily, instance: &Instance) -> Self {
        match family {
            CutFamily::Gsec => CutSeparator::Gsec(GsecSeparator::new(instance)),
            CutFamily::Glm => CutSeparator::Glm(GlmSeparator::new(instance)),
            CutFamily::Rci => CutSeparator::Rci(RciSeparator::new(instance)),
        }
    }

    pub fn family(&self) -> CutFamily {
        match self {
            CutSeparator::Gsec(_) => CutFamily::Gsec,
            CutSeparator::Glm(_) => CutFamily::Glm,
            CutSeparator::Rci(_) => CutFamily::Rci,
        }
    }

    /// Separates over the non-depot side of the min cut `mf` of the
    /// fractional point `vstar`; returns the number of cuts added.
    pub fn fractional_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        mf: &MaxFlowResult<f64>,
        ctx: &mut RelaxationCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        match self {
            CutSeparator::Gsec(sep) => sep.fractional_sep(instance, vstar, mf, ctx, stats),
            CutSeparator::Glm(sep) => sep.fractional_sep(instance, vstar, mf, ctx, stats),
            CutSeparator::Rci(sep) => sep.fractional_sep(instance, vstar, mf, ctx, stats),
        }
    }

    /// Separates over the non-depot components of the candidate `tour`;
    /// returns the number of lazy constraints added.
    pub fn integral_sep(
        &mut self,
        instance: &Instance,
        vstar: &[f64],
        tour: &Tour,
        ctx: &mut CandidateCtx<'_>,
        stats: &mut SepStats,
    ) -> usize {
        match self {
            CutSeparator::Gsec(sep) => sep.integral_sep(instance, vstar, tour, ctx, stats),
            CutSeparator::Glm(sep) => sep.integral_sep(instance, vstar, tour, ctx, stats),
            CutSeparator::Rci(sep) => sep.integral_sep(instance, vstar, tour, ctx, stats),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separation_info_violation() {
        let vstar = [0.5, 0.25];
        let mut info = SeparationInfo::new(Sense::Ge, 1.0);
        info.push_var_lhs(&vstar, 1.0, 0);
        info.push_var_rhs(&vstar, -2.0, 1);
        assert!((info.lhs() - 1.0).abs() < 1e-12);
        assert!(!info.is_violated(1e-9));
        assert_eq!(info.nnz(), 2);
        let row = info.into_row();
        assert_eq!(row.coefs, vec![(0, 1.0), (1, 2.0)]);
    }

    #[test]
    fn test_empty_info_is_never_violated() {
        let info = SeparationInfo::new(Sense::Ge, 5.0);
        assert!(!info.is_violated(0.0));
    }

    #[test]
    fn test_activate_families() {
        let inst = test_support::line_instance();
        for family in CutFamily::ALL {
            assert_eq!(CutSeparator::activate(family, &inst).family(), family);
        }
        assert_eq!(CutFamily::Rci.to_string(), "RCI");
    }

    #[test]
    fn test_stats_merge() {
        let mut a = CutStats::default();
        let b = CutStats {
            fractional: SepStats { num_cuts: 2, accum_usecs: 10 },
            integral: SepStats { num_cuts: 1, accum_usecs: 5 },
        };
        a.merge(&b);
        a.merge(&b);
        assert_eq!(a.fractional.num_cuts, 4);
        assert_eq!(a.integral.accum_usecs, 10);
    }
}
