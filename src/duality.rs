//! Lagrangian dual bound for the CPTP.
//!
//! Relaxing the two-sided capacity constraint `cap_lb ≤ Σ d(i)·y(i) ≤ Q`
//! with multipliers `(λ_lb, λ_ub) ≥ 0` leaves a shortest-cycle problem over
//! the arc weights
//!
//! ```text
//! w(i,j) = rc(i,j) + (λ_ub − λ_lb)·(d(i) + d(j))/2
//! ```
//!
//! Every tour through the depot costs at least `min(0, min_i sp(i) + w(i,0))`
//! under `w`, where `sp` is the shortest-path distance from the depot, so
//!
//! ```text
//! L(λ) = min(0, min_i sp(i) + w(i,0)) + λ_lb·cap_lb − λ_ub·Q
//! ```
//!
//! is a valid lower bound on the optimal tour cost.
//!
//! # Algorithm
//!
//! Subgradient ascent. Each iteration raises `λ_ub` until every arc weight
//! is non-negative, solves the dual problem with Dijkstra, evaluates the
//! implied tour as a primal bound when it respects the capacity, then moves
//! the multipliers along `g = cap_lb − load`, `h = load − Q` with the step
//! `scale·(g² + h²)/(primal − dual)` of Beasley and Christofides. The loop
//! stops once the gap is closed or not finite, or the subgradient vanishes.
//!
//! # Complexity
//!
//! O(N²) per iteration.
//!
//! # Reference
//!
//! Beasley, J.E. & Christofides, N. (1989). "An algorithm for the resource
//! constrained shortest path problem". *Networks* 19, 379-394.

use log::{debug, warn};

use crate::constants::COST_TOLERANCE;
use crate::evaluation::{tour_eval, tour_load};
use crate::models::{Instance, Tour};
use crate::network::dijkstra;

/// Multipliers of the lower and upper capacity constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LagrangianMultipliers {
    pub cap_lb: f64,
    pub cap_ub: f64,
}

/// Subgradient loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubgradientParams {
    pub max_iterations: usize,
    pub step_scale: f64,
}

impl Default for SubgradientParams {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            step_scale: 0.25,
        }
    }
}

/// State after one subgradient iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct DualIteration {
    pub multipliers: LagrangianMultipliers,
    pub dual_bound: f64,
    pub best_dual_bound: f64,
    pub best_primal_bound: f64,
}

/// Result of [`lagrangian_lower_bound`].
#[derive(Debug, Clone, PartialEq)]
pub struct DualOutcome {
    /// Best valid lower bound; `−∞` when none could be computed.
    pub best_dual_bound: f64,
    pub best_primal_bound: f64,
    /// Best capacity-feasible tour implied by a dual solution.
    pub best_tour: Option<Tour>,
    pub history: Vec<DualIteration>,
}

/// Lagrangian weight of the arc `(i, j)`.
pub fn duality_dist(instance: &Instance, lm: LagrangianMultipliers, i: usize, j: usize) -> f64 {
    let avg_demand = 0.5 * (instance.demand(i) + instance.demand(j));
    instance.reduced_cost(i, j) + (lm.cap_ub - lm.cap_lb) * avg_demand
}

/// One subgradient move: `step = scale·(g² + h²)/gap`, then
/// `λ_lb ← max(0, λ_lb + step·g)` and `λ_ub ← max(0, λ_ub + step·h)`.
///
/// Returns `None` when `gap` is not a finite positive number or the
/// subgradient is zero.
pub fn subgradient_step(
    lm: LagrangianMultipliers,
    g: f64,
    h: f64,
    gap: f64,
    step_scale: f64,
) -> Option<LagrangianMultipliers> {
    let norm = g * g + h * h;
    if !gap.is_finite() || gap <= 0.0 || norm <= 0.0 {
        return None;
    }
    let step = step_scale * norm / gap;
    Some(LagrangianMultipliers {
        cap_lb: (lm.cap_lb + step * g).max(0.0),
        cap_ub: (lm.cap_ub + step * h).max(0.0),
    })
}

/// Raises `lm.cap_ub` until every arc weight is non-negative. Returns
/// `false` if some arc has negative reduced cost and zero average demand,
/// which no multiplier can fix.
fn make_weights_nonnegative(instance: &Instance, lm: &mut LagrangianMultipliers) -> bool {
    let n = instance.num_nodes();
    for i in 0..n {
        for j in (0..n).filter(|&j| j != i) {
            let rc = instance.reduced_cost(i, j);
            let avg_demand = 0.5 * (instance.demand(i) + instance.demand(j));
            if avg_demand > 0.0 {
                lm.cap_ub = lm.cap_ub.max(lm.cap_lb - rc / avg_demand);
            } else if rc < 0.0 {
                return false;
            }
        }
    }
    true
}

/// Solves the relaxed problem for non-negative weights.
///
/// Returns the value `L(λ)` and the tour achieving it: either the depot
/// alone or the shortest path to some `i` closed by the arc `(i, 0)`.
pub fn solve_dual_problem(
    instance: &Instance,
    lm: LagrangianMultipliers,
    cap_lb: f64,
) -> (f64, Tour) {
    let n = instance.num_nodes();
    let sp = dijkstra(n, 0, |i, j| duality_dist(instance, lm, i, j).max(0.0));

    let mut best = (0.0, 0);
    for i in 1..n {
        let closed = sp.dist[i] + duality_dist(instance, lm, i, 0);
        if closed < best.0 {
            best = (closed, i);
        }
    }

    let path = if best.1 == 0 {
        vec![0]
    } else {
        sp.path_to(best.1)
    };
    let tour = Tour::from_sequence(n, &path).unwrap_or_else(|| Tour::new(n));
    let bound = best.0 + lm.cap_lb * cap_lb - lm.cap_ub * instance.vehicle_cap();
    (bound, tour)
}

/// Runs the subgradient loop and returns the best Lagrangian bound.
///
/// `best_primal_bound` is the cost of a known tour (or `+∞`); `cap_lb` the
/// lower capacity requirement, 0 when there is none.
///
/// # Examples
///
/// ```
/// use u_cptp::duality::{lagrangian_lower_bound, SubgradientParams};
/// use u_cptp::models::{Instance, Point};
///
/// let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
/// let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).unwrap();
/// let out = lagrangian_lower_bound(&inst, f64::INFINITY, 0.0, SubgradientParams::default());
/// // the optimal tour costs −8
/// assert!(out.best_dual_bound <= -8.0 + 1e-9);
/// assert!(out.best_primal_bound <= 0.0);
/// ```
pub fn lagrangian_lower_bound(
    instance: &Instance,
    best_primal_bound: f64,
    cap_lb: f64,
    params: SubgradientParams,
) -> DualOutcome {
    let mut outcome = DualOutcome {
        best_dual_bound: f64::NEG_INFINITY,
        best_primal_bound,
        best_tour: None,
        history: Vec::with_capacity(params.max_iterations),
    };
    let mut lm = LagrangianMultipliers::default();

    for iteration in 0..params.max_iterations {
        if !make_weights_nonnegative(instance, &mut lm) {
            warn!("duality :: zero-demand arc with negative reduced cost, no bound available");
            break;
        }

        let (dual_bound, tour) = solve_dual_problem(instance, lm, cap_lb);
        let load = tour_load(instance, &tour);
        let feasible =
            load <= instance.vehicle_cap() + COST_TOLERANCE && load >= cap_lb - COST_TOLERANCE;
        if feasible {
            let primal = tour_eval(instance, &tour);
            if primal < outcome.best_primal_bound {
                outcome.best_primal_bound = primal;
                outcome.best_tour = Some(tour);
            }
        }
        outcome.best_dual_bound = outcome.best_dual_bound.max(dual_bound);
        outcome.history.push(DualIteration {
            multipliers: lm,
            dual_bound,
            best_dual_bound: outcome.best_dual_bound,
            best_primal_bound: outcome.best_primal_bound,
        });
        debug!(
            "duality :: iteration {iteration}, λ = ({:.4}, {:.4}), dual {dual_bound:.4}, best [{:.4}, {:.4}]",
            lm.cap_lb, lm.cap_ub, outcome.best_dual_bound, outcome.best_primal_bound
        );

        if outcome.best_dual_bound >= outcome.best_primal_bound - COST_TOLERANCE {
            break;
        }

        let gap = outcome.best_primal_bound - dual_bound;
        let g = cap_lb - load;
        let h = load - instance.vehicle_cap();
        match subgradient_step(lm, g, h, gap, params.step_scale) {
            Some(next) => lm = next,
            None => break,
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;
    use proptest::prelude::*;

    fn triangle() -> Instance {
        let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
        Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).expect("valid")
    }

    #[test]
    fn test_weights_become_nonnegative() {
        let inst = triangle();
        let mut lm = LagrangianMultipliers::default();
        assert!(make_weights_nonnegative(&inst, &mut lm));
        assert!((lm.cap_ub - 5.0).abs() < 1e-12);
        for i in 0..3 {
            for j in (0..3).filter(|&j| j != i) {
                assert!(duality_dist(&inst, lm, i, j) >= -1e-12);
            }
        }
    }

    #[test]
    fn test_dual_problem_value() {
        let inst = triangle();
        let lm = LagrangianMultipliers {
            cap_lb: 0.0,
            cap_ub: 5.0,
        };
        // every closed path is non-negative under w, so L = −λ_ub·Q
        let (bound, tour) = solve_dual_problem(&inst, lm, 0.0);
        assert!((bound + 10.0).abs() < 1e-9);
        assert_eq!(tour.visit_order(), vec![0]);
    }

    #[test]
    fn test_subgradient_step_formula() {
        let lm = LagrangianMultipliers {
            cap_lb: 1.0,
            cap_ub: 2.0,
        };
        // step = 0.25·(1² + 0²)/2 = 0.125
        let next = subgradient_step(lm, 1.0, 0.0, 2.0, 0.25).expect("step");
        assert!((next.cap_lb - 1.125).abs() < 1e-12);
        assert!((next.cap_ub - 2.0).abs() < 1e-12);

        // step = 0.25·(1 + 25)/6.5 = 1, λ_ub clamps at zero
        let next = subgradient_step(lm, 1.0, -5.0, 6.5, 0.25).expect("step");
        assert!((next.cap_lb - 2.0).abs() < 1e-12);
        assert_eq!(next.cap_ub, 0.0);
    }

    #[test]
    fn test_subgradient_step_stops_on_closed_gap() {
        let lm = LagrangianMultipliers::default();
        assert!(subgradient_step(lm, 1.0, 1.0, 0.0, 0.25).is_none());
        assert!(subgradient_step(lm, 1.0, 1.0, -1.0, 0.25).is_none());
        assert!(subgradient_step(lm, 1.0, 1.0, f64::INFINITY, 0.25).is_none());
        assert!(subgradient_step(lm, 0.0, 0.0, 3.0, 0.25).is_none());
    }

    #[test]
    fn test_zero_demand_profitable_arc_gives_no_bound() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let inst = Instance::new(1.0, pts, vec![0.0, 0.0], vec![0.0, 5.0]).expect("valid");
        let out = lagrangian_lower_bound(&inst, f64::INFINITY, 0.0, SubgradientParams::default());
        assert_eq!(out.best_dual_bound, f64::NEG_INFINITY);
        assert!(out.history.is_empty());
    }

    #[test]
    fn test_history_is_monotone() {
        let inst = triangle();
        let out = lagrangian_lower_bound(&inst, f64::INFINITY, 0.0, SubgradientParams::default());
        assert!(!out.history.is_empty());
        assert!(out.history.len() <= 10);
        for pair in out.history.windows(2) {
            assert!(pair[1].best_dual_bound >= pair[0].best_dual_bound);
            assert!(pair[1].best_primal_bound <= pair[0].best_primal_bound);
        }
    }

    proptest! {
        #[test]
        fn prop_bound_below_every_feasible_tour(
            coords in proptest::collection::vec((0.0f64..20.0, 0.0f64..20.0), 4),
            profits in proptest::collection::vec(0.0f64..30.0, 3),
            demands in proptest::collection::vec(0.5f64..3.0, 3),
        ) {
            let pts: Vec<Point> = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
            let mut d = vec![0.0];
            d.extend(demands);
            let mut p = vec![0.0];
            p.extend(profits);
            let inst = Instance::new(4.0, pts, d, p).expect("valid");
            let out = lagrangian_lower_bound(&inst, f64::INFINITY, 0.0, SubgradientParams::default());

            // enumerate every tour over the three customers
            let mut best = 0.0f64;
            let seqs: [&[usize]; 15] = [
                &[0, 1], &[0, 2], &[0, 3],
                &[0, 1, 2], &[0, 1, 3], &[0, 2, 3],
                &[0, 1, 2, 3], &[0, 1, 3, 2], &[0, 2, 1, 3],
                &[0, 2, 3, 1], &[0, 3, 1, 2], &[0, 3, 2, 1],
                &[0, 2, 1], &[0, 3, 1], &[0, 3, 2],
            ];
            for seq in seqs {
                let tour = Tour::from_sequence(4, seq).expect("tour");
                if tour_load(&inst, &tour) <= 4.0 {
                    best = best.min(tour_eval(&inst, &tour));
                }
            }
            prop_assert!(out.best_dual_bound <= best + 1e-6);
            prop_assert!(out.best_primal_bound >= best - 1e-6);
        }
    }
}
