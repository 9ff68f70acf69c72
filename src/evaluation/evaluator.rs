//! Tour cost evaluation and invariant checking.

use crate::constants::{BOUND_TOLERANCE, COST_TOLERANCE, OBJECTIVE_MATCH_TOLERANCE};
use crate::models::{Instance, Solution, Tour, Violation, ViolationType};

/// Cost of the depot's cycle: travelled distance minus collected profit.
///
/// Walks the successor chain from vertex 0. A tour that does not visit the
/// depot costs 0.
///
/// # Examples
///
/// ```
/// use u_cptp::models::{Instance, Point, Tour};
/// use u_cptp::evaluation::tour_eval;
///
/// let inst = Instance::new(
///     2.0,
///     vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)],
///     vec![0.0, 1.0, 1.0],
///     vec![0.0, 10.0, 10.0],
/// )
/// .unwrap();
/// let tour = Tour::from_sequence(3, &[0, 1, 2]).unwrap();
/// assert!((tour_eval(&inst, &tour) - (-8.0)).abs() < 1e-9);
/// ```
pub fn tour_eval(instance: &Instance, tour: &Tour) -> f64 {
    if tour.num_nodes() == 0 || !tour.is_visited(0) {
        return 0.0;
    }
    let n = tour.num_nodes();
    let mut cost = 0.0;
    let mut curr = 0;
    for _ in 0..n {
        let Some(next) = tour.succ(curr) else {
            break;
        };
        cost += instance.dist(curr, next) - instance.profit(curr);
        curr = next;
        if curr == 0 {
            break;
        }
    }
    cost
}

/// Total demand of the vertices on the depot's cycle.
pub fn tour_load(instance: &Instance, tour: &Tour) -> f64 {
    tour.visit_order()
        .iter()
        .map(|&i| instance.demand(i))
        .sum()
}

/// Checks the single-vehicle tour invariants.
///
/// Returns every violation found: component count, depot membership,
/// stray components, cycle integrity and capacity.
pub fn validate_tour(instance: &Instance, tour: &Tour) -> Vec<Violation> {
    let mut violations = Vec::new();
    let n = tour.num_nodes();

    if tour.num_comps() != 1 {
        violations.push(Violation::new(ViolationType::ComponentCount {
            found: tour.num_comps(),
        }));
    }
    if n == 0 || tour.comp(0) != Some(0) {
        violations.push(Violation::new(ViolationType::DepotNotVisited));
        return violations;
    }
    for i in 0..n {
        if let Some(c) = tour.comp(i) {
            if c != 0 {
                violations.push(Violation::new(ViolationType::StrayComponent {
                    vertex: i,
                    comp: c,
                }));
            }
        }
    }

    // the cycle from the depot must cover exactly the visited vertices
    let mut seen = vec![false; n];
    let mut curr = 0;
    let mut load = 0.0;
    loop {
        if seen[curr] {
            violations.push(Violation::new(ViolationType::BrokenCycle { vertex: curr }));
            break;
        }
        seen[curr] = true;
        load += instance.demand(curr);
        match tour.succ(curr) {
            Some(0) => break,
            Some(next) if next < n && tour.is_visited(next) => curr = next,
            _ => {
                violations.push(Violation::new(ViolationType::BrokenCycle { vertex: curr }));
                break;
            }
        }
    }
    if let Some(i) = (0..n).find(|&i| tour.is_visited(i) && !seen[i]) {
        violations.push(Violation::new(ViolationType::BrokenCycle { vertex: i }));
    }

    if load > instance.vehicle_cap() + COST_TOLERANCE {
        violations.push(Violation::new(ViolationType::CapacityExceeded {
            load,
            capacity: instance.vehicle_cap(),
        }));
    }
    violations
}

/// Checks a solution: tour invariants, `relgap ≥ −1e-6` and
/// `tour_eval ≈ upper_bound` within 1e-3 relative.
pub fn validate_solution(instance: &Instance, solution: &Solution) -> Vec<Violation> {
    let mut violations = validate_tour(instance, solution.tour());

    let gap = solution.relgap();
    if gap < -BOUND_TOLERANCE {
        violations.push(Violation::new(ViolationType::NegativeGap { gap }));
    }

    let recomputed = tour_eval(instance, solution.tour());
    let ub = solution.upper_bound();
    if !approx_rel_eq(recomputed, ub, OBJECTIVE_MATCH_TOLERANCE) {
        violations.push(Violation::new(ViolationType::ObjectiveMismatch {
            recomputed,
            upper_bound: ub,
        }));
    }
    violations
}

fn approx_rel_eq(a: f64, b: f64, tol: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return a == b;
    }
    (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    fn square() -> Instance {
        Instance::new(
            3.0,
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            vec![0.0, 1.0, 1.0, 2.0],
            vec![0.0, 2.0, 2.0, 2.0],
        )
        .expect("valid")
    }

    #[test]
    fn test_tour_eval_depot_only() {
        let inst = square();
        let tour = Tour::from_sequence(4, &[0]).expect("tour");
        assert!(tour_eval(&inst, &tour).abs() < 1e-12);
        assert!(validate_tour(&inst, &tour).is_empty());
    }

    #[test]
    fn test_tour_eval_and_load() {
        let inst = square();
        let tour = Tour::from_sequence(4, &[0, 1, 2]).expect("tour");
        let expected = 1.0 + 1.0 + 2f64.sqrt() - 4.0;
        assert!((tour_eval(&inst, &tour) - expected).abs() < 1e-10);
        assert!((tour_load(&inst, &tour) - 2.0).abs() < 1e-10);
        assert!(validate_tour(&inst, &tour).is_empty());
    }

    #[test]
    fn test_capacity_violation() {
        let inst = square();
        let tour = Tour::from_sequence(4, &[0, 1, 2, 3]).expect("tour");
        let violations = validate_tour(&inst, &tour);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0].kind,
            ViolationType::CapacityExceeded { .. }
        ));
    }

    #[test]
    fn test_two_components_rejected() {
        let inst = square();
        let mut tour = Tour::new(4);
        tour.set_num_comps(2);
        for (i, s, c) in [(0, 1, 0), (1, 0, 0), (2, 3, 1), (3, 2, 1)] {
            tour.set_succ(i, s);
            tour.set_comp(i, c);
        }
        let kinds: Vec<_> = validate_tour(&inst, &tour)
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert!(kinds.contains(&ViolationType::ComponentCount { found: 2 }));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, ViolationType::StrayComponent { vertex: 2, comp: 1 })));
    }

    #[test]
    fn test_validate_solution_objective_mismatch() {
        let inst = square();
        let mut sol = Solution::for_instance(&inst);
        sol.set_tour(Tour::from_sequence(4, &[0, 1, 2]).expect("tour"));
        let cost = tour_eval(&inst, sol.tour());
        sol.set_bounds(cost - 0.1, cost);
        assert!(validate_solution(&inst, &sol).is_empty());

        sol.set_bounds(cost - 0.1, cost + 1.0);
        assert!(validate_solution(&inst, &sol)
            .iter()
            .any(|v| matches!(v.kind, ViolationType::ObjectiveMismatch { .. })));
    }
}
