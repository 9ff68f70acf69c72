//! Greedy insertion warm start.
//!
//! # Algorithm
//!
//! Starting from the depot-only tour, repeatedly evaluate every unvisited
//! customer whose demand still fits, at every position of the current
//! sequence, and apply the insertion with the most negative
//! `dist(prev, c) + dist(c, next) − dist(prev, next) − profit(c)`. Stops when
//! no insertion lowers the tour cost.
//!
//! # Complexity
//!
//! O(N³) time, O(N) memory.
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use crate::constants::COST_TOLERANCE;
use crate::models::{Instance, Tour};

/// Best `(customer, position, delta)` insertion into `seq`, if any lowers
/// the cost.
fn best_insertion(
    instance: &Instance,
    seq: &[usize],
    visited: &[bool],
    load: f64,
) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    let cap = instance.vehicle_cap();

    for c in (1..instance.num_nodes()).filter(|&c| !visited[c]) {
        if load + instance.demand(c) > cap + COST_TOLERANCE {
            continue;
        }
        for pos in 1..=seq.len() {
            let prev = seq[pos - 1];
            let next = seq.get(pos).copied().unwrap_or(0);
            let delta = instance.dist(prev, c) + instance.dist(c, next)
                - instance.dist(prev, next)
                - instance.profit(c);
            if best.map_or(true, |b| delta < b.2) {
                best = Some((c, pos, delta));
            }
        }
    }

    best.filter(|b| b.2 < -COST_TOLERANCE)
}

/// Builds a capacity-feasible tour by cheapest profitable insertion.
///
/// # Examples
///
/// ```
/// use u_cptp::evaluation::tour_eval;
/// use u_cptp::mip::insertion_warm_start;
/// use u_cptp::models::{Instance, Point};
///
/// let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
/// let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).unwrap();
/// let tour = insertion_warm_start(&inst);
/// assert_eq!(tour.num_visited(), 3);
/// assert!((tour_eval(&inst, &tour) + 8.0).abs() < 1e-9);
/// ```
pub fn insertion_warm_start(instance: &Instance) -> Tour {
    let n = instance.num_nodes();
    let mut seq = vec![0];
    let mut visited = vec![false; n];
    visited[0] = true;
    let mut load = 0.0;

    while let Some((c, pos, _)) = best_insertion(instance, &seq, &visited, load) {
        seq.insert(pos, c);
        visited[c] = true;
        load += instance.demand(c);
    }

    Tour::from_sequence(n, &seq).unwrap_or_else(|| Tour::new(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{tour_eval, tour_load, validate_tour};
    use crate::models::Point;

    #[test]
    fn test_unprofitable_customers_stay_out() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let inst = Instance::new(5.0, pts, vec![0.0, 1.0], vec![0.0, 15.0]).expect("valid");
        let tour = insertion_warm_start(&inst);
        assert_eq!(tour.visit_order(), vec![0]);
        assert_eq!(tour_eval(&inst, &tour), 0.0);
    }

    #[test]
    fn test_round_trip_when_profitable() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let inst = Instance::new(5.0, pts, vec![0.0, 1.0], vec![0.0, 25.0]).expect("valid");
        let tour = insertion_warm_start(&inst);
        assert_eq!(tour.visit_order(), vec![0, 1]);
        assert!((tour_eval(&inst, &tour) + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_respects_capacity() {
        let pts = (0..6).map(|i| Point::new(i as f64, 1.0)).collect();
        let mut demands = vec![2.0; 6];
        demands[0] = 0.0;
        let mut profits = vec![50.0; 6];
        profits[0] = 0.0;
        let inst = Instance::new(5.0, pts, demands, profits).expect("valid");
        let tour = insertion_warm_start(&inst);
        assert_eq!(tour.num_visited(), 3);
        assert!(tour_load(&inst, &tour) <= 5.0);
        assert!(validate_tour(&inst, &tour).is_empty());
    }
}
