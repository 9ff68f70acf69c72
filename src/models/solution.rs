//! Solution and violation types.

use serde::{Deserialize, Serialize};

use super::{Instance, Tour};

/// A way a tour or solution can break the CPTP invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationType {
    /// The tour does not consist of exactly one component.
    ComponentCount {
        /// Number of components found.
        found: usize,
    },
    /// The depot is not part of component 0.
    DepotNotVisited,
    /// A visited vertex belongs to a component other than 0.
    StrayComponent {
        /// Offending vertex.
        vertex: usize,
        /// Its component index.
        comp: usize,
    },
    /// Successors do not form a single cycle through the depot.
    BrokenCycle {
        /// Vertex where the walk from the depot went wrong.
        vertex: usize,
    },
    /// Collected demand exceeds the vehicle capacity.
    CapacityExceeded {
        /// Total demand of the visited vertices.
        load: f64,
        /// Vehicle capacity.
        capacity: f64,
    },
    /// The recomputed tour cost does not match the stored upper bound.
    ObjectiveMismatch {
        /// Cost recomputed from the tour.
        recomputed: f64,
        /// Upper bound stored in the solution.
        upper_bound: f64,
    },
    /// The lower bound exceeds the upper bound.
    NegativeGap {
        /// The relative gap.
        gap: f64,
    },
}

/// A constraint violation found by the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// The type of violation.
    pub kind: ViolationType,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ViolationType::ComponentCount { found } => {
                write!(f, "expected 1 component, found {found}")
            }
            ViolationType::DepotNotVisited => write!(f, "depot is not in component 0"),
            ViolationType::StrayComponent { vertex, comp } => {
                write!(f, "vertex {vertex} belongs to component {comp}")
            }
            ViolationType::BrokenCycle { vertex } => {
                write!(f, "successor chain broken at vertex {vertex}")
            }
            ViolationType::CapacityExceeded { load, capacity } => {
                write!(f, "load {load} exceeds capacity {capacity}")
            }
            ViolationType::ObjectiveMismatch {
                recomputed,
                upper_bound,
            } => write!(
                f,
                "tour cost {recomputed} does not match upper bound {upper_bound}"
            ),
            ViolationType::NegativeGap { gap } => write!(f, "negative gap {gap}"),
        }
    }
}

/// A tour together with the bounds that certify it.
///
/// A fresh solution has no tour and bounds `(−∞, +∞)`. An invalidated one
/// has `lower_bound = +∞`, `upper_bound = −∞` and no components.
///
/// # Examples
///
/// ```
/// use u_cptp::models::Solution;
///
/// let mut sol = Solution::new(4);
/// sol.set_bounds(-10.5, -10.0);
/// assert!((sol.relgap() - 0.05).abs() < 1e-9);
///
/// sol.invalidate();
/// assert!(sol.is_invalidated());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    tour: Tour,
    lower_bound: f64,
    upper_bound: f64,
}

impl Solution {
    /// Creates an empty solution over `num_nodes` vertices.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            tour: Tour::new(num_nodes),
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
        }
    }

    /// Creates an empty solution sized for `instance`.
    pub fn for_instance(instance: &Instance) -> Self {
        Self::new(instance.num_nodes())
    }

    pub fn tour(&self) -> &Tour {
        &self.tour
    }

    pub fn tour_mut(&mut self) -> &mut Tour {
        &mut self.tour
    }

    pub fn set_tour(&mut self, tour: Tour) {
        self.tour = tour;
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
    }

    /// `(ub − lb) / (1e-10 + |ub|)`.
    pub fn relgap(&self) -> f64 {
        relgap(self.lower_bound, self.upper_bound)
    }

    /// Drops the tour and sets the sentinel bounds `(+∞, −∞)`.
    pub fn invalidate(&mut self) {
        self.upper_bound = f64::NEG_INFINITY;
        self.lower_bound = f64::INFINITY;
        self.tour.clear();
    }

    /// `true` after [`Solution::invalidate`].
    pub fn is_invalidated(&self) -> bool {
        self.upper_bound == f64::NEG_INFINITY
            && self.lower_bound == f64::INFINITY
            && self.tour.num_comps() == 0
    }
}

/// Relative gap between a lower and an upper bound.
pub fn relgap(lower_bound: f64, upper_bound: f64) -> f64 {
    (upper_bound - lower_bound) / (1e-10 + upper_bound.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_solution_bounds() {
        let sol = Solution::new(3);
        assert_eq!(sol.lower_bound(), f64::NEG_INFINITY);
        assert_eq!(sol.upper_bound(), f64::INFINITY);
        assert_eq!(sol.tour().num_comps(), 0);
        assert!(!sol.is_invalidated());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let mut sol = Solution::new(3);
        sol.set_tour(Tour::from_sequence(3, &[0, 2, 1]).expect("tour"));
        sol.set_bounds(-3.0, -2.0);

        sol.invalidate();
        let once = sol.clone();
        sol.invalidate();
        assert_eq!(sol, once);
        assert!(sol.is_invalidated());
        assert_eq!(sol.tour().num_visited(), 0);
    }

    #[test]
    fn test_relgap_zero_objective() {
        assert!(relgap(0.0, 0.0).abs() < 1e-12);
        assert!(relgap(-8.0, -8.0).abs() < 1e-12);
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::new(ViolationType::ComponentCount { found: 2 });
        assert_eq!(v.to_string(), "expected 1 component, found 2");
    }
}
