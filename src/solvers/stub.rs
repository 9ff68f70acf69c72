//! Trivial solver returning the depot-only tour.

use log::debug;

use super::{SolveOptions, Solver, TypedParams};
use crate::error::Result;
use crate::models::{Instance, Solution, SolveStatus, Tour};
use crate::signals::CancellationToken;

/// Always answers with the empty tour: cost 0, no lower bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubSolver;

impl StubSolver {
    pub fn create(_params: &TypedParams, _options: &SolveOptions) -> Result<Box<dyn Solver>> {
        Ok(Box::new(StubSolver))
    }
}

impl Solver for StubSolver {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn solve(
        &mut self,
        instance: &Instance,
        solution: &mut Solution,
        _token: &CancellationToken,
    ) -> SolveStatus {
        let n = instance.num_nodes();
        let tour = Tour::from_sequence(n, &[0]).unwrap_or_else(|| Tour::new(n));
        debug!("stub :: depot-only tour over {n} nodes");
        solution.set_tour(tour);
        solution.set_bounds(f64::NEG_INFINITY, 0.0);
        SolveStatus::Feasible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    #[test]
    fn test_stub_writes_empty_tour() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let inst = Instance::new(1.0, pts, vec![0.0, 1.0], vec![0.0, 5.0]).expect("valid");
        let mut sol = Solution::for_instance(&inst);
        let mut solver = StubSolver;
        let status = solver.solve(&inst, &mut sol, &CancellationToken::new());
        assert_eq!(status, SolveStatus::Feasible);
        assert_eq!(sol.tour().num_visited(), 1);
        assert_eq!(sol.upper_bound(), 0.0);
        assert_eq!(sol.lower_bound(), f64::NEG_INFINITY);
    }
}
