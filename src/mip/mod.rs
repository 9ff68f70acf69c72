//! Branch-and-cut solver for the capacitated profitable tour problem.
//!
//! [`MipSolver`] builds the two-index formulation, attaches the separation
//! callback to the built-in [`engine`] and maps the engine outcome back to a
//! tour with bounds and a [`SolveStatus`].
//!
//! # Algorithm
//!
//! 1. Optionally compute an insertion tour and register it as a MIP start.
//! 2. Optionally bound the search from below with the Lagrangian dual and
//!    from above with the pricing cutoff `−ε`.
//! 3. Run branch and cut: integral candidates with subtours are rejected by
//!    GSEC, GLM and RCI lazy constraints; fractional points are separated
//!    over the min cuts of their support graph.
//! 4. Decode the incumbent into a tour.
//!
//! # Reference
//!
//! Jepsen, M.K., Petersen, B., Spoorendonk, S. & Pisinger, D. (2014). "A
//! branch-and-cut algorithm for the capacitated profitable tour problem".
//! *Discrete Optimization* 14, 78-96.

mod callback;
pub mod cuts;
mod decoder;
pub mod engine;
mod formulation;
mod warm_start;

pub use callback::{CptpCallback, SeparationSettings, ThreadScratch};
pub use decoder::decode_tour;
pub use formulation::{build_formulation, num_mip_vars, tour_to_point, x_var, y_var};
pub use warm_start::insertion_warm_start;

use std::sync::atomic::Ordering;
use std::time::Duration;

use log::{error, info};

use self::cuts::CutFamily;
use self::engine::{
    effective_num_threads, EngineOutcome, EngineParams, EngineStatus, MipEngine, NodeSelection,
};
use crate::constants::COST_TOLERANCE;
use crate::duality::{lagrangian_lower_bound, SubgradientParams};
use crate::error::{Error, Result};
use crate::evaluation::tour_eval;
use crate::models::{relgap, Instance, Solution, SolveStatus};
use crate::signals::CancellationToken;
use crate::solvers::{ParamDescriptor, ParamType, SolveOptions, Solver, TypedParams};

const fn bool_param(
    name: &'static str,
    default: &'static str,
    glossary: &'static str,
) -> ParamDescriptor {
    ParamDescriptor {
        name,
        ty: ParamType::Bool,
        default,
        glossary,
    }
}

/// Parameters declared by the `mip` solver.
pub const MIP_PARAMS: &[ParamDescriptor] = &[
    bool_param("SCRIND", "false", "Log engine progress"),
    ParamDescriptor {
        name: "NUM_THREADS",
        ty: ParamType::Int32,
        default: "0",
        glossary: "Worker threads (0 uses every core)",
    },
    bool_param(
        "APPLY_UPPER_CUTOFF",
        "false",
        "Only search for tours of negative cost",
    ),
    bool_param(
        "APPLY_LOWER_CUTOFF",
        "false",
        "Bound the search from below with the Lagrangian dual",
    ),
    bool_param(
        "PRICER_MODE",
        "false",
        "Stop at the first tour of negative cost",
    ),
    bool_param(
        "INS_HEUR_WARM_START",
        "false",
        "Start from the insertion heuristic tour",
    ),
    bool_param(
        "APPLY_POLISHING_AFTER_WARM_START",
        "false",
        "Dive depth first from the warm start",
    ),
    bool_param("GSEC_CUTS", "true", "Enable GSEC cuts"),
    bool_param("GLM_CUTS", "true", "Enable GLM cuts"),
    bool_param("RCI_CUTS", "true", "Enable RCI cuts"),
    bool_param(
        "GSEC_FRAC_CUTS",
        "true",
        "Separate GSEC cuts at fractional points (needs GSEC_CUTS)",
    ),
    bool_param(
        "GLM_FRAC_CUTS",
        "true",
        "Separate GLM cuts at fractional points (needs GLM_CUTS)",
    ),
    bool_param(
        "RCI_FRAC_CUTS",
        "true",
        "Separate RCI cuts at fractional points (needs RCI_CUTS)",
    ),
];

/// Resolved configuration of a [`MipSolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct MipConfig {
    pub display: bool,
    pub num_threads: usize,
    pub time_limit: Option<Duration>,
    pub seed: u64,
    pub upper_cutoff: bool,
    pub lower_cutoff: bool,
    pub warm_start: bool,
    pub polishing: bool,
    pub separation: SeparationSettings,
}

impl Default for MipConfig {
    fn default() -> Self {
        Self {
            display: false,
            num_threads: 0,
            time_limit: None,
            seed: 0,
            upper_cutoff: false,
            lower_cutoff: false,
            warm_start: false,
            polishing: false,
            separation: SeparationSettings::all(),
        }
    }
}

impl MipConfig {
    /// Reads the [`MIP_PARAMS`] values out of `params`.
    pub fn from_params(params: &TypedParams, options: &SolveOptions) -> Result<Self> {
        let num_threads = params.get_i32("NUM_THREADS")?;
        let num_threads = usize::try_from(num_threads)
            .map_err(|_| Error::invalid_param("NUM_THREADS", "must be non-negative"))?;

        let mut separation = SeparationSettings {
            pricer_mode: params.get_bool("PRICER_MODE")?,
            ..SeparationSettings::default()
        };
        for family in CutFamily::ALL {
            let name = family.name();
            if params.get_bool(&format!("{name}_CUTS"))? {
                separation.integral.push(family);
                if params.get_bool(&format!("{name}_FRAC_CUTS"))? {
                    separation.fractional.push(family);
                }
            }
        }

        Ok(Self {
            display: params.get_bool("SCRIND")?,
            num_threads,
            time_limit: options.time_limit,
            seed: options.seed,
            upper_cutoff: params.get_bool("APPLY_UPPER_CUTOFF")?,
            lower_cutoff: params.get_bool("APPLY_LOWER_CUTOFF")?,
            warm_start: params.get_bool("INS_HEUR_WARM_START")?,
            polishing: params.get_bool("APPLY_POLISHING_AFTER_WARM_START")?,
            separation,
        })
    }
}

/// Maps a raw engine status to a solve status. An abort without incumbent
/// caused by cancellation leaves nothing meaningful and maps to `Invalid`.
pub fn map_engine_status(outcome: &EngineOutcome, cancelled: bool) -> SolveStatus {
    let message = outcome.message.as_deref().unwrap_or("");
    match outcome.status {
        EngineStatus::Optimal => SolveStatus::Optimal,
        EngineStatus::TimeLimitFeasible | EngineStatus::AbortFeasible => SolveStatus::Feasible,
        EngineStatus::Infeasible | EngineStatus::TimeLimitInfeasible => SolveStatus::Infeasible,
        EngineStatus::AbortInfeasible if cancelled => SolveStatus::Invalid,
        EngineStatus::AbortInfeasible => SolveStatus::Infeasible,
        EngineStatus::CallbackError => {
            error!("mip :: callback failed: {message}");
            SolveStatus::Err
        }
        EngineStatus::Numerical => {
            error!("mip :: numerical difficulties: {message}");
            SolveStatus::Err
        }
        EngineStatus::Unbounded => {
            error!("mip :: fatal: the relaxation has an unbounded ray");
            SolveStatus::Err
        }
    }
}

/// The `mip` solver.
#[derive(Debug, Clone)]
pub struct MipSolver {
    config: MipConfig,
}

impl MipSolver {
    pub fn new(config: MipConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MipConfig {
        &self.config
    }

    /// Registry constructor.
    pub fn create(params: &TypedParams, options: &SolveOptions) -> Result<Box<dyn Solver>> {
        Ok(Box::new(Self::new(MipConfig::from_params(params, options)?)))
    }

    fn engine_params(&self) -> EngineParams {
        EngineParams {
            num_threads: effective_num_threads(self.config.num_threads),
            time_limit: self.config.time_limit,
            seed: self.config.seed,
            display: self.config.display,
            ..EngineParams::default()
        }
    }

    fn run(
        &self,
        instance: &Instance,
        solution: &mut Solution,
        token: &CancellationToken,
    ) -> Result<SolveStatus> {
        let n = instance.num_nodes();
        let model = build_formulation(instance);
        info!(
            "mip :: {} columns, {} rows, {} threads",
            model.num_cols(),
            model.num_rows(),
            effective_num_threads(self.config.num_threads)
        );

        let mut params = self.engine_params();
        let mut engine = MipEngine::new(model);
        let mut primal_bound = f64::INFINITY;

        if self.config.warm_start {
            let tour = insertion_warm_start(instance);
            primal_bound = tour_eval(instance, &tour);
            info!(
                "mip :: warm start visits {} vertices, cost {primal_bound:.4}",
                tour.num_visited()
            );
            engine.add_mip_start(tour_to_point(n, &tour))?;
            if self.config.polishing {
                params.node_selection = NodeSelection::DepthFirst;
            }
        }

        if self.config.upper_cutoff {
            params.upper_cutoff = Some(-COST_TOLERANCE);
        }

        if self.config.lower_cutoff {
            let dual =
                lagrangian_lower_bound(instance, primal_bound, 0.0, SubgradientParams::default());
            if dual.best_dual_bound.is_finite() {
                info!(
                    "mip :: lagrangian lower cutoff {:.4} after {} iterations",
                    dual.best_dual_bound,
                    dual.history.len()
                );
                params.lower_cutoff = Some(dual.best_dual_bound);
            }
        }

        *engine.params_mut() = params;
        if token.is_cancelled() {
            engine.abort_handle().store(true, Ordering::Relaxed);
        }

        let callback = CptpCallback::new(instance, &self.config.separation, token);
        let outcome = engine.solve(&callback);
        log_summary(&outcome, &callback);

        let status = map_engine_status(&outcome, token.is_cancelled());
        if status.is_feasible() {
            let point = outcome
                .point
                .as_deref()
                .ok_or_else(|| Error::other("engine reported a tour without an incumbent"))?;
            decode_tour(n, point, solution.tour_mut());
            solution.set_bounds(outcome.best_bound.min(outcome.objective), outcome.objective);
        }
        Ok(status)
    }
}

impl Solver for MipSolver {
    fn name(&self) -> &'static str {
        "mip"
    }

    fn solve(
        &mut self,
        instance: &Instance,
        solution: &mut Solution,
        token: &CancellationToken,
    ) -> SolveStatus {
        match self.run(instance, solution, token) {
            Ok(status) => status,
            Err(e) => {
                error!("mip :: {e}");
                SolveStatus::Err
            }
        }
    }
}

fn log_summary(outcome: &EngineOutcome, callback: &CptpCallback<'_>) {
    let stats = &outcome.stats;
    info!(
        "mip :: finished ({:?}) with cost [{:.6}, {:.6}], gap {:.4}, nodes {}, LPs {}, user cuts {}, lazy constraints {}",
        outcome.status,
        outcome.best_bound,
        outcome.objective,
        relgap(outcome.best_bound, outcome.objective),
        stats.nodes,
        stats.lp_solves,
        stats.user_cuts,
        stats.lazy_constraints
    );
    for (family, s) in callback.cut_stats() {
        info!(
            "mip :: {family} :: fractional {} cuts in {:.3}s, integral {} cuts in {:.3}s",
            s.fractional.num_cuts,
            s.fractional.accum_usecs as f64 / 1e6,
            s.integral.num_cuts,
            s.integral.accum_usecs as f64 / 1e6
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::validate_solution;
    use crate::models::Point;

    fn solve_with(
        instance: &Instance,
        config: MipConfig,
        token: &CancellationToken,
    ) -> (SolveStatus, Solution) {
        let mut solution = Solution::for_instance(instance);
        let mut solver = MipSolver::new(config);
        let status = solver.solve(instance, &mut solution, token);
        (status, solution)
    }

    fn single_thread() -> MipConfig {
        MipConfig {
            num_threads: 1,
            ..MipConfig::default()
        }
    }

    fn two_nodes(profit: f64) -> Instance {
        let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        Instance::new(5.0, pts, vec![0.0, 1.0], vec![0.0, profit]).expect("valid")
    }

    #[test]
    fn test_two_nodes_unprofitable() {
        let inst = two_nodes(9.0);
        let (status, sol) = solve_with(&inst, single_thread(), &CancellationToken::new());
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(sol.tour().visit_order(), vec![0]);
        assert!(sol.upper_bound().abs() < 1e-6);
    }

    #[test]
    fn test_two_nodes_round_trip() {
        let inst = two_nodes(12.0);
        let (status, sol) = solve_with(&inst, single_thread(), &CancellationToken::new());
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(sol.tour().visit_order(), vec![0, 1]);
        assert!((sol.upper_bound() + 2.0).abs() < 1e-6);
        assert!(validate_solution(&inst, &sol).is_empty());
    }

    #[test]
    fn test_oversized_demand_is_never_served() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let inst = Instance::new(2.0, pts, vec![0.0, 3.0], vec![0.0, 100.0]).expect("valid");
        let (status, sol) = solve_with(&inst, single_thread(), &CancellationToken::new());
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(sol.tour().visit_order(), vec![0]);
        assert!(sol.lower_bound().abs() < 1e-6);
        assert!(sol.upper_bound().abs() < 1e-6);
    }

    #[test]
    fn test_triangle_tour() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
        let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).expect("valid");
        for config in [
            single_thread(),
            MipConfig {
                num_threads: 2,
                warm_start: true,
                lower_cutoff: true,
                ..MipConfig::default()
            },
        ] {
            let (status, sol) = solve_with(&inst, config, &CancellationToken::new());
            assert_eq!(status, SolveStatus::Optimal);
            assert!((sol.upper_bound() + 8.0).abs() < 1e-6);
            assert_eq!(sol.tour().num_visited(), 3);
            assert!(validate_solution(&inst, &sol).is_empty());
        }
    }

    #[test]
    fn test_subtours_are_cut_off() {
        // two far-apart clusters: only one fits in the vehicle
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(20.0, 0.0),
            Point::new(21.0, 0.0),
            Point::new(21.0, 1.0),
        ];
        let demands = vec![0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let profits = vec![0.0, 4.0, 4.0, 30.0, 30.0, 30.0];
        let inst = Instance::new(3.0, pts, demands, profits).expect("valid");
        let (status, sol) = solve_with(&inst, single_thread(), &CancellationToken::new());
        assert_eq!(status, SolveStatus::Optimal);
        assert!(validate_solution(&inst, &sol).is_empty());
        assert_eq!(sol.tour().num_comps(), 1);
        assert!((tour_eval(&inst, sol.tour()) - sol.upper_bound()).abs() < 1e-6);
    }

    #[test]
    fn test_pre_cancelled_without_start_is_invalid() {
        let inst = two_nodes(12.0);
        let token = CancellationToken::new();
        token.cancel();
        let (status, _) = solve_with(&inst, single_thread(), &token);
        assert_eq!(status, SolveStatus::Invalid);
    }

    #[test]
    fn test_pre_cancelled_with_start_is_feasible() {
        let inst = two_nodes(12.0);
        let token = CancellationToken::new();
        token.cancel();
        let config = MipConfig {
            warm_start: true,
            ..single_thread()
        };
        let (status, sol) = solve_with(&inst, config, &token);
        assert_eq!(status, SolveStatus::Feasible);
        assert!((sol.upper_bound() + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_upper_cutoff_without_negative_tour() {
        let inst = two_nodes(9.0);
        let config = MipConfig {
            upper_cutoff: true,
            ..single_thread()
        };
        let (status, _) = solve_with(&inst, config, &CancellationToken::new());
        assert_eq!(status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_config_from_params() {
        let params = TypedParams::resolve(
            MIP_PARAMS,
            &[
                ("GLM_CUTS".into(), "false".into()),
                ("RCI_FRAC_CUTS".into(), "no".into()),
                ("NUM_THREADS".into(), "3".into()),
            ],
        )
        .expect("params");
        let config = MipConfig::from_params(&params, &SolveOptions::default()).expect("config");
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.separation.integral, vec![CutFamily::Gsec, CutFamily::Rci]);
        assert_eq!(config.separation.fractional, vec![CutFamily::Gsec]);

        let negative = TypedParams::resolve(MIP_PARAMS, &[("NUM_THREADS".into(), "-1".into())])
            .expect("params");
        assert!(MipConfig::from_params(&negative, &SolveOptions::default()).is_err());
    }
}
