//! Solver registry and the top-level solve orchestrator.
//!
//! - [`Solver`] — the capability every registered solver implements
//! - [`SOLVERS`] — the static name → constructor table (`stub`, `mip`)
//! - [`cptp_solve`] — lookup, parameter resolution, seeding, signal scope,
//!   solve and post-processing
//! - [`TypedParams`] — `-D KEY=VALUE` pairs checked against a solver's
//!   declared [`ParamDescriptor`]s

mod params;
mod stub;

pub use params::{parse_key_value, ParamDescriptor, ParamType, ParamValue, TypedParams};
pub use stub::StubSolver;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};

use crate::constants::OPTIMALITY_GAP_SLACK;
use crate::error::{Error, Result};
use crate::evaluation::validate_solution;
use crate::mip::{MipSolver, MIP_PARAMS};
use crate::models::{Instance, Solution, SolveStatus};
use crate::signals::{CancellationToken, SignalGuard};

/// A CPTP solver.
pub trait Solver {
    fn name(&self) -> &'static str;

    /// Writes the tour and bounds into `solution` and returns the raw status.
    /// Implementations poll `token` and stop early once it is cancelled.
    fn solve(
        &mut self,
        instance: &Instance,
        solution: &mut Solution,
        token: &CancellationToken,
    ) -> SolveStatus;
}

/// Builds a solver from its resolved parameters.
pub type SolverFactory = fn(&TypedParams, &SolveOptions) -> Result<Box<dyn Solver>>;

/// A registry entry.
#[derive(Debug, Clone, Copy)]
pub struct SolverSpec {
    pub name: &'static str,
    pub params: &'static [ParamDescriptor],
    pub create: SolverFactory,
}

/// Every solver selectable with `-S`.
pub const SOLVERS: &[SolverSpec] = &[
    SolverSpec {
        name: "stub",
        params: &[],
        create: StubSolver::create,
    },
    SolverSpec {
        name: "mip",
        params: MIP_PARAMS,
        create: MipSolver::create,
    },
];

/// Looks up a solver by name.
pub fn find_solver(name: &str) -> Result<&'static SolverSpec> {
    SOLVERS
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| Error::UnknownSolver(name.to_string()))
}

/// Options of one [`cptp_solve`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    pub solver: String,
    pub time_limit: Option<Duration>,
    /// RNG seed; 0 picks one from the clock.
    pub seed: u64,
    /// Raw `KEY=VALUE` solver parameters.
    pub params: Vec<(String, String)>,
    /// Route SIGINT/SIGTERM to the token while solving.
    pub handle_signals: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver: "mip".to_string(),
            time_limit: Some(Duration::from_secs(600)),
            seed: 0,
            params: Vec::new(),
            handle_signals: false,
        }
    }
}

/// `seed`, or a clock-derived non-zero seed when `seed == 0`.
pub fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos.max(1)
}

/// Solves `instance` with the solver named in `options`.
///
/// Fails only for an unknown solver or invalid parameters; every solver
/// failure is reported through the returned status.
///
/// # Examples
///
/// ```
/// use u_cptp::models::{Instance, Point, Solution, SolveStatus};
/// use u_cptp::signals::CancellationToken;
/// use u_cptp::solvers::{cptp_solve, SolveOptions};
///
/// let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
/// let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).unwrap();
/// let options = SolveOptions {
///     params: vec![("NUM_THREADS".into(), "1".into())],
///     ..SolveOptions::default()
/// };
/// let mut solution = Solution::for_instance(&inst);
/// let status = cptp_solve(&inst, &options, &mut solution, &CancellationToken::new()).unwrap();
/// assert_eq!(status, SolveStatus::Optimal);
/// assert!((solution.upper_bound() + 8.0).abs() < 1e-6);
/// ```
pub fn cptp_solve(
    instance: &Instance,
    options: &SolveOptions,
    solution: &mut Solution,
    token: &CancellationToken,
) -> Result<SolveStatus> {
    let spec = find_solver(&options.solver)?;
    let params = TypedParams::resolve(spec.params, &options.params)?;
    let options = SolveOptions {
        seed: resolve_seed(options.seed),
        ..options.clone()
    };

    info!(
        "solving `{}` ({} customers, Q = {}) with `{}`, seed {}",
        instance.name(),
        instance.num_customers(),
        instance.vehicle_cap(),
        spec.name,
        options.seed
    );
    for (name, value) in params.iter() {
        info!("  {name} = {value}");
    }

    let mut solver = (spec.create)(&params, &options)?;
    let status = {
        let _guard = options.handle_signals.then(|| SignalGuard::install(token));
        solver.solve(instance, solution, token)
    };
    Ok(postprocess(instance, solution, status, token.is_cancelled()))
}

/// The status of `result`, or `Err` after logging the error.
pub fn solve_status_or_err(result: Result<SolveStatus>) -> SolveStatus {
    result.unwrap_or_else(|e| {
        error!("{e}");
        SolveStatus::Err
    })
}

/// Lifts the status under cancellation, then invalidates, clears or
/// validates `solution` accordingly. A feasible solution that fails
/// validation is reported as `Err`.
pub fn postprocess(
    instance: &Instance,
    solution: &mut Solution,
    status: SolveStatus,
    cancelled: bool,
) -> SolveStatus {
    let lift = |s: SolveStatus| if cancelled { s.aborted() } else { s };
    let status = lift(status);

    if status.is_invalid() {
        solution.invalidate();
        return status;
    }
    if status == SolveStatus::Infeasible {
        solution.tour_mut().clear();
        solution.set_bounds(f64::INFINITY, f64::INFINITY);
        return status;
    }

    let violations = validate_solution(instance, solution);
    for v in &violations {
        error!("validation :: {v}");
    }
    let gap = solution.relgap();
    if status == SolveStatus::Optimal && gap > OPTIMALITY_GAP_SLACK {
        warn!("validation :: optimal solution with relative gap {gap:.4}");
    }
    if violations.is_empty() {
        status
    } else {
        solution.invalidate();
        lift(SolveStatus::Err)
    }
}
