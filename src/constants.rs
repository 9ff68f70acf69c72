//! Numerical tolerances shared by the solver, the separators and the validator.

/// Two objective values closer than this are considered equal.
pub const COST_TOLERANCE: f64 = 1e-6;

/// Slack allowed when comparing bounds (`gap ≥ −BOUND_TOLERANCE`).
pub const BOUND_TOLERANCE: f64 = 1e-6;

/// A column value within this distance of 0 or 1 counts as integral.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-3;

/// Minimum violation for a cut separated from an integral candidate.
pub const INTEGRAL_VIOLATION_TOLERANCE: f64 = 1e-2;

/// Minimum violation `2·y(i) − flow` for a GSEC separated from a fractional
/// point.
pub const GSEC_FRACTIONAL_VIOLATION_TOLERANCE: f64 = 0.5;

/// Minimum violation for a GLM cut separated from a fractional point.
pub const GLM_FRACTIONAL_VIOLATION_TOLERANCE: f64 = 1e-1;

/// Minimum violation for an RCI cut separated from a fractional point.
pub const RCI_FRACTIONAL_VIOLATION_TOLERANCE: f64 = 1e-2;

/// Support graph capacities below this magnitude are snapped to zero.
pub const SUPPORT_GRAPH_ZERO: f64 = 1e-6;

/// Relative tolerance between a tour's recomputed cost and its upper bound.
pub const OBJECTIVE_MATCH_TOLERANCE: f64 = 1e-3;

/// Largest relative gap accepted for a solution reported as optimal.
pub const OPTIMALITY_GAP_SLACK: f64 = 0.06;

/// Hard cap on solver threads.
pub const MAX_NUM_CORES: usize = 256;
