//! Domain model types for the capacitated profitable tour problem.
//!
//! Provides the instance (depot, customers, demands, profits, capacity), the
//! successor/component tour representation, the solution with its bounds,
//! and the closed set of solve outcomes.

mod instance;
mod solution;
mod status;
mod tour;

pub use instance::{Instance, Point};
pub use solution::{relgap, Solution, Violation, ViolationType};
pub use status::SolveStatus;
pub use tour::Tour;
