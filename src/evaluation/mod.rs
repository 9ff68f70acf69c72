//! Tour evaluation and solution validation.

mod evaluator;

pub use evaluator::{tour_eval, tour_load, validate_solution, validate_tour};
