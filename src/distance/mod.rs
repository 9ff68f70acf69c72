//! Distance matrices and pair indexing.
//!
//! Provides the dense distance matrix of an instance and the packed
//! unordered-pair index shared by the formulation and the cut separators.

mod matrix;
mod pairs;

pub use matrix::DistanceMatrix;
pub use pairs::{num_pairs, pair_index, sxpos};
