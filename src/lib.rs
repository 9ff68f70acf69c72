//! # u-cptp
//!
//! Exact solver for the Capacitated Profitable Tour Problem: a single vehicle
//! of capacity `Q` leaves the depot, visits a subset of customers and
//! returns, minimizing travelled distance minus collected profit.
//!
//! ## Modules
//!
//! - [`models`] — Instance, tour, solution and solve status
//! - [`distance`] — Distance matrix and symmetric pair packing
//! - [`evaluation`] — Tour cost and invariant validation
//! - [`network`] — Flow networks, push-relabel max-flow, Gomory–Hu trees, Dijkstra
//! - [`parser`] — VRPLIB and legacy instance readers, VRPLIB writer
//! - [`mip`] — Branch-and-cut formulation, separators and driver
//! - [`duality`] — Lagrangian lower bound on the capacity constraint
//! - [`solvers`] — Solver registry, parameters and the `cptp_solve` entry point
//! - [`signals`] — Cooperative cancellation and SIGINT/SIGTERM routing
//! - [`render`] — SVG tour rendering
//! - [`logging`] — `env_logger` setup

pub mod constants;
pub mod distance;
pub mod duality;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod mip;
pub mod models;
pub mod network;
pub mod parser;
pub mod render;
pub mod signals;
pub mod solvers;

pub use error::{Error, Result};
