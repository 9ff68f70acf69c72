//! Flow networks, max-flow/min-cut and shortest paths.
//!
//! - [`FlowNetwork`] — dense capacitated digraph, generic over [`FlowValue`]
//! - [`PushRelabel`] — FIFO push-relabel max flow with min-cut coloring
//! - [`bruteforce_max_flow`] — exhaustive reference oracle
//! - [`GomoryHuTree`] — all-pairs min cuts on symmetric networks
//! - [`dijkstra`] — dense shortest paths for the Lagrangian dual

mod bruteforce;
mod dijkstra;
mod flow;
mod gomory_hu;
mod push_relabel;

pub use bruteforce::bruteforce_max_flow;
pub use dijkstra::{dijkstra, ShortestPaths};
pub use flow::{Color, FlowNetwork, FlowValue, MaxFlowResult};
pub use gomory_hu::GomoryHuTree;
pub use push_relabel::{push_relabel_max_flow, PushRelabel};
