//! FIFO push-relabel maximum flow.
//!
//! # Algorithm
//!
//! Preflow push with a FIFO queue of active vertices. The source starts at
//! height N with every outgoing arc saturated; an active vertex pushes along
//! admissible residual arcs (`h[u] = h[v] + 1`) and is relabeled to
//! `1 + min h[v]` over its residual arcs when none is left. Once no vertex is
//! active the preflow is a maximum flow, and the vertices still reachable from
//! the source in the residual graph form the BLACK side of a minimum cut.
//!
//! # Complexity
//!
//! O(N³) time on the dense representation, O(N²) scratch.
//!
//! # Reference
//!
//! Goldberg, A.V., Tarjan, R.E. (1988). "A new approach to the maximum-flow
//! problem". *Journal of the ACM* 35(4), 921-940.

use std::collections::VecDeque;

use super::flow::{Color, FlowNetwork, FlowValue, MaxFlowResult};

/// Reusable scratch for repeated max-flow computations on N-vertex networks.
///
/// # Examples
///
/// ```
/// use u_cptp::network::{Color, FlowNetwork, MaxFlowResult, PushRelabel};
///
/// let mut net = FlowNetwork::<i64>::new(3);
/// net.set_cap(0, 1, 3).unwrap();
/// net.set_cap(1, 2, 2).unwrap();
///
/// let mut solver = PushRelabel::new(3);
/// let mut result = MaxFlowResult::new(3);
/// let flow = solver.max_flow(&net, 0, 2, &mut result);
/// assert_eq!(flow, 2);
/// assert_eq!(result.colors, vec![Color::Black, Color::Black, Color::White]);
/// ```
#[derive(Debug, Clone)]
pub struct PushRelabel<F> {
    nnodes: usize,
    height: Vec<usize>,
    excess: Vec<F>,
    flow: Vec<F>,
    queue: VecDeque<usize>,
    in_queue: Vec<bool>,
}

impl<F: FlowValue> PushRelabel<F> {
    pub fn new(nnodes: usize) -> Self {
        Self {
            nnodes,
            height: vec![0; nnodes],
            excess: vec![F::ZERO; nnodes],
            flow: vec![F::ZERO; nnodes * nnodes],
            queue: VecDeque::with_capacity(nnodes),
            in_queue: vec![false; nnodes],
        }
    }

    /// Computes the maximum `source → sink` flow of `net` and writes one
    /// minimum cut into `out`. Returns the flow value.
    ///
    /// # Panics
    ///
    /// Panics if `source == sink`, either is out of range, or the network
    /// size differs from the scratch size.
    pub fn max_flow(
        &mut self,
        net: &FlowNetwork<F>,
        source: usize,
        sink: usize,
        out: &mut MaxFlowResult<F>,
    ) -> F {
        let n = self.nnodes;
        assert_eq!(net.nnodes(), n, "network size does not match scratch");
        assert!(source < n && sink < n, "source/sink out of range");
        assert_ne!(source, sink, "source and sink must differ");

        self.reset();
        self.height[source] = n;

        for v in 0..n {
            let c = net.cap(source, v);
            if v != source && c.is_positive() {
                self.push(source, v, c);
                if v != sink {
                    self.enqueue(v);
                }
            }
        }

        while let Some(u) = self.queue.pop_front() {
            self.in_queue[u] = false;
            self.discharge(net, u, source, sink);
        }

        self.color_reachable(net, source, out);
        out.source = source;
        out.sink = sink;
        out.maxflow = self.excess[sink];
        debug_assert_eq!(out.colors[source], Color::Black);
        debug_assert_eq!(out.colors[sink], Color::White);
        out.maxflow
    }

    fn reset(&mut self) {
        self.height.fill(0);
        self.excess.fill(F::ZERO);
        self.flow.fill(F::ZERO);
        self.queue.clear();
        self.in_queue.fill(false);
    }

    #[inline]
    fn residual(&self, net: &FlowNetwork<F>, u: usize, v: usize) -> F {
        net.cap(u, v) - self.flow[u * self.nnodes + v]
    }

    #[inline]
    fn push(&mut self, u: usize, v: usize, delta: F) {
        let n = self.nnodes;
        self.flow[u * n + v] += delta;
        self.flow[v * n + u] -= delta;
        self.excess[u] -= delta;
        self.excess[v] += delta;
    }

    #[inline]
    fn enqueue(&mut self, v: usize) {
        if !self.in_queue[v] {
            self.in_queue[v] = true;
            self.queue.push_back(v);
        }
    }

    fn discharge(&mut self, net: &FlowNetwork<F>, u: usize, source: usize, sink: usize) {
        let n = self.nnodes;
        while self.excess[u].is_positive() {
            for v in 0..n {
                if v == u || self.height[u] != self.height[v] + 1 {
                    continue;
                }
                let r = self.residual(net, u, v);
                if !r.is_positive() {
                    continue;
                }
                let delta = self.excess[u].min_of(r);
                self.push(u, v, delta);
                if v != source && v != sink {
                    self.enqueue(v);
                }
                if !self.excess[u].is_positive() {
                    break;
                }
            }

            if !self.excess[u].is_positive() {
                break;
            }

            let lowest = (0..n)
                .filter(|&v| v != u && self.residual(net, u, v).is_positive())
                .map(|v| self.height[v])
                .min();
            match lowest {
                Some(h) => self.height[u] = h + 1,
                // only reachable through floating point residue
                None => break,
            }
        }
    }

    fn color_reachable(&self, net: &FlowNetwork<F>, source: usize, out: &mut MaxFlowResult<F>) {
        let n = self.nnodes;
        out.colors.clear();
        out.colors.resize(n, Color::White);
        out.colors[source] = Color::Black;

        let mut stack = vec![source];
        while let Some(u) = stack.pop() {
            for v in 0..n {
                if out.colors[v] == Color::White && self.residual(net, u, v).is_positive() {
                    out.colors[v] = Color::Black;
                    stack.push(v);
                }
            }
        }
    }
}

/// One-shot convenience wrapper around [`PushRelabel`].
pub fn push_relabel_max_flow<F: FlowValue>(
    net: &FlowNetwork<F>,
    source: usize,
    sink: usize,
) -> MaxFlowResult<F> {
    let mut solver = PushRelabel::new(net.nnodes());
    let mut result = MaxFlowResult::new(net.nnodes());
    solver.max_flow(net, source, sink, &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::bruteforce::bruteforce_max_flow;
    use proptest::prelude::*;

    use crate::network::Color::{Black as B, White as W};

    fn clrs_network() -> FlowNetwork<i64> {
        let mut net = FlowNetwork::new(6);
        for (i, j, c) in [
            (0, 1, 16),
            (0, 2, 13),
            (1, 2, 10),
            (2, 1, 4),
            (1, 3, 12),
            (3, 2, 9),
            (2, 4, 14),
            (4, 3, 7),
            (3, 5, 20),
            (4, 5, 4),
        ] {
            net.set_cap(i, j, c).expect("non-negative");
        }
        net
    }

    #[test]
    fn test_clrs_example() {
        let result = push_relabel_max_flow(&clrs_network(), 0, 5);
        assert_eq!(result.maxflow, 23);
        assert_eq!(result.colors, vec![B, B, B, W, B, W]);
        assert_eq!(clrs_network().cut_value(&result.colors), 23);
    }

    #[test]
    fn test_detached_sink() {
        let mut net = FlowNetwork::<i64>::new(4);
        net.set_cap(0, 1, 5).expect("cap");
        net.set_cap(1, 2, 5).expect("cap");
        net.set_cap(3, 0, 5).expect("cap");
        let result = push_relabel_max_flow(&net, 0, 3);
        assert_eq!(result.maxflow, 0);
        assert_eq!(result.colors, vec![B, B, B, W]);
    }

    #[test]
    fn test_scratch_reuse() {
        let net = clrs_network();
        let mut solver = PushRelabel::new(6);
        let mut result = MaxFlowResult::new(6);
        assert_eq!(solver.max_flow(&net, 0, 5, &mut result), 23);
        assert_eq!(solver.max_flow(&net, 0, 5, &mut result), 23);
        assert_eq!(solver.max_flow(&net, 1, 2, &mut result), 10 + 9);
    }

    #[test]
    fn test_fractional_capacities() {
        let mut net = FlowNetwork::<f64>::new(3);
        net.set_cap(0, 1, 0.5).expect("cap");
        net.set_cap(1, 2, 0.25).expect("cap");
        net.set_cap(0, 2, 0.5).expect("cap");
        let result = push_relabel_max_flow(&net, 0, 2);
        assert!((result.maxflow - 0.75).abs() < 1e-9);
    }

    fn arb_network(max_n: usize) -> impl Strategy<Value = FlowNetwork<i64>> {
        (2..=max_n).prop_flat_map(|n| {
            prop::collection::vec(0i64..20, n * n).prop_map(move |mut caps| {
                for i in 0..n {
                    caps[i * n + i] = 0;
                }
                FlowNetwork::from_capacities(n, caps).expect("non-negative")
            })
        })
    }

    fn arb_symmetric_network(max_n: usize) -> impl Strategy<Value = FlowNetwork<i64>> {
        arb_network(max_n).prop_map(|net| {
            let n = net.nnodes();
            let mut sym = FlowNetwork::new(n);
            for i in 0..n {
                for j in (i + 1)..n {
                    let c = net.cap(i, j);
                    sym.set_cap(i, j, c).expect("cap");
                    sym.set_cap(j, i, c).expect("cap");
                }
            }
            sym
        })
    }

    proptest! {
        #[test]
        fn prop_matches_bruteforce(net in arb_network(7), s in 0usize..7, t in 0usize..7) {
            let n = net.nnodes();
            let (s, t) = (s % n, t % n);
            prop_assume!(s != t);
            let fast = push_relabel_max_flow(&net, s, t);
            let slow = bruteforce_max_flow(&net, s, t);
            prop_assert_eq!(fast.maxflow, slow.maxflow);
            prop_assert_eq!(net.cut_value(&fast.colors), fast.maxflow);
            prop_assert_eq!(fast.colors[s], Color::Black);
            prop_assert_eq!(fast.colors[t], Color::White);
        }

        #[test]
        fn prop_symmetric_flow(net in arb_symmetric_network(8), s in 0usize..8, t in 0usize..8) {
            let n = net.nnodes();
            let (s, t) = (s % n, t % n);
            prop_assume!(s != t);
            let st = push_relabel_max_flow(&net, s, t).maxflow;
            let ts = push_relabel_max_flow(&net, t, s).maxflow;
            prop_assert_eq!(st, ts);
        }
    }
}
