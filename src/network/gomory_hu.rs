//! Gomory–Hu cut tree for symmetric networks.
//!
//! # Algorithm
//!
//! Gusfield's sequence: for every vertex `s ≥ 1`, one max-flow call between
//! `s` and its current tree parent, followed by a re-hanging of the vertices
//! that fell on `s`'s side of the cut. The result is a spanning tree whose
//! N−1 edges carry all pairwise min-cut values; every fundamental cut of the
//! tree is a minimum cut of the network.
//!
//! # Complexity
//!
//! N−1 max-flow computations.
//!
//! # Reference
//!
//! Gusfield, D. (1990). "Very simple methods for all pairs network flow
//! analysis". *SIAM Journal on Computing* 19(1), 143-155.

use super::flow::{Color, FlowNetwork, FlowValue, MaxFlowResult};
use super::push_relabel::PushRelabel;
use crate::error::{Error, Result};

/// All-pairs minimum cuts of a symmetric network.
///
/// Edge `(v, parent(v))` (for `v ≥ 1`) stores the min cut separating its two
/// endpoints, with `v` BLACK.
///
/// # Examples
///
/// ```
/// use u_cptp::network::{FlowNetwork, GomoryHuTree};
///
/// let mut net = FlowNetwork::<i64>::new(3);
/// for (i, j, c) in [(0, 1, 3), (1, 2, 1)] {
///     net.set_cap(i, j, c).unwrap();
///     net.set_cap(j, i, c).unwrap();
/// }
/// let tree = GomoryHuTree::build(&net).unwrap();
/// assert_eq!(tree.query(0, 2).maxflow, 1);
/// assert_eq!(tree.query(1, 0).maxflow, 3);
/// ```
#[derive(Debug, Clone)]
pub struct GomoryHuTree<F> {
    parent: Vec<usize>,
    cuts: Vec<MaxFlowResult<F>>,
}

impl<F: FlowValue> GomoryHuTree<F> {
    /// Builds the tree with N−1 push-relabel calls.
    ///
    /// Fails if the network is not symmetric.
    pub fn build(net: &FlowNetwork<F>) -> Result<Self> {
        if !net.is_symmetric() {
            return Err(Error::invalid_input(
                "gomory-hu tree requires symmetric capacities",
            ));
        }
        let mut solver = PushRelabel::new(net.nnodes());
        Ok(Self::build_with(net, &mut solver))
    }

    /// Like [`GomoryHuTree::build`] but reuses caller-owned scratch and
    /// skips the symmetry check.
    pub fn build_with(net: &FlowNetwork<F>, solver: &mut PushRelabel<F>) -> Self {
        let n = net.nnodes();
        let mut parent = vec![0usize; n];
        let mut weight = vec![F::ZERO; n];
        let mut mf = MaxFlowResult::new(n);

        for s in 1..n {
            let t = parent[s];
            let flow = solver.max_flow(net, s, t, &mut mf);
            weight[s] = flow;
            for i in 0..n {
                if i != s && mf.colors[i] == Color::Black && parent[i] == t {
                    parent[i] = s;
                }
            }
            if mf.colors[parent[t]] == Color::Black {
                parent[s] = parent[t];
                parent[t] = s;
                weight[s] = weight[t];
                weight[t] = flow;
            }
        }

        let cuts = (0..n)
            .map(|v| {
                let mut cut = MaxFlowResult::new(n);
                if v > 0 {
                    cut.source = v;
                    cut.sink = parent[v];
                    cut.maxflow = weight[v];
                    for (u, c) in cut.colors.iter_mut().enumerate() {
                        if in_subtree(&parent, u, v) {
                            *c = Color::Black;
                        }
                    }
                }
                cut
            })
            .collect();

        Self { parent, cuts }
    }

    pub fn nnodes(&self) -> usize {
        self.parent.len()
    }

    /// Tree parent of `v`; the root 0 is its own parent.
    pub fn parent(&self, v: usize) -> usize {
        self.parent[v]
    }

    /// Stored cut of the edge `(v, parent(v))`.
    pub fn edge_cut(&self, v: usize) -> &MaxFlowResult<F> {
        &self.cuts[v]
    }

    /// Minimum `s`/`t` cut: the lightest edge on the tree path between them,
    /// oriented so that `s` is BLACK and `t` WHITE.
    ///
    /// # Panics
    ///
    /// Panics if `s == t` or either is out of range.
    pub fn query(&self, s: usize, t: usize) -> MaxFlowResult<F> {
        assert_ne!(s, t, "query endpoints must differ");
        let edge = self.lightest_edge_on_path(s, t);
        let mut cut = self.cuts[edge].clone();
        cut.orient_black(s);
        cut.source = s;
        cut.sink = t;
        cut
    }

    /// Lower endpoint of the minimum-weight edge on the path from `s` to `t`.
    fn lightest_edge_on_path(&self, s: usize, t: usize) -> usize {
        let depth = |mut v: usize| {
            let mut d = 0;
            while v != 0 {
                v = self.parent[v];
                d += 1;
            }
            d
        };
        let (mut a, mut b) = (s, t);
        let (mut da, mut db) = (depth(a), depth(b));
        let mut best: Option<usize> = None;
        let consider = |v: usize, best: &mut Option<usize>| {
            if best.map_or(true, |e| self.cuts[v].maxflow < self.cuts[e].maxflow) {
                *best = Some(v);
            }
        };
        while da > db {
            consider(a, &mut best);
            a = self.parent[a];
            da -= 1;
        }
        while db > da {
            consider(b, &mut best);
            b = self.parent[b];
            db -= 1;
        }
        while a != b {
            consider(a, &mut best);
            consider(b, &mut best);
            a = self.parent[a];
            b = self.parent[b];
        }
        // s != t, so the path has at least one edge
        best.unwrap_or(s.max(t))
    }
}

/// `true` if `v` is on the tree path from `u` to the root.
fn in_subtree(parent: &[usize], mut u: usize, v: usize) -> bool {
    loop {
        if u == v {
            return true;
        }
        if u == 0 {
            return false;
        }
        u = parent[u];
    }
}
