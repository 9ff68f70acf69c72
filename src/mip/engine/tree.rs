//! Search-tree nodes and the open-node queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::model::Row;

/// Node selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Lowest LP bound first, deeper nodes breaking ties.
    #[default]
    BestFirst,
    /// Deepest node first, lowest bound breaking ties.
    DepthFirst,
}

/// A node of the branch-and-cut tree.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: u64,
    /// LP bound inherited from the parent.
    pub bound: f64,
    pub depth: usize,
    /// `(column, lb, ub)` bound changes made by branching.
    pub branchings: Vec<(usize, f64, f64)>,
    /// Cuts valid only in this subtree.
    pub local_cuts: Vec<Row>,
    priority: (f64, f64),
}

impl Node {
    pub fn root() -> Self {
        Self {
            id: 0,
            bound: f64::NEG_INFINITY,
            depth: 0,
            branchings: Vec::new(),
            local_cuts: Vec::new(),
            priority: (0.0, 0.0),
        }
    }

    /// The child obtained by restricting `col` to `[lb, ub]`.
    pub fn child(&self, id: u64, bound: f64, col: usize, lb: f64, ub: f64) -> Self {
        let mut branchings = Vec::with_capacity(self.branchings.len() + 1);
        branchings.extend_from_slice(&self.branchings);
        branchings.push((col, lb, ub));
        Self {
            id,
            bound,
            depth: self.depth + 1,
            branchings,
            local_cuts: self.local_cuts.clone(),
            priority: (0.0, 0.0),
        }
    }

    fn prioritize(&mut self, selection: NodeSelection) {
        let depth = self.depth as f64;
        self.priority = match selection {
            NodeSelection::BestFirst => (-self.bound, depth),
            NodeSelection::DepthFirst => (depth, -self.bound),
        };
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .0
            .total_cmp(&other.priority.0)
            .then(self.priority.1.total_cmp(&other.priority.1))
            .then(other.id.cmp(&self.id))
    }
}

/// Open nodes ordered by the selection strategy.
#[derive(Debug)]
pub(crate) struct NodeQueue {
    heap: BinaryHeap<Node>,
    selection: NodeSelection,
}

impl NodeQueue {
    pub fn new(selection: NodeSelection) -> Self {
        Self {
            heap: BinaryHeap::new(),
            selection,
        }
    }

    pub fn push(&mut self, mut node: Node) {
        node.prioritize(self.selection);
        self.heap.push(node);
    }

    pub fn pop(&mut self) -> Option<Node> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Smallest bound among open nodes; `+∞` when empty.
    pub fn min_bound(&self) -> f64 {
        self.heap
            .iter()
            .map(|n| n.bound)
            .fold(f64::INFINITY, f64::min)
    }

    /// Drops every node whose bound is not below `cutoff`.
    pub fn prune(&mut self, cutoff: f64) -> usize {
        let before = self.heap.len();
        self.heap.retain(|n| n.bound < cutoff);
        before - self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, bound: f64, depth: usize) -> Node {
        let mut n = Node::root();
        n.id = id;
        n.bound = bound;
        n.depth = depth;
        n
    }

    #[test]
    fn test_best_first_order() {
        let mut q = NodeQueue::new(NodeSelection::BestFirst);
        q.push(node(1, -3.0, 1));
        q.push(node(2, -5.0, 1));
        q.push(node(3, -5.0, 4));
        assert_eq!(q.min_bound(), -5.0);
        let order: Vec<u64> = std::iter::from_fn(|| q.pop()).map(|n| n.id).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_depth_first_order() {
        let mut q = NodeQueue::new(NodeSelection::DepthFirst);
        q.push(node(1, -9.0, 1));
        q.push(node(2, -1.0, 3));
        q.push(node(3, -2.0, 3));
        let order: Vec<u64> = std::iter::from_fn(|| q.pop()).map(|n| n.id).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_prune_and_children() {
        let mut q = NodeQueue::new(NodeSelection::BestFirst);
        let root = Node::root();
        let child = root.child(7, -2.0, 4, 1.0, 1.0);
        assert_eq!(child.depth, 1);
        assert_eq!(child.branchings, vec![(4, 1.0, 1.0)]);
        q.push(child);
        q.push(node(8, 0.5, 1));
        assert_eq!(q.prune(0.0), 1);
        assert_eq!(q.len(), 1);
        assert!(!q.is_empty());
        assert_eq!(NodeQueue::new(NodeSelection::BestFirst).min_bound(), f64::INFINITY);
    }
}
