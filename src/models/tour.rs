//! Successor/component tour representation.

use serde::{Deserialize, Serialize};

/// A set of directed cycles over the vertices `0..N`.
///
/// `succ[i]` is the next vertex on `i`'s cycle and `comp[i]` its component
/// index; both are `None` for unvisited vertices. A feasible CPTP tour has a
/// single component, numbered 0, that contains the depot. Component 0 is
/// always the depot's when the depot is visited; a depot visited alone is
/// stored as the self-loop `succ[0] = 0`.
///
/// # Examples
///
/// ```
/// use u_cptp::models::Tour;
///
/// let tour = Tour::from_sequence(5, &[0, 3, 1]).unwrap();
/// assert_eq!(tour.num_comps(), 1);
/// assert_eq!(tour.succ(0), Some(3));
/// assert_eq!(tour.succ(1), Some(0));
/// assert_eq!(tour.comp(2), None);
/// assert_eq!(tour.visit_order(), vec![0, 3, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    num_vehicles: usize,
    num_comps: usize,
    succ: Vec<Option<usize>>,
    comp: Vec<Option<usize>>,
}

impl Tour {
    /// An empty tour over `num_nodes` vertices: nothing visited, no components.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_vehicles: 1,
            num_comps: 0,
            succ: vec![None; num_nodes],
            comp: vec![None; num_nodes],
        }
    }

    /// Builds a single-component tour visiting `sequence` in order.
    ///
    /// The sequence must start at the depot and contain distinct in-range
    /// vertices; returns `None` otherwise.
    pub fn from_sequence(num_nodes: usize, sequence: &[usize]) -> Option<Self> {
        if sequence.first() != Some(&0) {
            return None;
        }
        let mut tour = Self::new(num_nodes);
        for (k, &v) in sequence.iter().enumerate() {
            if v >= num_nodes || tour.comp[v].is_some() {
                return None;
            }
            let next = sequence[(k + 1) % sequence.len()];
            tour.succ[v] = Some(next);
            tour.comp[v] = Some(0);
        }
        tour.num_comps = 1;
        Some(tour)
    }

    /// Forgets every component.
    pub fn clear(&mut self) {
        self.num_comps = 0;
        self.succ.fill(None);
        self.comp.fill(None);
    }

    /// Number of vertices `N`.
    pub fn num_nodes(&self) -> usize {
        self.succ.len()
    }

    /// Number of customers `C = N − 1`.
    pub fn num_customers(&self) -> usize {
        self.succ.len().saturating_sub(1)
    }

    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    pub fn num_comps(&self) -> usize {
        self.num_comps
    }

    pub fn set_num_comps(&mut self, num_comps: usize) {
        self.num_comps = num_comps;
    }

    #[inline]
    pub fn succ(&self, i: usize) -> Option<usize> {
        self.succ[i]
    }

    #[inline]
    pub fn comp(&self, i: usize) -> Option<usize> {
        self.comp[i]
    }

    pub fn comps(&self) -> &[Option<usize>] {
        &self.comp
    }

    #[inline]
    pub fn is_visited(&self, i: usize) -> bool {
        self.comp[i].is_some()
    }

    /// Marks `i` as part of component `comp` without touching its successor.
    pub fn set_comp(&mut self, i: usize, comp: usize) {
        self.comp[i] = Some(comp);
    }

    pub fn set_succ(&mut self, i: usize, succ: usize) {
        self.succ[i] = Some(succ);
    }

    /// Marks `i` as not visited.
    pub fn unvisit(&mut self, i: usize) {
        self.succ[i] = None;
        self.comp[i] = None;
    }

    /// Vertices of the depot's cycle in visiting order, starting at 0.
    ///
    /// Empty if the depot is not visited.
    pub fn visit_order(&self) -> Vec<usize> {
        let mut order = Vec::new();
        if self.succ.is_empty() || self.comp[0].is_none() {
            return order;
        }
        let mut curr = 0;
        loop {
            order.push(curr);
            match self.succ[curr] {
                Some(next) if next != 0 && order.len() < self.succ.len() => curr = next,
                _ => break,
            }
        }
        order
    }

    /// Number of visited vertices.
    pub fn num_visited(&self) -> usize {
        self.comp.iter().filter(|c| c.is_some()).count()
    }
}
