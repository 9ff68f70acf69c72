//! Reconstruction of tour components from MIP column values.

use super::formulation::{x_var, y_var};
use crate::models::Tour;

/// An edge counts as used when its value exceeds this.
const EDGE_THRESHOLD: f64 = 0.5;

/// Decodes the cycles selected by the x-values of `vstar` into `tour`.
///
/// Vertices are scanned in index order; every unvisited vertex with at
/// least one used edge starts a new component, which is followed through
/// used edges to unvisited neighbours and then closed back to its start.
/// Vertices without used edges stay unvisited, except the depot which
/// becomes the self-loop component 0.
///
/// # Examples
///
/// ```
/// use u_cptp::mip::{decode_tour, num_mip_vars, x_var, y_var};
/// use u_cptp::models::Tour;
///
/// let n = 5;
/// let mut v = vec![0.0; num_mip_vars(n)];
/// for (i, j) in [(0, 1), (1, 2), (0, 2), (3, 4)] {
///     v[x_var(n, i, j)] = 1.0;
/// }
/// for i in 0..n {
///     v[y_var(n, i)] = 1.0;
/// }
///
/// let mut tour = Tour::new(n);
/// decode_tour(n, &v, &mut tour);
/// assert_eq!(tour.num_comps(), 2);
/// assert_eq!(tour.comp(3), Some(1));
/// assert_eq!(tour.visit_order(), vec![0, 1, 2]);
/// ```
pub fn decode_tour(n: usize, vstar: &[f64], tour: &mut Tour) {
    debug_assert_eq!(tour.num_nodes(), n);
    tour.clear();
    let mut num_comps = 0;

    for start in 0..n {
        if tour.is_visited(start) {
            continue;
        }
        tour.set_comp(start, num_comps);

        let mut curr = start;
        let mut len = 1;
        while let Some(next) = (0..n).find(|&j| {
            j != curr && !tour.is_visited(j) && vstar[x_var(n, curr, j)] > EDGE_THRESHOLD
        }) {
            tour.set_succ(curr, next);
            tour.set_comp(next, num_comps);
            curr = next;
            len += 1;
        }

        if len == 1 && start != 0 {
            tour.unvisit(start);
            continue;
        }
        tour.set_succ(curr, start);
        num_comps += 1;
    }

    tour.set_num_comps(num_comps);

    debug_assert!((0..n).all(|i| {
        let y = vstar.get(y_var(n, i)).copied().unwrap_or(1.0);
        i == 0 || tour.is_visited(i) == (y > EDGE_THRESHOLD)
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::formulation::{num_mip_vars, tour_to_point};

    fn point(n: usize, edges: &[(usize, usize, f64)]) -> Vec<f64> {
        let mut v = vec![0.0; num_mip_vars(n)];
        for &(i, j, val) in edges {
            v[x_var(n, i, j)] = val;
            v[y_var(n, i)] = 1.0;
            v[y_var(n, j)] = 1.0;
        }
        v[y_var(n, 0)] = 1.0;
        v
    }

    #[test]
    fn test_two_cycles() {
        let n = 6;
        let v = point(n, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0), (3, 4, 1.0), (4, 5, 1.0), (3, 5, 1.0)]);
        let mut tour = Tour::new(n);
        decode_tour(n, &v, &mut tour);
        assert_eq!(tour.num_comps(), 2);
        assert_eq!(tour.visit_order(), vec![0, 1, 2]);
        for i in 3..6 {
            assert_eq!(tour.comp(i), Some(1));
        }
        assert_eq!(tour.succ(5), Some(3));
    }

    #[test]
    fn test_depot_only() {
        let n = 3;
        let v = point(n, &[]);
        let mut tour = Tour::new(n);
        decode_tour(n, &v, &mut tour);
        assert_eq!(tour.num_comps(), 1);
        assert_eq!(tour.succ(0), Some(0));
        assert!(!tour.is_visited(1));
        assert!(!tour.is_visited(2));
    }

    #[test]
    fn test_round_trip_edge() {
        let n = 3;
        let v = point(n, &[(0, 2, 2.0)]);
        let mut tour = Tour::new(n);
        decode_tour(n, &v, &mut tour);
        assert_eq!(tour.num_comps(), 1);
        assert_eq!(tour.visit_order(), vec![0, 2]);
        assert_eq!(tour.succ(2), Some(0));
    }

    #[test]
    fn test_decode_encoded_tour() {
        let n = 7;
        let tour = Tour::from_sequence(n, &[0, 4, 2, 6]).expect("tour");
        let mut decoded = Tour::new(n);
        decode_tour(n, &tour_to_point(n, &tour), &mut decoded);
        assert_eq!(decoded.num_comps(), 1);
        let order = decoded.visit_order();
        assert!(order == vec![0, 4, 2, 6] || order == vec![0, 6, 2, 4]);
    }
}
