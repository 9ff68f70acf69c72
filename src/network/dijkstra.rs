//! Dense single-source shortest paths.
//!
//! # Algorithm
//!
//! Dijkstra's algorithm with a linear scan for the closest unsettled vertex,
//! which is the right choice on complete graphs.
//!
//! # Complexity
//!
//! Θ(N²) time, O(N) space.

/// Shortest path tree from a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPaths {
    /// Distance from the source; `+∞` if unreachable.
    pub dist: Vec<f64>,
    /// Predecessor on a shortest path; `None` for the source and unreachable
    /// vertices.
    pub pred: Vec<Option<usize>>,
}

impl ShortestPaths {
    /// Vertices of the shortest path from the source to `target`, both ends
    /// included. Empty if `target` is unreachable.
    pub fn path_to(&self, target: usize) -> Vec<usize> {
        if !self.dist[target].is_finite() {
            return Vec::new();
        }
        let mut path = vec![target];
        let mut v = target;
        while let Some(p) = self.pred[v] {
            path.push(p);
            v = p;
        }
        path.reverse();
        path
    }
}

/// Shortest paths from `source` over the complete directed graph on
/// `nnodes` vertices with arc weights `weight(i, j)`.
///
/// Weights must be non-negative; a `+∞` weight marks a missing arc.
///
/// # Examples
///
/// ```
/// use u_cptp::network::dijkstra;
///
/// let w = [[0.0, 4.0, 1.0], [4.0, 0.0, 2.0], [1.0, 2.0, 0.0]];
/// let sp = dijkstra(3, 0, |i, j| w[i][j]);
/// assert_eq!(sp.dist, vec![0.0, 3.0, 1.0]);
/// assert_eq!(sp.path_to(1), vec![0, 2, 1]);
/// ```
pub fn dijkstra<W>(nnodes: usize, source: usize, weight: W) -> ShortestPaths
where
    W: Fn(usize, usize) -> f64,
{
    let mut dist = vec![f64::INFINITY; nnodes];
    let mut pred = vec![None; nnodes];
    let mut settled = vec![false; nnodes];
    dist[source] = 0.0;

    for _ in 0..nnodes {
        let next = (0..nnodes)
            .filter(|&v| !settled[v] && dist[v].is_finite())
            .min_by(|&a, &b| dist[a].total_cmp(&dist[b]));
        let Some(u) = next else {
            break;
        };
        settled[u] = true;

        for v in 0..nnodes {
            if settled[v] || v == u {
                continue;
            }
            let w = weight(u, v);
            debug_assert!(w >= 0.0, "negative arc weight {w} on ({u}, {v})");
            let candidate = dist[u] + w;
            if candidate < dist[v] {
                dist[v] = candidate;
                pred[v] = Some(u);
            }
        }
    }

    ShortestPaths { dist, pred }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_vertex() {
        let sp = dijkstra(3, 0, |i, j| if (i, j) == (0, 1) { 2.0 } else { f64::INFINITY });
        assert_eq!(sp.dist[1], 2.0);
        assert!(sp.dist[2].is_infinite());
        assert!(sp.path_to(2).is_empty());
        assert_eq!(sp.path_to(0), vec![0]);
    }

    #[test]
    fn test_asymmetric_weights() {
        let w = [[0.0, 10.0, 1.0], [1.0, 0.0, 1.0], [5.0, 1.0, 0.0]];
        let sp = dijkstra(3, 0, |i, j| w[i][j]);
        assert_eq!(sp.dist, vec![0.0, 2.0, 1.0]);
        let back = dijkstra(3, 1, |i, j| w[i][j]);
        assert_eq!(back.dist, vec![1.0, 0.0, 1.0]);
    }
}
