//! Dense distance matrix.

use serde::{Deserialize, Serialize};

use super::pairs::{num_pairs, sxpos};
use crate::models::Point;

/// A dense n×n distance matrix stored in row-major order.
///
/// Built either from EUC_2D coordinates or from an explicit packed upper
/// triangle (the `UPPER_ROW` layout, one entry per unordered pair).
///
/// # Examples
///
/// ```
/// use u_cptp::models::Point;
/// use u_cptp::distance::DistanceMatrix;
///
/// let points = vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0), Point::new(6.0, 8.0)];
/// let dm = DistanceMatrix::from_points(&points);
/// assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
/// assert_eq!(dm.size(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Creates a distance matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Computes a Euclidean distance matrix from node coordinates.
    pub fn from_points(points: &[Point]) -> Self {
        let n = points.len();
        let mut dm = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = points[i].distance_to(&points[j]);
                dm.set_symmetric(i, j, d);
            }
        }
        dm
    }

    /// Builds a symmetric matrix from a packed upper triangle.
    ///
    /// Entry `(i, j)` with `i < j` is read from `packed[sxpos(size, i, j)]`.
    /// Returns `None` if the length is not `size·(size−1)/2`.
    pub fn from_upper_row(size: usize, packed: &[f64]) -> Option<Self> {
        if packed.len() != num_pairs(size) {
            return None;
        }
        let mut dm = Self::new(size);
        for i in 0..size {
            for j in (i + 1)..size {
                dm.set_symmetric(i, j, packed[sxpos(size, i, j)]);
            }
        }
        Some(dm)
    }

    /// Returns the distance from location `from` to location `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Sets the distance from location `from` to location `to`.
    pub fn set(&mut self, from: usize, to: usize, distance: f64) {
        self.data[from * self.size + to] = distance;
    }

    /// Sets both `(a, b)` and `(b, a)`.
    pub fn set_symmetric(&mut self, a: usize, b: usize, distance: f64) {
        self.set(a, b, distance);
        self.set(b, a, distance);
    }

    /// Number of locations in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packs the upper triangle in `sxpos` order.
    pub fn to_upper_row(&self) -> Vec<f64> {
        let mut packed = Vec::with_capacity(num_pairs(self.size));
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                packed.push(self.get(i, j));
            }
        }
        packed
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(0.0, 8.0),
        ]
    }

    #[test]
    fn test_from_points() {
        let dm = DistanceMatrix::from_points(&sample_points());
        assert_eq!(dm.size(), 3);
        assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
        assert!((dm.get(0, 2) - 8.0).abs() < 1e-10);
        assert!((dm.get(0, 0)).abs() < 1e-10);
        assert!(dm.is_symmetric(1e-10));
    }

    #[test]
    fn test_upper_row_layout() {
        // pairs in order (0,1) (0,2) (1,2)
        let dm = DistanceMatrix::from_upper_row(3, &[1.0, 2.0, 3.0]).expect("valid");
        assert_eq!(dm.get(0, 1), 1.0);
        assert_eq!(dm.get(2, 0), 2.0);
        assert_eq!(dm.get(1, 2), 3.0);
        assert_eq!(dm.to_upper_row(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_upper_row_invalid_size() {
        assert!(DistanceMatrix::from_upper_row(3, &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_asymmetric_matrix() {
        let mut dm = DistanceMatrix::new(2);
        dm.set(0, 1, 10.0);
        dm.set(1, 0, 15.0);
        assert!(!dm.is_symmetric(1e-10));
    }
}
