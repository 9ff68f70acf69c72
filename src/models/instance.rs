//! Problem instance.

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A CPTP instance: one depot (vertex 0), `num_customers` customers and a
/// single vehicle of capacity `vehicle_cap`.
///
/// Immutable once built. Distances are precomputed, either from the
/// coordinates (EUC_2D) or from explicit edge weights.
///
/// # Examples
///
/// ```
/// use u_cptp::models::{Instance, Point};
///
/// let instance = Instance::new(
///     2.0,
///     vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)],
///     vec![0.0, 1.0, 1.0],
///     vec![0.0, 10.0, 10.0],
/// )
/// .unwrap();
/// assert_eq!(instance.num_nodes(), 3);
/// assert_eq!(instance.num_customers(), 2);
/// assert!((instance.dist(1, 2) - 5.0).abs() < 1e-10);
/// // rc(1, 2) = 5 - (10 + 10) / 2
/// assert!((instance.reduced_cost(1, 2) + 5.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    name: String,
    comment: String,
    num_vehicles: usize,
    vehicle_cap: f64,
    positions: Vec<Point>,
    demands: Vec<f64>,
    profits: Vec<f64>,
    edge_weights: Option<Vec<f64>>,
    distances: DistanceMatrix,
}

impl Instance {
    /// Builds an instance with Euclidean distances.
    ///
    /// Fails unless the three arrays have the same non-zero length,
    /// `vehicle_cap > 0`, the depot demand is zero and every value is finite
    /// with non-negative demands.
    pub fn new(
        vehicle_cap: f64,
        positions: Vec<Point>,
        demands: Vec<f64>,
        profits: Vec<f64>,
    ) -> Result<Self> {
        let n = positions.len();
        if n == 0 {
            return Err(Error::invalid_input("instance must contain the depot"));
        }
        if demands.len() != n || profits.len() != n {
            return Err(Error::invalid_input(format!(
                "expected {n} demands and profits, found {} and {}",
                demands.len(),
                profits.len()
            )));
        }
        if !(vehicle_cap.is_finite() && vehicle_cap > 0.0) {
            return Err(Error::invalid_input(format!(
                "vehicle capacity must be positive, found {vehicle_cap}"
            )));
        }
        if demands[0] != 0.0 {
            return Err(Error::invalid_input(format!(
                "depot demand must be zero, found {}",
                demands[0]
            )));
        }
        if let Some(i) = demands.iter().position(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::invalid_input(format!(
                "demand of vertex {i} is invalid: {}",
                demands[i]
            )));
        }
        if let Some(i) = profits.iter().position(|p| !p.is_finite()) {
            return Err(Error::invalid_input(format!(
                "profit of vertex {i} is not finite"
            )));
        }
        if let Some(i) = positions
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(Error::invalid_input(format!(
                "position of vertex {i} is not finite"
            )));
        }

        let distances = DistanceMatrix::from_points(&positions);
        Ok(Self {
            name: String::new(),
            comment: String::new(),
            num_vehicles: 1,
            vehicle_cap,
            positions,
            demands,
            profits,
            edge_weights: None,
            distances,
        })
    }

    /// Sets the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the free-form comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the declared vehicle count. Only one vehicle is ever used.
    pub fn with_num_vehicles(mut self, num_vehicles: usize) -> Self {
        self.num_vehicles = num_vehicles;
        self
    }

    /// Replaces the Euclidean distances by explicit weights, packed in
    /// `sxpos` order.
    pub fn with_edge_weights(mut self, packed: Vec<f64>) -> Result<Self> {
        let n = self.num_nodes();
        let distances = DistanceMatrix::from_upper_row(n, &packed).ok_or_else(|| {
            Error::invalid_input(format!(
                "expected {} edge weights for {n} nodes, found {}",
                crate::distance::num_pairs(n),
                packed.len()
            ))
        })?;
        if packed.iter().any(|w| !w.is_finite()) {
            return Err(Error::invalid_input("edge weights must be finite"));
        }
        self.distances = distances;
        self.edge_weights = Some(packed);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Number of vertices `N`, depot included.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.positions.len()
    }

    /// Number of customers `C = N − 1`.
    #[inline]
    pub fn num_customers(&self) -> usize {
        self.positions.len() - 1
    }

    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// Vehicle capacity `Q`.
    #[inline]
    pub fn vehicle_cap(&self) -> f64 {
        self.vehicle_cap
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn position(&self, i: usize) -> Point {
        self.positions[i]
    }

    pub fn demands(&self) -> &[f64] {
        &self.demands
    }

    #[inline]
    pub fn demand(&self, i: usize) -> f64 {
        self.demands[i]
    }

    pub fn profits(&self) -> &[f64] {
        &self.profits
    }

    #[inline]
    pub fn profit(&self, i: usize) -> f64 {
        self.profits[i]
    }

    /// Explicit edge weights, if the instance was not EUC_2D.
    pub fn edge_weights(&self) -> Option<&[f64]> {
        self.edge_weights.as_deref()
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Travel distance between `i` and `j`.
    #[inline]
    pub fn dist(&self, i: usize, j: usize) -> f64 {
        self.distances.get(i, j)
    }

    /// `rc(i, j) = dist(i, j) − ½(profit(i) + profit(j))`.
    #[inline]
    pub fn reduced_cost(&self, i: usize, j: usize) -> f64 {
        self.dist(i, j) - 0.5 * (self.profits[i] + self.profits[j])
    }

    /// Sum of all demands.
    pub fn total_demand(&self) -> f64 {
        self.demands.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Instance {
        Instance::new(
            2.0,
            vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)],
            vec![0.0, 1.0, 1.0],
            vec![0.0, 10.0, 10.0],
        )
        .expect("valid instance")
    }

    #[test]
    fn test_derived_quantities() {
        let inst = triangle();
        assert_eq!(inst.num_nodes(), 3);
        assert_eq!(inst.num_customers(), 2);
        assert_eq!(inst.num_vehicles(), 1);
        assert!((inst.dist(0, 1) - 3.0).abs() < 1e-10);
        assert!((inst.dist(2, 0) - 4.0).abs() < 1e-10);
        assert!((inst.reduced_cost(0, 1) - (3.0 - 5.0)).abs() < 1e-10);
        assert!((inst.total_demand() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_nonzero_depot_demand() {
        let res = Instance::new(
            1.0,
            vec![Point::default(), Point::new(1.0, 0.0)],
            vec![1.0, 0.0],
            vec![0.0, 0.0],
        );
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_bad_capacity_and_lengths() {
        let pts = vec![Point::default(), Point::new(1.0, 0.0)];
        assert!(Instance::new(0.0, pts.clone(), vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(Instance::new(1.0, pts.clone(), vec![0.0], vec![0.0, 1.0]).is_err());
        assert!(Instance::new(1.0, pts, vec![0.0, -1.0], vec![0.0, 1.0]).is_err());
        assert!(Instance::new(1.0, vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_explicit_edge_weights_override_coordinates() {
        let inst = triangle()
            .with_edge_weights(vec![7.0, 8.0, 9.0])
            .expect("valid weights");
        assert_eq!(inst.dist(0, 1), 7.0);
        assert_eq!(inst.dist(2, 0), 8.0);
        assert_eq!(inst.dist(1, 2), 9.0);
        assert!(triangle().with_edge_weights(vec![1.0]).is_err());
    }
}
