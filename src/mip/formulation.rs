//! The two-index CPTP formulation.
//!
//! Columns, in this exact order:
//!
//! - `x(i,j)` for every pair `i < j`, at [`x_var`]`(n, i, j) = sxpos(n, i, j)`;
//!   depot edges `x(0,j)` range over `{0, 1, 2}` so the round trip `0 → j → 0`
//!   is expressible, all other edges are binary,
//! - `y(i)` for every vertex, at [`y_var`]`(n, i) = n(n−1)/2 + i`, binary.
//!
//! Rows:
//!
//! - `degree(i)`: `Σ_j x(i,j) − 2·y(i) = 0` for customers, `≤ 0` for the
//!   depot so that the depot-only tour is feasible,
//! - `depot`: `y(0) ≥ 1`,
//! - `capacity`: `Σ_i demand(i)·y(i) ≤ Q`.
//!
//! Subtour elimination is left to the lazy-constraint callback.

use crate::distance::{num_pairs, pair_index};
use crate::mip::engine::{ColKind, Model, Row, Sense};
use crate::models::{Instance, Tour};

/// Column of the edge `{i, j}`; the endpoints may come in any order.
#[inline]
pub fn x_var(n: usize, i: usize, j: usize) -> usize {
    pair_index(n, i, j)
}

/// Column of the visit variable of `i`.
#[inline]
pub fn y_var(n: usize, i: usize) -> usize {
    num_pairs(n) + i
}

/// Total number of columns for `n` vertices.
#[inline]
pub fn num_mip_vars(n: usize) -> usize {
    num_pairs(n) + n
}

/// Builds the model for `instance`.
///
/// # Examples
///
/// ```
/// use u_cptp::mip::{build_formulation, num_mip_vars, y_var};
/// use u_cptp::models::{Instance, Point};
///
/// let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
/// let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).unwrap();
/// let model = build_formulation(&inst);
/// assert_eq!(model.num_cols(), num_mip_vars(3));
/// assert_eq!(model.num_rows(), 3 + 2);
/// assert_eq!(model.col(y_var(3, 1)).obj, -10.0);
/// ```
pub fn build_formulation(instance: &Instance) -> Model {
    let n = instance.num_nodes();
    let mut model = Model::new();

    for i in 0..n {
        for j in i + 1..n {
            let (ub, kind) = if i == 0 {
                (2.0, ColKind::Integer)
            } else {
                (1.0, ColKind::Binary)
            };
            let col = model.add_col(format!("x({i},{j})"), instance.dist(i, j), 0.0, ub, kind);
            debug_assert_eq!(col, x_var(n, i, j));
        }
    }
    for i in 0..n {
        let col = model.add_col(format!("y({i})"), -instance.profit(i), 0.0, 1.0, ColKind::Binary);
        debug_assert_eq!(col, y_var(n, i));
    }

    for i in 0..n {
        let sense = if i == 0 { Sense::Le } else { Sense::Eq };
        let mut row = Row::with_capacity(sense, 0.0, n).with_name(format!("degree({i})"));
        for j in (0..n).filter(|&j| j != i) {
            row.push(x_var(n, i, j), 1.0);
        }
        row.push(y_var(n, i), -2.0);
        model.add_row(row);
    }

    model.add_row(
        Row::new(Sense::Ge, 1.0)
            .with_name("depot")
            .with_coef(y_var(n, 0), 1.0),
    );

    let mut capacity =
        Row::with_capacity(Sense::Le, instance.vehicle_cap(), n).with_name("capacity");
    for i in 0..n {
        capacity.push(y_var(n, i), instance.demand(i));
    }
    model.add_row(capacity);

    model
}

/// Column values encoding `tour`: one unit on every cycle edge and on the
/// visit variable of every visited vertex.
pub fn tour_to_point(n: usize, tour: &Tour) -> Vec<f64> {
    let mut point = vec![0.0; num_mip_vars(n)];
    for i in 0..n {
        if !tour.is_visited(i) {
            continue;
        }
        point[y_var(n, i)] = 1.0;
        if let Some(j) = tour.succ(i).filter(|&j| j != i) {
            point[x_var(n, i, j)] += 1.0;
        }
    }
    point
}
