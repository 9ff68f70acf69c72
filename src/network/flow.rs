//! Capacitated directed network and max-flow result types.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::{Error, Result};

/// Numeric type usable as a flow capacity.
///
/// Implemented for `i64` (exact, used by tests and integral data) and `f64`
/// (support graphs built from LP values).
pub trait FlowValue:
    Copy
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;

    /// Strictly positive, up to the numeric noise of the type.
    fn is_positive(self) -> bool;

    /// Lossy conversion used for logging and cut bookkeeping.
    fn to_f64(self) -> f64;

    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl FlowValue for i64 {
    const ZERO: Self = 0;

    #[inline]
    fn is_positive(self) -> bool {
        self > 0
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl FlowValue for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn is_positive(self) -> bool {
        self > 1e-9
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// Side of a two-coloring produced by a min cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Source side.
    Black,
    /// Sink side.
    White,
}

impl Color {
    pub fn flipped(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

/// An N×N matrix of non-negative arc capacities.
///
/// # Examples
///
/// ```
/// use u_cptp::network::FlowNetwork;
///
/// let mut net = FlowNetwork::<i64>::new(3);
/// net.set_cap(0, 1, 4).unwrap();
/// assert_eq!(net.cap(0, 1), 4);
/// assert_eq!(net.cap(1, 0), 0);
/// assert!(net.set_cap(1, 2, -1).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNetwork<F> {
    nnodes: usize,
    cap: Vec<F>,
}

impl<F: FlowValue> FlowNetwork<F> {
    /// A network with every capacity zero.
    pub fn new(nnodes: usize) -> Self {
        Self {
            nnodes,
            cap: vec![F::ZERO; nnodes * nnodes],
        }
    }

    /// Builds a network from a row-major capacity matrix.
    pub fn from_capacities(nnodes: usize, cap: Vec<F>) -> Result<Self> {
        if cap.len() != nnodes * nnodes {
            return Err(Error::invalid_input(format!(
                "expected {} capacities, found {}",
                nnodes * nnodes,
                cap.len()
            )));
        }
        if let Some(c) = cap.iter().find(|c| **c < F::ZERO) {
            return Err(Error::invalid_input(format!(
                "capacities must be non-negative, found {c:?}"
            )));
        }
        Ok(Self { nnodes, cap })
    }

    #[inline]
    pub fn nnodes(&self) -> usize {
        self.nnodes
    }

    #[inline]
    pub fn cap(&self, i: usize, j: usize) -> F {
        self.cap[i * self.nnodes + j]
    }

    /// Sets the capacity of arc `(i, j)`. Negative values are rejected.
    pub fn set_cap(&mut self, i: usize, j: usize, value: F) -> Result<()> {
        if value < F::ZERO {
            return Err(Error::invalid_input(format!(
                "negative capacity {value:?} on arc ({i}, {j})"
            )));
        }
        self.cap[i * self.nnodes + j] = value;
        Ok(())
    }

    /// Resets every capacity to zero.
    pub fn clear(&mut self) {
        self.cap.fill(F::ZERO);
    }

    /// `true` if `cap(i, j) == cap(j, i)` for every pair.
    pub fn is_symmetric(&self) -> bool {
        (0..self.nnodes)
            .all(|i| ((i + 1)..self.nnodes).all(|j| self.cap(i, j) == self.cap(j, i)))
    }

    /// Total capacity of the arcs going from the BLACK side to the WHITE side.
    pub fn cut_value(&self, colors: &[Color]) -> F {
        let mut value = F::ZERO;
        for i in 0..self.nnodes {
            if colors[i] != Color::Black {
                continue;
            }
            for j in 0..self.nnodes {
                if colors[j] == Color::White {
                    value += self.cap(i, j);
                }
            }
        }
        value
    }
}

/// A max-flow value together with one min cut realising it.
///
/// `colors[source]` is BLACK and `colors[sink]` is WHITE.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxFlowResult<F> {
    pub source: usize,
    pub sink: usize,
    pub maxflow: F,
    pub colors: Vec<Color>,
}

impl<F: FlowValue> MaxFlowResult<F> {
    /// An empty result sized for `nnodes` vertices.
    pub fn new(nnodes: usize) -> Self {
        Self {
            source: 0,
            sink: 0,
            maxflow: F::ZERO,
            colors: vec![Color::White; nnodes],
        }
    }

    /// Vertices on the BLACK side.
    pub fn black_side(&self) -> impl Iterator<Item = usize> + '_ {
        self.colors
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Color::Black)
            .map(|(i, _)| i)
    }

    /// Swaps the colors so that `vertex` ends up BLACK.
    pub fn orient_black(&mut self, vertex: usize) {
        if self.colors[vertex] == Color::White {
            for c in self.colors.iter_mut() {
                *c = c.flipped();
            }
            std::mem::swap(&mut self.source, &mut self.sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_capacities_validation() {
        assert!(FlowNetwork::<i64>::from_capacities(2, vec![0, 1, 1]).is_err());
        assert!(FlowNetwork::<i64>::from_capacities(2, vec![0, -1, 1, 0]).is_err());
        let net = FlowNetwork::<i64>::from_capacities(2, vec![0, 3, 3, 0]).expect("valid");
        assert!(net.is_symmetric());
    }

    #[test]
    fn test_cut_value_counts_forward_arcs() {
        let mut net = FlowNetwork::<i64>::new(3);
        net.set_cap(0, 1, 5).expect("cap");
        net.set_cap(1, 0, 7).expect("cap");
        net.set_cap(0, 2, 2).expect("cap");
        let colors = [Color::Black, Color::White, Color::White];
        assert_eq!(net.cut_value(&colors), 7);
    }

    #[test]
    fn test_orient_black() {
        let mut r = MaxFlowResult::<i64> {
            source: 0,
            sink: 2,
            maxflow: 1,
            colors: vec![Color::Black, Color::Black, Color::White],
        };
        r.orient_black(2);
        assert_eq!(r.colors, vec![Color::White, Color::White, Color::Black]);
        assert_eq!((r.source, r.sink), (2, 0));
        assert_eq!(r.black_side().collect::<Vec<_>>(), vec![2]);
    }
}
