//! Columns, rows and linear constraints.

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    /// `lhs ≤ rhs`
    Le,
    /// `lhs = rhs`
    Eq,
    /// `lhs ≥ rhs`
    Ge,
}

/// A sparse linear constraint `Σ a_k·x_k  sense  rhs`.
///
/// Used both for model rows and for cuts produced by callbacks.
///
/// # Examples
///
/// ```
/// use u_cptp::mip::engine::{Row, Sense};
///
/// let row = Row::new(Sense::Ge, 1.0).with_coef(0, 1.0).with_coef(1, 1.0);
/// assert_eq!(row.lhs(&[0.25, 0.5]), 0.75);
/// assert!((row.violation(&[0.25, 0.5]) - 0.25).abs() < 1e-12);
/// assert_eq!(row.violation(&[1.0, 1.0]), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub coefs: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
    pub name: String,
}

impl Row {
    pub fn new(sense: Sense, rhs: f64) -> Self {
        Self {
            coefs: Vec::new(),
            sense,
            rhs,
            name: String::new(),
        }
    }

    /// Pre-allocates room for `nnz` coefficients.
    pub fn with_capacity(sense: Sense, rhs: f64, nnz: usize) -> Self {
        Self {
            coefs: Vec::with_capacity(nnz),
            sense,
            rhs,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_coef(mut self, col: usize, coef: f64) -> Self {
        self.coefs.push((col, coef));
        self
    }

    pub fn push(&mut self, col: usize, coef: f64) {
        self.coefs.push((col, coef));
    }

    pub fn nnz(&self) -> usize {
        self.coefs.len()
    }

    /// Left-hand side evaluated at `point`.
    pub fn lhs(&self, point: &[f64]) -> f64 {
        self.coefs.iter().map(|&(c, a)| a * point[c]).sum()
    }

    /// Amount by which `point` violates the row; 0 when satisfied.
    pub fn violation(&self, point: &[f64]) -> f64 {
        let lhs = self.lhs(point);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// Column domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColKind {
    Binary,
    Integer,
    Continuous,
}

impl ColKind {
    pub fn is_integral(self) -> bool {
        !matches!(self, ColKind::Continuous)
    }
}

/// A model column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub obj: f64,
    pub lb: f64,
    pub ub: f64,
    pub kind: ColKind,
}

/// A minimisation model: columns with objective coefficients and bounds, and
/// linear rows.
#[derive(Debug, Clone, Default)]
pub struct Model {
    cols: Vec<Column>,
    rows: Vec<Row>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column and returns its index.
    pub fn add_col(
        &mut self,
        name: impl Into<String>,
        obj: f64,
        lb: f64,
        ub: f64,
        kind: ColKind,
    ) -> usize {
        self.cols.push(Column {
            name: name.into(),
            obj,
            lb,
            ub,
            kind,
        });
        self.cols.len() - 1
    }

    /// Appends a row and returns its index.
    pub fn add_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) {
        self.cols[col].lb = lb;
        self.cols[col].ub = ub;
    }

    pub fn cols(&self) -> &[Column] {
        &self.cols
    }

    pub fn col(&self, col: usize) -> &Column {
        &self.cols[col]
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Objective value of `point`.
    pub fn objective(&self, point: &[f64]) -> f64 {
        self.cols.iter().zip(point).map(|(c, v)| c.obj * v).sum()
    }

    /// `true` if `point` is within bounds and satisfies every row up to `tol`.
    pub fn is_feasible(&self, point: &[f64], tol: f64) -> bool {
        point.len() == self.cols.len()
            && self
                .cols
                .iter()
                .zip(point)
                .all(|(c, v)| *v >= c.lb - tol && *v <= c.ub + tol)
            && self.rows.iter().all(|r| r.violation(point) <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_senses() {
        let p = [1.0, 2.0];
        let le = Row::new(Sense::Le, 2.0).with_coef(0, 1.0).with_coef(1, 1.0);
        let eq = Row::new(Sense::Eq, 2.0).with_coef(1, 1.0);
        assert!((le.violation(&p) - 1.0).abs() < 1e-12);
        assert_eq!(eq.violation(&p), 0.0);
        assert_eq!(eq.nnz(), 1);
    }

    #[test]
    fn test_model_feasibility() {
        let mut m = Model::new();
        let x = m.add_col("x", 1.0, 0.0, 1.0, ColKind::Binary);
        let y = m.add_col("y", -2.0, 0.0, 1.0, ColKind::Binary);
        m.add_row(Row::new(Sense::Le, 1.0).with_coef(x, 1.0).with_coef(y, 1.0));
        assert!(m.is_feasible(&[0.0, 1.0], 1e-9));
        assert!(!m.is_feasible(&[1.0, 1.0], 1e-9));
        assert!(!m.is_feasible(&[0.0, 2.0], 1e-9));
        assert_eq!(m.objective(&[1.0, 1.0]), -1.0);
    }
}
