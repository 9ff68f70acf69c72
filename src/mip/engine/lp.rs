//! LP relaxations through `minilp`.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use super::model::{Model, Row, Sense};
use crate::error::{Error, Result};

/// Result of one LP relaxation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    Optimal { obj: f64, point: Vec<f64> },
    Infeasible,
    Unbounded,
}

fn comparison(sense: Sense) -> ComparisonOp {
    match sense {
        Sense::Le => ComparisonOp::Le,
        Sense::Eq => ComparisonOp::Eq,
        Sense::Ge => ComparisonOp::Ge,
    }
}

/// Solves the relaxation of `model` with column bounds `bounds` and the
/// model rows plus `extra` rows.
pub(crate) fn solve_relaxation<'r>(
    model: &'r Model,
    bounds: &[(f64, f64)],
    extra: impl IntoIterator<Item = &'r Row>,
) -> Result<LpOutcome> {
    debug_assert_eq!(bounds.len(), model.num_cols());
    if bounds.iter().any(|(lb, ub)| lb > ub) {
        return Ok(LpOutcome::Infeasible);
    }

    let mut problem = Problem::new(OptimizationDirection::Minimize);
    let vars: Vec<_> = model
        .cols()
        .iter()
        .zip(bounds)
        .map(|(col, &(lb, ub))| problem.add_var(col.obj, (lb, ub)))
        .collect();

    for row in model.rows().iter().chain(extra) {
        if row.coefs.is_empty() {
            if row.violation(&[]) > 0.0 {
                return Ok(LpOutcome::Infeasible);
            }
            continue;
        }
        let mut expr = LinearExpr::empty();
        for &(col, coef) in &row.coefs {
            expr.add(vars[col], coef);
        }
        problem.add_constraint(expr, comparison(row.sense), row.rhs);
    }

    match problem.solve() {
        Ok(solution) => Ok(LpOutcome::Optimal {
            obj: solution.objective(),
            point: vars.iter().map(|v| solution[*v]).collect(),
        }),
        Err(minilp::Error::Infeasible) => Ok(LpOutcome::Infeasible),
        Err(minilp::Error::Unbounded) => Ok(LpOutcome::Unbounded),
        #[allow(unreachable_patterns)]
        Err(e) => Err(Error::Lp(format!("{e:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::engine::model::ColKind;

    #[test]
    fn test_small_lp() {
        // min -x - y  s.t. x + y <= 1.5, 0 <= x, y <= 1
        let mut m = Model::new();
        let x = m.add_col("x", -1.0, 0.0, 1.0, ColKind::Binary);
        let y = m.add_col("y", -1.0, 0.0, 1.0, ColKind::Binary);
        m.add_row(Row::new(Sense::Le, 1.5).with_coef(x, 1.0).with_coef(y, 1.0));
        let bounds = vec![(0.0, 1.0); 2];
        match solve_relaxation(&m, &bounds, []).expect("lp") {
            LpOutcome::Optimal { obj, point } => {
                assert!((obj + 1.5).abs() < 1e-9);
                assert!((point[0] + point[1] - 1.5).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_extra_rows_and_fixings() {
        let mut m = Model::new();
        let x = m.add_col("x", -1.0, 0.0, 1.0, ColKind::Binary);
        let cut = Row::new(Sense::Ge, 2.0).with_coef(x, 1.0);
        let bounds = vec![(0.0, 1.0)];
        assert_eq!(
            solve_relaxation(&m, &bounds, [&cut]).expect("lp"),
            LpOutcome::Infeasible
        );
        assert_eq!(
            solve_relaxation(&m, &[(1.0, 0.0)], []).expect("lp"),
            LpOutcome::Infeasible
        );
    }

    #[test]
    fn test_model_rows_chain_with_borrowed_pool() {
        let mut m = Model::new();
        let x = m.add_col("x", -1.0, 0.0, 1.0, ColKind::Binary);
        let y = m.add_col("y", -1.0, 0.0, 1.0, ColKind::Binary);
        m.add_row(Row::new(Sense::Le, 1.5).with_coef(x, 1.0).with_coef(y, 1.0));
        let pool = vec![Row::new(Sense::Le, 0.25).with_coef(x, 1.0)];
        let local = [Row::new(Sense::Le, 0.5).with_coef(y, 1.0)];
        let rows = pool.iter().chain(local.iter());
        match solve_relaxation(&m, &[(0.0, 1.0); 2], rows).expect("lp") {
            LpOutcome::Optimal { obj, point } => {
                assert!((obj + 0.75).abs() < 1e-9);
                assert!((point[0] - 0.25).abs() < 1e-9);
                assert!((point[1] - 0.5).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
