//! Two-stage MILP instance data.
//!
//! ```text
//! minimize    f.x + c.y
//! subject to  A x + E y <= e
//!             x integer, 0 <= x (<= x_upper)
//!             y >= 0
//! ```

use oracle_core::{ConstraintSense, LinearModel, ObjectiveSense, VarId, VarType};
use serde::{Deserialize, Serialize};

use crate::error::{BendersError, BendersResult};

/// Instance of the two-stage problem. `a` is `r x n`, `e_mat` is `r x m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BendersInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// First-stage (integer) costs.
    pub f: Vec<f64>,

    /// Recourse costs.
    pub c: Vec<f64>,

    /// Right-hand sides.
    pub e: Vec<f64>,

    /// First-stage coefficients.
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,

    /// Recourse coefficients.
    #[serde(rename = "E")]
    pub e_mat: Vec<Vec<f64>>,

    /// Optional upper bounds on `x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_upper: Option<Vec<f64>>,
}

impl BendersInstance {
    /// The small two-variable example used throughout the documentation.
    pub fn worked_example() -> Self {
        Self {
            name: Some("worked_example".to_string()),
            f: vec![1.0, 4.0],
            c: vec![2.0, 3.0],
            e: vec![-2.0, -3.0],
            a: vec![vec![1.0, -3.0], vec![-1.0, -3.0]],
            e_mat: vec![vec![1.0, -2.0], vec![-1.0, -1.0]],
            x_upper: None,
        }
    }

    /// Number of first-stage variables.
    pub fn n(&self) -> usize {
        self.f.len()
    }

    /// Number of recourse variables.
    pub fn m(&self) -> usize {
        self.c.len()
    }

    /// Number of linking rows.
    pub fn rows(&self) -> usize {
        self.e.len()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("benders")
    }

    /// Check dimensions and finiteness.
    pub fn validate(&self) -> BendersResult<()> {
        let (n, m, r) = (self.n(), self.m(), self.rows());
        if n == 0 {
            return Err(BendersError::InvalidInstance("f is empty".to_string()));
        }
        if self.a.len() != r || self.e_mat.len() != r {
            return Err(BendersError::InvalidInstance(format!(
                "A has {} rows and E has {} rows, expected {}",
                self.a.len(),
                self.e_mat.len(),
                r
            )));
        }
        for (i, (a_row, e_row)) in self.a.iter().zip(&self.e_mat).enumerate() {
            if a_row.len() != n {
                return Err(BendersError::InvalidInstance(format!(
                    "A row {} has {} entries, expected {}",
                    i,
                    a_row.len(),
                    n
                )));
            }
            if e_row.len() != m {
                return Err(BendersError::InvalidInstance(format!(
                    "E row {} has {} entries, expected {}",
                    i,
                    e_row.len(),
                    m
                )));
            }
        }
        if let Some(ub) = &self.x_upper {
            if ub.len() != n {
                return Err(BendersError::InvalidInstance(format!(
                    "x_upper has {} entries, expected {}",
                    ub.len(),
                    n
                )));
            }
            if ub.iter().any(|u| u.is_nan() || *u < 0.0) {
                return Err(BendersError::InvalidInstance(
                    "x_upper must be nonnegative".to_string(),
                ));
            }
        }
        let finite = self
            .f
            .iter()
            .chain(&self.c)
            .chain(&self.e)
            .chain(self.a.iter().flatten())
            .chain(self.e_mat.iter().flatten())
            .all(|v| v.is_finite());
        if !finite {
            return Err(BendersError::InvalidInstance("non-finite coefficient".to_string()));
        }
        Ok(())
    }

    /// Upper bound of `x_j` (`+inf` when none is given).
    pub fn x_upper_bound(&self, j: usize) -> f64 {
        self.x_upper.as_ref().map_or(f64::INFINITY, |ub| ub[j])
    }

    /// `f.x + c.y`.
    pub fn objective(&self, x: &[f64], y: &[f64]) -> f64 {
        dot(&self.f, x) + dot(&self.c, y)
    }

    /// True when `(x, y)` satisfies every row, bound and integrality restriction within `tol`.
    pub fn is_feasible(&self, x: &[f64], y: &[f64], tol: f64) -> bool {
        if x.len() != self.n() || y.len() != self.m() {
            return false;
        }
        let rows_ok = self
            .a
            .iter()
            .zip(&self.e_mat)
            .zip(&self.e)
            .all(|((a_row, e_row), &rhs)| dot(a_row, x) + dot(e_row, y) <= rhs + tol);
        let x_ok = x
            .iter()
            .enumerate()
            .all(|(j, &v)| {
                v >= -tol && v <= self.x_upper_bound(j) + tol && (v - v.round()).abs() <= tol
            });
        let y_ok = y.iter().all(|&v| v >= -tol);
        rows_ok && x_ok && y_ok
    }

    /// The undecomposed MILP, used as ground truth.
    ///
    /// Variables are `x_0..x_{n-1}` followed by `y_0..y_{m-1}`.
    pub fn monolithic_model(&self) -> BendersResult<LinearModel> {
        self.validate()?;
        let mut model = LinearModel::new(format!("{}_monolithic", self.name()));
        let x: Vec<VarId> = (0..self.n())
            .map(|j| model.add_var(format!("x{}", j), 0.0, self.x_upper_bound(j), VarType::Integer))
            .collect();
        let y: Vec<VarId> = (0..self.m())
            .map(|j| model.add_var(format!("y{}", j), 0.0, f64::INFINITY, VarType::Continuous))
            .collect();
        for (i, (a_row, e_row)) in self.a.iter().zip(&self.e_mat).enumerate() {
            let terms = x
                .iter()
                .zip(a_row)
                .chain(y.iter().zip(e_row))
                .map(|(&v, &coef)| (v, coef));
            let name = format!("link{}", i);
            model.add_constraint(name, terms, ConstraintSense::LessEqual, self.e[i])?;
        }
        let objective = x
            .iter()
            .zip(&self.f)
            .chain(y.iter().zip(&self.c))
            .map(|(&v, &coef)| (v, coef));
        model.set_objective(ObjectiveSense::Minimize, objective, 0.0)?;
        Ok(model)
    }
}

/// Dot product over the common length.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(ai, bi)| ai * bi).sum()
}
