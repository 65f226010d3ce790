//! Dense two-phase primal simplex.
//!
//! The model is converted to standard form
//!
//! ```text
//! minimize    c^T x'
//! subject to  A x' = b,  b >= 0
//!             x' >= 0
//! ```
//!
//! by shifting variables with a finite lower bound, reflecting variables with
//! only a finite upper bound and splitting free variables. Finite upper
//! bounds of shifted variables become explicit rows. Every row gets one
//! artificial column; those columns stay in the tableau through phase two so
//! that `B^{-1}` (and therefore the duals) can be read off the objective row.

use log::trace;
use nalgebra::DMatrix;

use crate::error::{OracleError, OracleResult};
use crate::model::{ConstraintSense, LinearModel, ObjectiveSense, VarId};
use crate::settings::OracleSettings;
use crate::solution::{Solution, SolveInfo};

/// How a model variable is recovered from standard-form columns.
#[derive(Debug, Clone, Copy)]
enum ColumnMap {
    /// x = lower + x'
    Shifted { col: usize, lower: f64 },
    /// x = upper - x'
    Reflected { col: usize, upper: f64 },
    /// x = x+ - x-
    Split { pos: usize, neg: usize },
}

/// Where a standard-form row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOrigin {
    Constraint(usize),
    UpperBound(usize),
}

/// Standard-form data derived from a [`LinearModel`].
struct StandardForm {
    a: DMatrix<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    /// +1 or -1 per row: rows with negative rhs are negated.
    row_sign: Vec<f64>,
    row_origin: Vec<RowOrigin>,
    /// Model variable owning each structural column.
    col_var: Vec<usize>,
    var_map: Vec<ColumnMap>,
    /// +1 for minimization, -1 for maximization.
    obj_scale: f64,
}

impl StandardForm {
    fn build(model: &LinearModel) -> Self {
        let obj_scale = match model.objective().sense {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };

        let mut var_map = Vec::with_capacity(model.num_vars());
        let mut col_var = Vec::new();
        let mut bound_rows = Vec::new();
        for (j, v) in model.variables().iter().enumerate() {
            let col = col_var.len();
            if v.lower.is_finite() {
                col_var.push(j);
                var_map.push(ColumnMap::Shifted { col, lower: v.lower });
                if v.upper.is_finite() {
                    bound_rows.push((j, col, v.upper - v.lower));
                }
            } else if v.upper.is_finite() {
                col_var.push(j);
                var_map.push(ColumnMap::Reflected { col, upper: v.upper });
            } else {
                col_var.push(j);
                col_var.push(j);
                var_map.push(ColumnMap::Split { pos: col, neg: col + 1 });
            }
        }
        let n_struct = col_var.len();

        // Row data: structural coefficients, rhs, slack sign
        let mut rows: Vec<(Vec<f64>, f64, Option<f64>, RowOrigin)> = Vec::new();
        for (i, con) in model.constraints().iter().enumerate() {
            let mut coefs = vec![0.0; n_struct];
            let mut shift = 0.0;
            for (j, &a) in con.coefs.iter() {
                match var_map[j] {
                    ColumnMap::Shifted { col, lower } => {
                        coefs[col] += a;
                        shift += a * lower;
                    }
                    ColumnMap::Reflected { col, upper } => {
                        coefs[col] -= a;
                        shift += a * upper;
                    }
                    ColumnMap::Split { pos, neg } => {
                        coefs[pos] += a;
                        coefs[neg] -= a;
                    }
                }
            }
            let slack = match con.sense {
                ConstraintSense::LessEqual => Some(1.0),
                ConstraintSense::GreaterEqual => Some(-1.0),
                ConstraintSense::Equal => None,
            };
            rows.push((coefs, con.rhs - shift, slack, RowOrigin::Constraint(i)));
        }
        for (j, col, width) in bound_rows {
            let mut coefs = vec![0.0; n_struct];
            coefs[col] = 1.0;
            rows.push((coefs, width, Some(1.0), RowOrigin::UpperBound(j)));
        }

        let m = rows.len();
        let n_slack = rows.iter().filter(|r| r.2.is_some()).count();
        let n_real = n_struct + n_slack;

        let mut a = DMatrix::zeros(m, n_real);
        let mut b = Vec::with_capacity(m);
        let mut row_sign = Vec::with_capacity(m);
        let mut row_origin = Vec::with_capacity(m);
        let mut slack_col = n_struct;
        for (i, (coefs, rhs, slack, origin)) in rows.into_iter().enumerate() {
            let sign = if rhs < 0.0 { -1.0 } else { 1.0 };
            for (col, coef) in coefs.into_iter().enumerate() {
                a[(i, col)] = sign * coef;
            }
            if let Some(s) = slack {
                a[(i, slack_col)] = sign * s;
                slack_col += 1;
            }
            b.push(sign * rhs);
            row_sign.push(sign);
            row_origin.push(origin);
        }

        let mut c = vec![0.0; n_real];
        for (j, &cj) in model.objective().coefs.iter().enumerate() {
            let cj = obj_scale * cj;
            match var_map[j] {
                ColumnMap::Shifted { col, .. } => c[col] += cj,
                ColumnMap::Reflected { col, .. } => c[col] -= cj,
                ColumnMap::Split { pos, neg } => {
                    c[pos] += cj;
                    c[neg] -= cj;
                }
            }
        }

        Self {
            a,
            b,
            c,
            row_sign,
            row_origin,
            col_var,
            var_map,
            obj_scale,
        }
    }

    fn num_rows(&self) -> usize {
        self.b.len()
    }

    fn num_real(&self) -> usize {
        self.c.len()
    }

    fn recover_x(&self, xs: &[f64]) -> Vec<f64> {
        self.var_map
            .iter()
            .map(|map| match *map {
                ColumnMap::Shifted { col, lower } => lower + xs[col],
                ColumnMap::Reflected { col, upper } => upper - xs[col],
                ColumnMap::Split { pos, neg } => xs[pos] - xs[neg],
            })
            .collect()
    }
}

/// Outcome of one simplex phase.
enum PhaseOutcome {
    Optimal,
    /// Entering column with no blocking row.
    Unbounded(usize),
}

/// Dense tableau: `m` constraint rows plus the objective row; real columns,
/// then one artificial column per row, then the rhs.
struct Tableau {
    t: DMatrix<f64>,
    basis: Vec<usize>,
    m: usize,
    n_real: usize,
    pivots: usize,
}

impl Tableau {
    fn new(sf: &StandardForm) -> Self {
        let m = sf.num_rows();
        let n_real = sf.num_real();
        let cols = n_real + m + 1;
        let mut t = DMatrix::zeros(m + 1, cols);
        for i in 0..m {
            for j in 0..n_real {
                t[(i, j)] = sf.a[(i, j)];
            }
            t[(i, n_real + i)] = 1.0;
            t[(i, cols - 1)] = sf.b[i];
        }
        Self {
            t,
            basis: (n_real..n_real + m).collect(),
            m,
            n_real,
            pivots: 0,
        }
    }

    fn rhs_col(&self) -> usize {
        self.t.ncols() - 1
    }

    fn obj_row(&self) -> usize {
        self.m
    }

    /// Pivot on `(r, e)`: normalize row `r` and eliminate column `e` elsewhere.
    fn pivot(&mut self, r: usize, e: usize) {
        let cols = self.t.ncols();
        let piv = self.t[(r, e)];
        for j in 0..cols {
            self.t[(r, j)] /= piv;
        }
        let pivot_row: Vec<f64> = (0..cols).map(|j| self.t[(r, j)]).collect();
        for i in 0..=self.m {
            if i == r {
                continue;
            }
            let factor = self.t[(i, e)];
            if factor == 0.0 {
                continue;
            }
            for (j, &p) in pivot_row.iter().enumerate() {
                self.t[(i, j)] -= factor * p;
            }
            self.t[(i, e)] = 0.0;
        }
        self.basis[r] = e;
        self.pivots += 1;
    }

    /// Set the objective row to reduced costs for column costs `cost`
    /// (artificial columns included) under the current basis.
    fn price_out(&mut self, cost: &[f64]) {
        let obj = self.obj_row();
        let rhs = self.rhs_col();
        for j in 0..rhs {
            self.t[(obj, j)] = cost[j];
        }
        self.t[(obj, rhs)] = 0.0;
        for i in 0..self.m {
            let cb = cost[self.basis[i]];
            if cb == 0.0 {
                continue;
            }
            for j in 0..=rhs {
                self.t[(obj, j)] -= cb * self.t[(i, j)];
            }
        }
    }

    fn choose_entering(&self, bland: bool, tol: f64) -> Option<usize> {
        let obj = self.obj_row();
        let candidates = (0..self.n_real).filter(|&j| self.t[(obj, j)] < -tol);
        if bland {
            return candidates.take(1).next();
        }
        candidates.min_by(|&a, &b| {
            self.t[(obj, a)]
                .partial_cmp(&self.t[(obj, b)])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Minimum ratio test; ties go to the smallest basic index.
    fn choose_leaving(&self, e: usize, tol_pivot: f64) -> Option<(usize, f64)> {
        let rhs = self.rhs_col();
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.m {
            let a = self.t[(i, e)];
            if a <= tol_pivot {
                continue;
            }
            let ratio = self.t[(i, rhs)].max(0.0) / a;
            best = match best {
                None => Some((i, ratio)),
                Some((r, best_ratio)) => {
                    if ratio < best_ratio - 1e-12
                        || (ratio <= best_ratio + 1e-12 && self.basis[i] < self.basis[r])
                    {
                        Some((i, ratio))
                    } else {
                        Some((r, best_ratio))
                    }
                }
            };
        }
        best
    }

    fn run(&mut self, settings: &OracleSettings) -> OracleResult<PhaseOutcome> {
        let mut degenerate_streak = 0;
        loop {
            let bland = degenerate_streak >= settings.bland_after;
            let Some(e) = self.choose_entering(bland, settings.tol_opt) else {
                return Ok(PhaseOutcome::Optimal);
            };
            let Some((r, ratio)) = self.choose_leaving(e, settings.tol_pivot) else {
                return Ok(PhaseOutcome::Unbounded(e));
            };
            if self.pivots >= settings.max_pivots {
                return Err(OracleError::PivotLimit(settings.max_pivots));
            }
            if ratio <= settings.tol_feas {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            trace!("pivot {}: enter {} leave row {} (ratio {:.3e})", self.pivots, e, r, ratio);
            self.pivot(r, e);
        }
    }

    /// Pivot basic artificials out of the basis where a real column allows it.
    /// Rows without such a column are redundant and keep their artificial at zero.
    fn drive_out_artificials(&mut self, tol_pivot: f64) {
        let rhs = self.rhs_col();
        for i in 0..self.m {
            if self.basis[i] < self.n_real {
                continue;
            }
            self.t[(i, rhs)] = 0.0;
            let col = (0..self.n_real)
                .filter(|&j| self.t[(i, j)].abs() > tol_pivot)
                .max_by(|&a, &b| {
                    self.t[(i, a)]
                        .abs()
                        .partial_cmp(&self.t[(i, b)].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(j) = col {
                self.pivot(i, j);
            }
        }
    }

    fn basic_values(&self) -> Vec<f64> {
        let rhs = self.rhs_col();
        let mut xs = vec![0.0; self.n_real];
        for i in 0..self.m {
            if self.basis[i] < self.n_real {
                xs[self.basis[i]] = self.t[(i, rhs)].max(0.0);
            }
        }
        xs
    }

    /// Row multipliers `y_i = cost(art_i) - reduced_cost(art_i)`.
    fn multipliers(&self, art_cost: f64) -> Vec<f64> {
        let obj = self.obj_row();
        (0..self.m)
            .map(|i| art_cost - self.t[(obj, self.n_real + i)])
            .collect()
    }
}

/// Solve the continuous relaxation of `model`. Integrality flags are ignored.
pub fn solve_lp(model: &LinearModel, settings: &OracleSettings) -> OracleResult<Solution> {
    model.validate()?;

    let sf = StandardForm::build(model);
    let m = sf.num_rows();
    let n_real = sf.num_real();
    let mut tab = Tableau::new(&sf);

    // Phase one: minimize the sum of artificials
    let mut phase1_cost = vec![0.0; n_real + m];
    for cost in phase1_cost.iter_mut().skip(n_real) {
        *cost = 1.0;
    }
    tab.price_out(&phase1_cost);
    if let PhaseOutcome::Unbounded(_) = tab.run(settings)? {
        return Err(OracleError::Numerical("phase one reported an unbounded ray".to_string()));
    }

    let infeasibility = -tab.t[(tab.obj_row(), tab.rhs_col())];
    let b_scale = 1.0 + sf.b.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if infeasibility > settings.tol_feas * b_scale {
        let y = tab.multipliers(1.0);
        let mut farkas = vec![0.0; model.num_constraints()];
        for (i, origin) in sf.row_origin.iter().enumerate() {
            if let RowOrigin::Constraint(k) = *origin {
                farkas[k] = sf.row_sign[i] * y[i];
            }
        }
        trace!("{}: infeasible, phase-one residual {:.3e}", model.name(), infeasibility);
        return Ok(Solution::infeasible(
            Some(farkas),
            infeasibility,
            SolveInfo {
                pivots: tab.pivots,
                ..Default::default()
            },
        ));
    }

    tab.drive_out_artificials(settings.tol_pivot);

    // Phase two: original costs, artificial columns barred from entering
    let mut phase2_cost = sf.c.clone();
    phase2_cost.resize(n_real + m, 0.0);
    tab.price_out(&phase2_cost);
    let info = |tab: &Tableau| SolveInfo {
        pivots: tab.pivots,
        ..Default::default()
    };

    match tab.run(settings)? {
        PhaseOutcome::Unbounded(e) => {
            let var = unbounded_var(&tab, &sf, e);
            trace!("{}: unbounded along column {}", model.name(), e);
            Ok(Solution::unbounded(var, info(&tab)))
        }
        PhaseOutcome::Optimal => {
            let xs = tab.basic_values();
            let x = sf.recover_x(&xs);
            let y = tab.multipliers(0.0);
            let mut duals = vec![0.0; model.num_constraints()];
            for (i, origin) in sf.row_origin.iter().enumerate() {
                if let RowOrigin::Constraint(k) = *origin {
                    duals[k] = sf.obj_scale * sf.row_sign[i] * y[i];
                }
            }
            let obj_val = model.objective_value(&x);
            Ok(Solution::optimal(x, obj_val, Some(duals), info(&tab)))
        }
    }
}

/// Model variable moving along the unbounded ray entered at column `e`.
fn unbounded_var(tab: &Tableau, sf: &StandardForm, e: usize) -> Option<VarId> {
    let n_struct = sf.col_var.len();
    if e < n_struct {
        return Some(VarId(sf.col_var[e]));
    }
    (0..tab.m)
        .find(|&i| tab.basis[i] < n_struct && tab.t[(i, e)] < 0.0)
        .map(|i| VarId(sf.col_var[tab.basis[i]]))
}
