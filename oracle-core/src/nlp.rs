//! Unconstrained smooth minimization (BFGS with Armijo backtracking).

use std::fmt;

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use crate::error::{OracleError, OracleResult};

/// A smooth function with an analytic gradient.
pub trait Objective {
    /// Number of variables.
    fn dim(&self) -> usize;

    fn value(&self, x: &DVector<f64>) -> f64;

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64>;
}

/// [`Objective`] built from a pair of closures.
pub struct FnObjective<F, G> {
    dim: usize,
    value: F,
    gradient: G,
}

impl<F, G> FnObjective<F, G>
where
    F: Fn(&DVector<f64>) -> f64,
    G: Fn(&DVector<f64>) -> DVector<f64>,
{
    pub fn new(dim: usize, value: F, gradient: G) -> Self {
        Self { dim, value, gradient }
    }
}

impl<F, G> Objective for FnObjective<F, G>
where
    F: Fn(&DVector<f64>) -> f64,
    G: Fn(&DVector<f64>) -> DVector<f64>,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        (self.value)(x)
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        (self.gradient)(x)
    }
}

/// Termination status of [`minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NlpStatus {
    /// Gradient norm below tolerance
    Optimal,

    /// Iteration budget exhausted
    MaxIterations,

    /// Backtracking could not find sufficient decrease
    LineSearchFailed,
}

impl fmt::Display for NlpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NlpStatus::Optimal => write!(f, "Optimal"),
            NlpStatus::MaxIterations => write!(f, "MaxIterations"),
            NlpStatus::LineSearchFailed => write!(f, "LineSearchFailed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NlpSettings {
    pub max_iterations: usize,

    /// Stop when the infinity norm of the gradient falls below this.
    pub grad_tol: f64,

    /// Sufficient decrease constant of the Armijo condition.
    pub armijo_c1: f64,

    /// Step shrink factor per backtracking iteration.
    pub backtrack: f64,

    /// Smallest step tried before the line search gives up.
    pub min_step: f64,
}

impl Default for NlpSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            grad_tol: 1e-8,
            armijo_c1: 1e-4,
            backtrack: 0.5,
            min_step: 1e-16,
        }
    }
}

impl NlpSettings {
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_grad_tol(mut self, tol: f64) -> Self {
        self.grad_tol = tol;
        self
    }
}

/// Result of [`minimize`].
#[derive(Debug, Clone)]
pub struct NlpSolution {
    pub status: NlpStatus,
    pub x: Vec<f64>,
    pub obj_val: f64,
    pub grad_norm: f64,
    pub iterations: usize,
}

/// Minimize `f` from `x0` with BFGS.
///
/// The inverse Hessian starts at the identity, is rescaled by `s'y / y'y`
/// after the first step, and skips the update whenever `s'y <= 0`.
pub fn minimize<F: Objective>(f: &F, x0: &[f64], settings: &NlpSettings) -> OracleResult<NlpSolution> {
    let n = f.dim();
    if x0.len() != n {
        return Err(OracleError::DimensionMismatch(format!(
            "starting point has {} entries, objective has {} variables",
            x0.len(),
            n
        )));
    }

    let mut x = DVector::from_column_slice(x0);
    let mut fx = f.value(&x);
    if !fx.is_finite() {
        return Err(OracleError::Numerical(format!("objective is {} at the starting point", fx)));
    }
    let mut g = f.gradient(&x);
    let mut h = DMatrix::<f64>::identity(n, n);
    let mut status = NlpStatus::MaxIterations;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        if g.amax() <= settings.grad_tol {
            status = NlpStatus::Optimal;
            break;
        }

        let mut p = -(&h * &g);
        let mut slope = g.dot(&p);
        if slope >= 0.0 {
            // Not a descent direction: restart from steepest descent
            h.fill_with_identity();
            p = -g.clone();
            slope = g.dot(&p);
        }

        // Armijo backtracking
        let mut t = 1.0;
        let (x_new, f_new) = loop {
            let candidate = &x + &p * t;
            let fc = f.value(&candidate);
            if fc.is_finite() && fc <= fx + settings.armijo_c1 * t * slope {
                break (candidate, fc);
            }
            t *= settings.backtrack;
            if t < settings.min_step {
                debug!("line search failed at iteration {} (f = {:.6e})", iterations, fx);
                return Ok(NlpSolution {
                    status: NlpStatus::LineSearchFailed,
                    x: x.iter().copied().collect(),
                    obj_val: fx,
                    grad_norm: g.amax(),
                    iterations,
                });
            }
        };

        let g_new = f.gradient(&x_new);
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > 0.0 {
            if iterations == 0 {
                h *= sy / y.dot(&y);
            }
            let rho = 1.0 / sy;
            let hy = &h * &y;
            let yhy = y.dot(&hy);
            h += (&s * s.transpose()) * (rho * (1.0 + rho * yhy))
                - (&s * hy.transpose() + &hy * s.transpose()) * rho;
        }

        trace!("iter {}: f = {:.6e}, step = {:.3e}, |g| = {:.3e}", iterations, f_new, t, g_new.amax());
        x = x_new;
        fx = f_new;
        g = g_new;
        iterations += 1;
    }

    if status == NlpStatus::MaxIterations && g.amax() <= settings.grad_tol {
        status = NlpStatus::Optimal;
    }

    Ok(NlpSolution {
        status,
        x: x.iter().copied().collect(),
        obj_val: fx,
        grad_norm: g.amax(),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rosenbrock() -> FnObjective<impl Fn(&DVector<f64>) -> f64, impl Fn(&DVector<f64>) -> DVector<f64>> {
        FnObjective::new(
            2,
            |x: &DVector<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            |x: &DVector<f64>| {
                DVector::from_vec(vec![
                    -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
                    200.0 * (x[1] - x[0] * x[0]),
                ])
            },
        )
    }

    #[test]
    fn test_separable_quadratic() {
        // (x - 3)^2 + 10 (y + 1)^2
        let f = FnObjective::new(
            2,
            |x: &DVector<f64>| (x[0] - 3.0).powi(2) + 10.0 * (x[1] + 1.0).powi(2),
            |x: &DVector<f64>| DVector::from_vec(vec![2.0 * (x[0] - 3.0), 20.0 * (x[1] + 1.0)]),
        );
        let sol = minimize(&f, &[0.0, 0.0], &NlpSettings::default()).unwrap();
        assert_eq!(sol.status, NlpStatus::Optimal);
        assert_abs_diff_eq!(sol.x[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sol.x[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rosenbrock() {
        let sol = minimize(&rosenbrock(), &[-1.2, 1.0], &NlpSettings::default()).unwrap();
        assert_eq!(sol.status, NlpStatus::Optimal);
        assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(sol.x[1], 1.0, epsilon = 1e-5);
        assert!(sol.obj_val < 1e-10);
    }

    #[test]
    fn test_iteration_budget() {
        let settings = NlpSettings::default().with_max_iterations(2);
        let sol = minimize(&rosenbrock(), &[-1.2, 1.0], &settings).unwrap();
        assert_eq!(sol.status, NlpStatus::MaxIterations);
        assert_eq!(sol.iterations, 2);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = minimize(&rosenbrock(), &[0.0], &NlpSettings::default()).unwrap_err();
        assert!(matches!(err, OracleError::DimensionMismatch(_)));
    }
}
