//! Benders cuts and the append-only cut pool.

use std::fmt;

use log::warn;
use oracle_core::VarId;
use serde::Serialize;

use crate::instance::dot;

/// Kind of a Benders cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CutKind {
    /// `θ >= f_k + λ.(x - x_k)`: underestimates the recourse cost.
    Optimality,

    /// `0 >= f_k + λ.(x - x_k)`: excludes points without recourse.
    Feasibility,
}

impl fmt::Display for CutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutKind::Optimality => write!(f, "optimality"),
            CutKind::Feasibility => write!(f, "feasibility"),
        }
    }
}

/// A Benders cut, kept in its `(f_k, λ, x_k)` form.
///
/// For optimality cuts `f_k` is the subproblem optimum at `x_k`; for
/// feasibility cuts it is the phase-one infeasibility measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cut {
    pub kind: CutKind,

    /// Iteration that produced the cut (1-based).
    pub iteration: usize,

    pub f_k: f64,

    pub lambda: Vec<f64>,

    pub x_k: Vec<f64>,
}

impl Cut {
    pub fn optimality(iteration: usize, f_k: f64, lambda: Vec<f64>, x_k: Vec<f64>) -> Self {
        Self {
            kind: CutKind::Optimality,
            iteration,
            f_k,
            lambda,
            x_k,
        }
    }

    pub fn feasibility(iteration: usize, f_k: f64, lambda: Vec<f64>, x_k: Vec<f64>) -> Self {
        Self {
            kind: CutKind::Feasibility,
            iteration,
            f_k,
            lambda,
            x_k,
        }
    }

    /// Affine value `f_k + λ.(x - x_k)` at `x`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.f_k + dot(&self.lambda, x) - dot(&self.lambda, &self.x_k)
    }

    /// Constant of the folded row `λ.x - θ <= λ.x_k - f_k`.
    pub fn rhs(&self) -> f64 {
        dot(&self.lambda, &self.x_k) - self.f_k
    }

    /// Terms of the folded row over the master's variables.
    pub fn terms(&self, x_vars: &[VarId], theta: VarId) -> Vec<(VarId, f64)> {
        let mut terms: Vec<(VarId, f64)> = x_vars
            .iter()
            .copied()
            .zip(self.lambda.iter().copied())
            .collect();
        if self.kind == CutKind::Optimality {
            terms.push((theta, -1.0));
        }
        terms
    }

    /// Amount by which `(x, θ)` violates the cut (positive means violated).
    pub fn violation(&self, x: &[f64], theta: f64) -> f64 {
        match self.kind {
            CutKind::Optimality => self.evaluate(x) - theta,
            CutKind::Feasibility => self.evaluate(x),
        }
    }

    /// Finite data of matching dimensions.
    pub fn is_valid(&self) -> bool {
        self.lambda.len() == self.x_k.len()
            && self.f_k.is_finite()
            && self.lambda.iter().chain(&self.x_k).all(|v| v.is_finite())
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lhs = match self.kind {
            CutKind::Optimality => "theta",
            CutKind::Feasibility => "0",
        };
        write!(f, "{} >= {:.6}", lhs, self.f_k)?;
        for (j, (l, xk)) in self.lambda.iter().zip(&self.x_k).enumerate() {
            if *l == 0.0 {
                continue;
            }
            let sign = if *l < 0.0 { '-' } else { '+' };
            write!(f, " {} {:.6} (x{} - {})", sign, l.abs(), j, xk)?;
        }
        Ok(())
    }
}

/// Ordered, append-only collection of the cuts added during a run.
#[derive(Debug, Clone, Default)]
pub struct CutPool {
    cuts: Vec<Cut>,
    duplicates: usize,
}

impl CutPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cut. Returns true when it duplicates an earlier cut, which
    /// means the master returned a point that was already cut off.
    pub fn push(&mut self, cut: Cut) -> bool {
        let duplicate = self.cuts.iter().any(|c| is_duplicate(c, &cut));
        if duplicate {
            self.duplicates += 1;
            warn!(
                "iteration {}: {} cut duplicates an earlier cut (x_k = {:?})",
                cut.iteration, cut.kind, cut.x_k
            );
        }
        self.cuts.push(cut);
        duplicate
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter()
    }

    pub fn as_slice(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn count(&self, kind: CutKind) -> usize {
        self.cuts.iter().filter(|c| c.kind == kind).count()
    }

    /// Number of cuts that duplicated an earlier one.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_vec(self) -> Vec<Cut> {
        self.cuts
    }
}

/// Same kind, parallel coefficients and matching normalized constant.
fn is_duplicate(a: &Cut, b: &Cut) -> bool {
    if a.kind != b.kind || a.lambda.len() != b.lambda.len() {
        return false;
    }
    // Optimality rows carry the -1 on θ, so include it in the normal
    let extra = if a.kind == CutKind::Optimality { 1.0 } else { 0.0 };
    let a_norm = (dot(&a.lambda, &a.lambda) + extra).sqrt();
    let b_norm = (dot(&b.lambda, &b.lambda) + extra).sqrt();
    if a_norm < 1e-10 || b_norm < 1e-10 {
        return a_norm < 1e-10 && b_norm < 1e-10 && (a.rhs() - b.rhs()).abs() < 1e-8;
    }
    let cos_angle = (dot(&a.lambda, &b.lambda) + extra) / (a_norm * b_norm);
    cos_angle > 0.9999 && (a.rhs() / a_norm - b.rhs() / b_norm).abs() < 1e-8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folded_row_matches_affine_form() {
        let cut = Cut::optimality(1, 7.5, vec![-2.0, 0.5], vec![1.0, 3.0]);
        // λ.x_k - f_k = (-2 + 1.5) - 7.5
        assert!((cut.rhs() + 8.0).abs() < 1e-12);
        assert_eq!(cut.evaluate(&[1.0, 3.0]), 7.5);

        // Folded row λ.x - θ <= rhs holds exactly when θ >= evaluate(x)
        let x = [4.0, 0.0];
        let theta = cut.evaluate(&x);
        let lhs = dot(&cut.lambda, &x) - theta;
        assert!((lhs - cut.rhs()).abs() < 1e-12);
        assert!(cut.violation(&x, theta).abs() < 1e-12);
        assert!(cut.violation(&x, theta - 1.0) > 0.0);
    }

    #[test]
    fn test_terms_include_theta_only_for_optimality() {
        let x_vars = [VarId(0), VarId(1)];
        let theta = VarId(2);
        let opt = Cut::optimality(1, 1.0, vec![1.0, 2.0], vec![0.0, 0.0]);
        let feas = Cut::feasibility(1, 1.0, vec![1.0, 2.0], vec![0.0, 0.0]);
        assert_eq!(opt.terms(&x_vars, theta).len(), 3);
        assert_eq!(feas.terms(&x_vars, theta), vec![(VarId(0), 1.0), (VarId(1), 2.0)]);
    }

    #[test]
    fn test_pool_flags_duplicates() {
        let mut pool = CutPool::new();
        assert!(!pool.push(Cut::optimality(1, 3.0, vec![1.0, -1.0], vec![0.0, 0.0])));
        // Same row from a different anchor point: 3 + (x0 - 1) - (x1 - 1) == 3 + x0 - x1
        assert!(pool.push(Cut::optimality(2, 3.0, vec![1.0, -1.0], vec![1.0, 1.0])));
        assert!(!pool.push(Cut::optimality(3, 4.0, vec![1.0, -1.0], vec![0.0, 0.0])));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.duplicates(), 1);
        assert_eq!(pool.count(CutKind::Optimality), 3);
    }

    #[test]
    fn test_display() {
        let cut = Cut::feasibility(2, 1.0, vec![-1.0], vec![0.0]);
        assert_eq!(cut.to_string(), "0 >= 1.000000 - 1.000000 (x0 - 0)");
    }
}
