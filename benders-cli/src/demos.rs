//! Built-in models for the `diagnose` and `nonlinear` subcommands.

use nalgebra::DVector;
use oracle_core::nlp::Objective;
use oracle_core::{ConstraintSense, LinearModel, ObjectiveSense, OracleResult, VarType};

/// Production plan whose capacity bound contradicts its demand floor.
///
/// ```text
/// maximize  3 x + 2 y
///   cap:    x + y <= 12
///   demand: x     >= 10
///   mix:    y     >= 1
///   x <= 8
/// ```
///
/// The conflict is `{demand, x <= 8}`.
pub fn infeasible_plan() -> OracleResult<LinearModel> {
    let mut model = LinearModel::new("infeasible_plan");
    let x = model.add_var("x", 0.0, 8.0, VarType::Continuous);
    let y = model.add_var("y", 0.0, f64::INFINITY, VarType::Continuous);
    model.add_constraint("cap", [(x, 1.0), (y, 1.0)], ConstraintSense::LessEqual, 12.0)?;
    model.add_constraint("demand", [(x, 1.0)], ConstraintSense::GreaterEqual, 10.0)?;
    model.add_constraint("mix", [(y, 1.0)], ConstraintSense::GreaterEqual, 1.0)?;
    model.set_objective(ObjectiveSense::Maximize, [(x, 3.0), (y, 2.0)], 0.0)?;
    Ok(model)
}

/// Chained Rosenbrock function `sum 100 (x_{i+1} - x_i^2)^2 + (1 - x_i)^2`.
///
/// Minimum 0 at `x = (1, ..., 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Rosenbrock {
    pub dim: usize,
}

impl Objective for Rosenbrock {
    fn dim(&self) -> usize {
        self.dim
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        (0..self.dim.saturating_sub(1))
            .map(|i| 100.0 * (x[i + 1] - x[i] * x[i]).powi(2) + (1.0 - x[i]).powi(2))
            .sum()
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut g = DVector::zeros(self.dim);
        for i in 0..self.dim.saturating_sub(1) {
            let r = x[i + 1] - x[i] * x[i];
            g[i] += -400.0 * x[i] * r - 2.0 * (1.0 - x[i]);
            g[i + 1] += 200.0 * r;
        }
        g
    }
}

/// Classic starting point `(-1.2, 1, -1.2, 1, ...)`.
pub fn rosenbrock_start(dim: usize) -> Vec<f64> {
    (0..dim).map(|i| if i % 2 == 0 { -1.2 } else { 1.0 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::{compute_iis, BoundSide, OracleSettings, SolveStatus};

    #[test]
    fn test_plan_conflict() {
        let model = infeasible_plan().unwrap();
        let settings = OracleSettings::default();
        assert_eq!(oracle_core::solve(&model, &settings).unwrap().status, SolveStatus::Infeasible);

        let iis = compute_iis(&model, &settings).unwrap();
        let names: Vec<_> = iis
            .constraints
            .iter()
            .map(|&c| model.constraint(c).name.as_str())
            .collect();
        assert_eq!(names, vec!["demand"]);
        assert_eq!(iis.bounds.len(), 1);
        assert_eq!(iis.bounds[0].1, BoundSide::Upper);
    }

    #[test]
    fn test_rosenbrock_gradient_vanishes_at_ones() {
        let f = Rosenbrock { dim: 4 };
        let ones = DVector::from_element(4, 1.0);
        assert_eq!(f.value(&ones), 0.0);
        assert!(f.gradient(&ones).norm() < 1e-12);
        assert_eq!(rosenbrock_start(3), vec![-1.2, 1.0, -1.2]);
    }
}
