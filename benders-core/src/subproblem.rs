//! Recourse subproblem with copy variables pinned to the master's point.

use log::trace;
use oracle_core::{
    ConstrId, ConstraintSense, LinearModel, LpOracle, ObjectiveSense, SolveStatus, VarId, VarType,
};

use crate::error::{BendersError, BendersResult, ProblemKind};
use crate::instance::BendersInstance;

/// Outcome of evaluating the recourse at a master point.
#[derive(Debug, Clone, PartialEq)]
pub enum Recourse {
    /// Optimal recourse with cost `objective`; `lambda` are the fixing-row duals.
    Optimal {
        objective: f64,
        y: Vec<f64>,
        lambda: Vec<f64>,
    },

    /// No recourse; `infeasibility` is the phase-one measure and `lambda`
    /// its multipliers on the fixing rows.
    Infeasible { infeasibility: f64, lambda: Vec<f64> },
}

/// Template `min c.y  s.t.  A z + E y <= e,  z_j = x_j` over free `z` and `y >= 0`.
///
/// The template is never mutated; [`SubProblem::fixed_at`] returns a copy
/// with the fixing right-hand sides overwritten.
#[derive(Debug, Clone)]
pub struct SubProblem {
    template: LinearModel,
    y: Vec<VarId>,
    fixing: Vec<ConstrId>,
}

impl SubProblem {
    pub fn new(instance: &BendersInstance) -> BendersResult<Self> {
        instance.validate()?;
        let mut template = LinearModel::new(format!("{}_sub", instance.name()));
        let z: Vec<VarId> = (0..instance.n())
            .map(|j| {
                let name = format!("z{}", j);
                template.add_var(name, f64::NEG_INFINITY, f64::INFINITY, VarType::Continuous)
            })
            .collect();
        let y: Vec<VarId> = (0..instance.m())
            .map(|j| template.add_var(format!("y{}", j), 0.0, f64::INFINITY, VarType::Continuous))
            .collect();

        for (i, (a_row, e_row)) in instance.a.iter().zip(&instance.e_mat).enumerate() {
            let terms = z
                .iter()
                .zip(a_row)
                .chain(y.iter().zip(e_row))
                .map(|(&v, &coef)| (v, coef));
            let name = format!("link{}", i);
            template.add_constraint(name, terms, ConstraintSense::LessEqual, instance.e[i])?;
        }
        let fixing = z
            .iter()
            .enumerate()
            .map(|(j, &v)| {
                let name = format!("fix{}", j);
                template.add_constraint(name, [(v, 1.0)], ConstraintSense::Equal, 0.0)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let objective = y.iter().copied().zip(instance.c.iter().copied());
        template.set_objective(ObjectiveSense::Minimize, objective, 0.0)?;

        Ok(Self { template, y, fixing })
    }

    /// Copy of the template with `z := x_k`.
    pub fn fixed_at(&self, x_k: &[f64]) -> BendersResult<LinearModel> {
        if x_k.len() != self.fixing.len() {
            return Err(BendersError::InvalidInstance(format!(
                "fixing point has {} entries, expected {}",
                x_k.len(),
                self.fixing.len()
            )));
        }
        let mut model = self.template.clone();
        for (&row, &value) in self.fixing.iter().zip(x_k) {
            model.set_rhs(row, value)?;
        }
        Ok(model)
    }

    /// Solve the recourse at `x_k`.
    pub fn evaluate<O: LpOracle>(&self, oracle: &O, x_k: &[f64]) -> BendersResult<Recourse> {
        let model = self.fixed_at(x_k)?;
        let sol = oracle.solve(&model)?;
        trace!("{} at {:?}: {}", model.name(), x_k, sol.status);

        match sol.status {
            SolveStatus::Optimal => {
                let duals = sol.duals.as_deref().unwrap_or(&[]);
                let lambda = self.fixing_multipliers(duals);
                let y = self.y.iter().map(|&v| sol.value(v).unwrap_or(0.0)).collect();
                Ok(Recourse::Optimal {
                    objective: sol.obj_val,
                    y,
                    lambda,
                })
            }
            SolveStatus::Infeasible => {
                let farkas = sol.farkas.as_deref().unwrap_or(&[]);
                let lambda = self.fixing_multipliers(farkas);
                Ok(Recourse::Infeasible {
                    infeasibility: sol.infeasibility,
                    lambda,
                })
            }
            SolveStatus::Unbounded => Err(BendersError::Unbounded {
                problem: ProblemKind::Subproblem,
                variable: sol
                    .unbounded_var
                    .map(|v| model.var(v).name.clone())
                    .unwrap_or_else(|| "<unknown>".to_string()),
            }),
        }
    }

    /// Entries of a per-constraint vector at the fixing rows.
    fn fixing_multipliers(&self, per_row: &[f64]) -> Vec<f64> {
        self.fixing
            .iter()
            .map(|r| per_row.get(r.0).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn template(&self) -> &LinearModel {
        &self.template
    }

    pub fn fixing_rows(&self) -> &[ConstrId] {
        &self.fixing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use oracle_core::SimplexOracle;

    #[test]
    fn test_fixing_overwrites_without_growing() {
        let sub = SubProblem::new(&BendersInstance::worked_example()).unwrap();
        let rows = sub.template().num_constraints();

        let a = sub.fixed_at(&[1.0, 2.0]).unwrap();
        let b = sub.fixed_at(&[3.0, 0.0]).unwrap();
        assert_eq!(a.num_constraints(), rows);
        assert_eq!(b.num_constraints(), rows);
        assert_eq!(b.constraint(sub.fixing_rows()[0]).rhs, 3.0);
        assert_eq!(sub.template().constraint(sub.fixing_rows()[0]).rhs, 0.0);
    }

    #[test]
    fn test_recourse_at_worked_optimum_is_free() {
        let sub = SubProblem::new(&BendersInstance::worked_example()).unwrap();
        match sub.evaluate(&SimplexOracle::default(), &[0.0, 1.0]).unwrap() {
            Recourse::Optimal { objective, y, lambda } => {
                assert_abs_diff_eq!(objective, 0.0, epsilon = 1e-9);
                assert_eq!(y.len(), 2);
                assert_eq!(lambda.len(), 2);
            }
            other => panic!("expected optimal recourse, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let sub = SubProblem::new(&BendersInstance::worked_example()).unwrap();
        assert!(sub.fixed_at(&[1.0]).is_err());
    }
}
