//! Master problem: integer first-stage decisions plus the recourse estimate θ.

use log::debug;
use oracle_core::{
    ConstrId, ConstraintSense, LinearModel, LpOracle, ObjectiveSense, Solution, VarId, VarType,
};

use crate::cuts::Cut;
use crate::error::{BendersError, BendersResult};
use crate::instance::BendersInstance;

/// `min f.x + θ` over integer `x >= 0` and `θ >= theta_lower_bound`, plus cuts.
///
/// The model only ever grows by appended cut rows.
#[derive(Debug, Clone)]
pub struct MasterProblem {
    model: LinearModel,
    x: Vec<VarId>,
    theta: VarId,
    cut_rows: Vec<ConstrId>,
}

impl MasterProblem {
    pub fn new(instance: &BendersInstance, theta_lower_bound: f64) -> BendersResult<Self> {
        if theta_lower_bound.is_nan() {
            return Err(BendersError::InvalidInstance("theta lower bound is NaN".to_string()));
        }
        let mut model = LinearModel::new(format!("{}_master", instance.name()));
        let x: Vec<VarId> = (0..instance.n())
            .map(|j| {
                let upper = instance.x_upper_bound(j);
                model.add_var(format!("x{}", j), 0.0, upper, VarType::Integer)
            })
            .collect();
        let theta = model.add_var("theta", theta_lower_bound, f64::INFINITY, VarType::Continuous);

        let objective = x
            .iter()
            .copied()
            .zip(instance.f.iter().copied())
            .chain(std::iter::once((theta, 1.0)));
        model.set_objective(ObjectiveSense::Minimize, objective, 0.0)?;

        Ok(Self {
            model,
            x,
            theta,
            cut_rows: Vec::new(),
        })
    }

    /// Append a cut as the row `λ.x - θ <= λ.x_k - f_k` (no θ for feasibility cuts).
    pub fn add_cut(&mut self, cut: &Cut) -> BendersResult<ConstrId> {
        if cut.lambda.len() != self.x.len() || !cut.is_valid() {
            return Err(BendersError::InvalidInstance(format!(
                "cut from iteration {} has {} multipliers for {} variables or non-finite data",
                cut.iteration,
                cut.lambda.len(),
                self.x.len()
            )));
        }
        let name = format!("{}_cut{}", cut.kind, self.cut_rows.len());
        let id = self.model.add_constraint(
            name,
            cut.terms(&self.x, self.theta),
            ConstraintSense::LessEqual,
            cut.rhs(),
        )?;
        debug!("master: added {}", self.model.constraint(id).display(self.model.variables()));
        self.cut_rows.push(id);
        Ok(id)
    }

    /// Solve the current master.
    pub fn solve<O: LpOracle>(&self, oracle: &O) -> BendersResult<Solution> {
        Ok(oracle.solve(&self.model)?)
    }

    /// Values of `x` in a solution, projected to the nearest integers.
    pub fn x_values(&self, sol: &Solution) -> Vec<f64> {
        self.x
            .iter()
            .map(|&v| sol.value(v).unwrap_or(0.0).round())
            .collect()
    }

    pub fn theta_value(&self, sol: &Solution) -> Option<f64> {
        sol.value(self.theta)
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn x_vars(&self) -> &[VarId] {
        &self.x
    }

    pub fn theta(&self) -> VarId {
        self.theta
    }

    pub fn num_cuts(&self) -> usize {
        self.cut_rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::SimplexOracle;

    #[test]
    fn test_initial_master_sits_at_theta_bound() {
        let inst = BendersInstance::worked_example();
        let master = MasterProblem::new(&inst, -100.0).unwrap();
        let sol = master.solve(&SimplexOracle::default()).unwrap();
        assert!(sol.is_optimal());
        assert_eq!(master.x_values(&sol), vec![0.0, 0.0]);
        assert_eq!(master.theta_value(&sol), Some(-100.0));
        assert_eq!(sol.obj_val, -100.0);
    }

    #[test]
    fn test_cut_rows_only_grow() {
        let inst = BendersInstance::worked_example();
        let mut master = MasterProblem::new(&inst, -100.0).unwrap();
        let before = master.model().num_constraints();
        master
            .add_cut(&Cut::optimality(1, 5.0, vec![-1.0, -2.0], vec![0.0, 0.0]))
            .unwrap();
        master
            .add_cut(&Cut::feasibility(2, 1.0, vec![-1.0, 0.0], vec![0.0, 0.0]))
            .unwrap();
        assert_eq!(master.num_cuts(), 2);
        assert_eq!(master.model().num_constraints(), before + 2);

        let text = master.model().constraints()[1].display(master.model().variables()).to_string();
        assert_eq!(text, "feasibility_cut1: -x0 <= -1");
    }

    #[test]
    fn test_cut_dimension_checked() {
        let inst = BendersInstance::worked_example();
        let mut master = MasterProblem::new(&inst, -100.0).unwrap();
        let err = master.add_cut(&Cut::optimality(1, 5.0, vec![1.0], vec![0.0])).unwrap_err();
        assert!(matches!(err, BendersError::InvalidInstance(_)));
    }
}
