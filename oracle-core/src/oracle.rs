//! Oracle trait and the built-in simplex / branch-and-bound implementation.

use crate::error::OracleResult;
use crate::iis::{compute_iis, Conflict};
use crate::mip::solve_mip;
use crate::model::LinearModel;
use crate::settings::OracleSettings;
use crate::simplex::solve_lp;
use crate::solution::Solution;

/// Something that can solve a [`LinearModel`].
///
/// The returned status is authoritative: `x`, `obj_val` and `duals` are only
/// meaningful when it is `Optimal`.
pub trait LpOracle {
    /// Solve the model (branch-and-bound when it has integer variables).
    fn solve(&self, model: &LinearModel) -> OracleResult<Solution>;

    /// Extract an irreducible inconsistent subsystem of an infeasible model.
    fn compute_iis(&self, model: &LinearModel) -> OracleResult<Conflict>;
}

/// Dense two-phase simplex, with branch-and-bound for integer models.
#[derive(Debug, Clone, Default)]
pub struct SimplexOracle {
    pub settings: OracleSettings,
}

impl SimplexOracle {
    pub fn new(settings: OracleSettings) -> Self {
        Self { settings }
    }
}

impl LpOracle for SimplexOracle {
    fn solve(&self, model: &LinearModel) -> OracleResult<Solution> {
        crate::solve(model, &self.settings)
    }

    fn compute_iis(&self, model: &LinearModel) -> OracleResult<Conflict> {
        compute_iis(model, &self.settings)
    }
}

impl<T: LpOracle + ?Sized> LpOracle for &T {
    fn solve(&self, model: &LinearModel) -> OracleResult<Solution> {
        (**self).solve(model)
    }

    fn compute_iis(&self, model: &LinearModel) -> OracleResult<Conflict> {
        (**self).compute_iis(model)
    }
}

/// Route a model to the simplex or to branch-and-bound.
pub(crate) fn dispatch(model: &LinearModel, settings: &OracleSettings) -> OracleResult<Solution> {
    if model.is_continuous() {
        solve_lp(model, settings)
    } else {
        solve_mip(model, settings)
    }
}
