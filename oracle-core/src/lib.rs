//! Oracle-core: a small LP / MILP / unconstrained NLP solve oracle.
//!
//! Models are plain data ([`LinearModel`]) handed to an [`LpOracle`]:
//!
//! - **LP**: dense two-phase primal simplex. Optimal solves report dual
//!   prices `d obj / d rhs` per constraint; infeasible solves report the
//!   phase-one infeasibility and its multipliers (a Farkas-style certificate).
//! - **MILP**: best-bound branch-and-bound over the LP relaxation.
//! - **IIS**: deletion filter over constraints and finite bounds.
//! - **NLP**: BFGS for smooth unconstrained problems.
//!
//! # Example
//!
//! ```
//! use oracle_core::{solve, ConstraintSense, LinearModel, ObjectiveSense, OracleSettings, VarType};
//!
//! let mut m = LinearModel::new("tiny");
//! let x = m.add_var("x", 0.0, f64::INFINITY, VarType::Continuous);
//! m.add_constraint("floor", [(x, 1.0)], ConstraintSense::GreaterEqual, 2.0)?;
//! m.set_objective(ObjectiveSense::Minimize, [(x, 3.0)], 0.0)?;
//!
//! let sol = solve(&m, &OracleSettings::default())?;
//! assert!((sol.obj_val - 6.0).abs() < 1e-9);
//! assert!((sol.duals.unwrap()[0] - 3.0).abs() < 1e-9);
//! # Ok::<(), oracle_core::OracleError>(())
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod iis;
pub mod mip;
pub mod model;
pub mod nlp;
pub mod oracle;
pub mod settings;
pub mod simplex;
pub mod solution;

pub use error::{OracleError, OracleResult};
pub use iis::{compute_iis, BoundSide, Conflict};
pub use model::{
    ConstrId, Constraint, ConstraintSense, LinearModel, Objective, ObjectiveSense, VarId, VarType,
    Variable,
};
pub use nlp::{minimize, FnObjective, NlpSettings, NlpSolution, NlpStatus};
pub use oracle::{LpOracle, SimplexOracle};
pub use settings::{NodeSelection, OracleSettings};
pub use solution::{Solution, SolveInfo, SolveStatus};

/// Main solve entry point.
///
/// Continuous models go to the simplex; models with integer variables go
/// through branch-and-bound.
pub fn solve(model: &LinearModel, settings: &OracleSettings) -> OracleResult<Solution> {
    oracle::dispatch(model, settings)
}
