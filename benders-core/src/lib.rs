//! Benders decomposition for two-stage MILPs.
//!
//! ```text
//! minimize    f.x + c.y
//! subject to  A x + E y <= e,  x integer >= 0,  y >= 0
//! ```
//!
//! The master keeps the integer `x` and a recourse estimate θ; the
//! subproblem prices the recourse at a fixed `x_k` and returns duals that
//! become cuts on θ. All solves go through an [`oracle_core::LpOracle`].
//!
//! # Example
//!
//! ```
//! use benders_core::{BendersController, BendersInstance, BendersStatus};
//! use oracle_core::SimplexOracle;
//!
//! let instance = BendersInstance::worked_example();
//! let mut ctl = BendersController::new(instance, SimplexOracle::default())?;
//! let outcome = ctl.run(50, 1e-6)?;
//! assert_eq!(outcome.status, BendersStatus::Optimal);
//! assert!((outcome.obj_val - 4.0).abs() < 1e-6);
//! # Ok::<(), benders_core::BendersError>(())
//! ```

#![warn(clippy::all)]

pub mod controller;
pub mod cuts;
pub mod error;
pub mod instance;
pub mod master;
pub mod report;
pub mod settings;
pub mod subproblem;

pub use controller::{BendersController, LoopState};
pub use cuts::{Cut, CutKind, CutPool};
pub use error::{BendersError, BendersResult, ProblemKind};
pub use instance::BendersInstance;
pub use master::MasterProblem;
pub use report::{relative_gap, BendersOutcome, BendersStatus, IterationRecord};
pub use settings::BendersSettings;
pub use subproblem::{Recourse, SubProblem};
