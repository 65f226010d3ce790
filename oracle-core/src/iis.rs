//! Irreducible inconsistent subsystem extraction.
//!
//! Deletion filter: starting from the full (infeasible) relaxation, each
//! constraint and each finite bound is tentatively dropped; if the remainder
//! is still infeasible the member stays dropped, otherwise it is restored.
//! What survives is infeasible, and dropping any single member of it makes
//! it feasible.

use std::fmt;

use log::debug;

use crate::error::{OracleError, OracleResult};
use crate::model::{ConstrId, LinearModel, VarId, VarType};
use crate::settings::OracleSettings;
use crate::simplex::solve_lp;
use crate::solution::SolveStatus;

/// Which side of a variable's domain a bound member refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Lower,
    Upper,
}

/// An irreducible set of mutually inconsistent constraints and bounds.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// Member constraints, in model order.
    pub constraints: Vec<ConstrId>,

    /// Member variable bounds, in model order.
    pub bounds: Vec<(VarId, BoundSide)>,

    source: LinearModel,
}

impl Conflict {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.constraints.len() + self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The conflict as a stand-alone model: member constraints only, non-member
    /// bounds relaxed to infinity, zero objective.
    pub fn to_model(&self) -> OracleResult<LinearModel> {
        let keep_rows: Vec<bool> = (0..self.source.num_constraints())
            .map(|i| self.constraints.contains(&ConstrId(i)))
            .collect();
        let mut keep_lower = vec![false; self.source.num_vars()];
        let mut keep_upper = vec![false; self.source.num_vars()];
        for &(var, side) in &self.bounds {
            match side {
                BoundSide::Lower => keep_lower[var.0] = true,
                BoundSide::Upper => keep_upper[var.0] = true,
            }
        }
        restrict(
            &self.source,
            &format!("{}_iis", self.source.name()),
            &keep_rows,
            &keep_lower,
            &keep_upper,
        )
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars = self.source.variables();
        writeln!(f, "IIS for {} ({} members)", self.source.name(), self.len())?;
        for &id in &self.constraints {
            writeln!(f, "  {}", self.source.constraint(id).display(vars))?;
        }
        for &(var, side) in &self.bounds {
            let v = &vars[var.0];
            match side {
                BoundSide::Lower => writeln!(f, "  {} >= {}", v.name, v.lower)?,
                BoundSide::Upper => writeln!(f, "  {} <= {}", v.name, v.upper)?,
            }
        }
        Ok(())
    }
}

/// Copy of `model` keeping only the flagged rows and bounds, with a zero objective.
fn restrict(
    model: &LinearModel,
    name: &str,
    keep_rows: &[bool],
    keep_lower: &[bool],
    keep_upper: &[bool],
) -> OracleResult<LinearModel> {
    let mut sub = LinearModel::new(name);
    for (j, v) in model.variables().iter().enumerate() {
        let lower = if keep_lower[j] { v.lower } else { f64::NEG_INFINITY };
        let upper = if keep_upper[j] { v.upper } else { f64::INFINITY };
        sub.add_var(v.name.clone(), lower, upper, VarType::Continuous);
    }
    for (i, con) in model.constraints().iter().enumerate() {
        if !keep_rows[i] {
            continue;
        }
        let terms = con.coefs.iter().map(|(j, &a)| (VarId(j), a));
        sub.add_constraint(con.name.clone(), terms, con.sense, con.rhs)?;
    }
    Ok(sub)
}

fn is_infeasible(model: &LinearModel, settings: &OracleSettings) -> OracleResult<bool> {
    Ok(solve_lp(model, settings)?.status == SolveStatus::Infeasible)
}

/// Compute an IIS of the continuous relaxation of `model`.
pub fn compute_iis(model: &LinearModel, settings: &OracleSettings) -> OracleResult<Conflict> {
    model.validate()?;
    let relaxed = model.relaxed();

    let m = relaxed.num_constraints();
    let n = relaxed.num_vars();
    let mut keep_rows = vec![true; m];
    let mut keep_lower: Vec<bool> = relaxed.variables().iter().map(|v| v.lower.is_finite()).collect();
    let mut keep_upper: Vec<bool> = relaxed.variables().iter().map(|v| v.upper.is_finite()).collect();

    let full = restrict(&relaxed, relaxed.name(), &keep_rows, &keep_lower, &keep_upper)?;
    if !is_infeasible(&full, settings)? {
        return Err(OracleError::IisUnavailable(format!(
            "relaxation of {} is feasible",
            model.name()
        )));
    }

    for i in 0..m {
        keep_rows[i] = false;
        let trial = restrict(&relaxed, relaxed.name(), &keep_rows, &keep_lower, &keep_upper)?;
        if !is_infeasible(&trial, settings)? {
            keep_rows[i] = true;
        }
    }
    for j in 0..n {
        if keep_lower[j] {
            keep_lower[j] = false;
            let trial = restrict(&relaxed, relaxed.name(), &keep_rows, &keep_lower, &keep_upper)?;
            if !is_infeasible(&trial, settings)? {
                keep_lower[j] = true;
            }
        }
        if keep_upper[j] {
            keep_upper[j] = false;
            let trial = restrict(&relaxed, relaxed.name(), &keep_rows, &keep_lower, &keep_upper)?;
            if !is_infeasible(&trial, settings)? {
                keep_upper[j] = true;
            }
        }
    }

    let constraints: Vec<ConstrId> = (0..m).filter(|&i| keep_rows[i]).map(ConstrId).collect();
    let mut bounds = Vec::new();
    for j in 0..n {
        if keep_lower[j] {
            bounds.push((VarId(j), BoundSide::Lower));
        }
        if keep_upper[j] {
            bounds.push((VarId(j), BoundSide::Upper));
        }
    }
    debug!(
        "{}: IIS with {} constraints and {} bounds",
        model.name(),
        constraints.len(),
        bounds.len()
    );

    Ok(Conflict {
        constraints,
        bounds,
        source: relaxed,
    })
}
