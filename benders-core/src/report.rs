//! Iteration records and the final outcome of a run.

use std::fmt;

use serde::Serialize;

use crate::cuts::{Cut, CutKind};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BendersStatus {
    /// Gap closed within tolerance
    Optimal,

    /// Iteration budget exhausted before the gap closed
    MaxIterations,

    /// Wall-clock limit reached before the gap closed
    TimeLimit,

    /// Master problem infeasible: the original problem has no solution
    Infeasible,

    /// Subproblem had no recourse and feasibility cuts were disabled
    SubproblemInfeasible,
}

impl BendersStatus {
    /// True if the incumbent is proven optimal.
    pub fn is_optimal(&self) -> bool {
        matches!(self, BendersStatus::Optimal)
    }
}

impl fmt::Display for BendersStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BendersStatus::Optimal => write!(f, "Optimal"),
            BendersStatus::MaxIterations => write!(f, "MaxIterations"),
            BendersStatus::TimeLimit => write!(f, "TimeLimit"),
            BendersStatus::Infeasible => write!(f, "Infeasible"),
            BendersStatus::SubproblemInfeasible => write!(f, "SubproblemInfeasible"),
        }
    }
}

/// One row of the iteration log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub x_k: Vec<f64>,
    /// Recourse cost at `x_k` (None when the subproblem was infeasible).
    pub sub_objective: Option<f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Relative gap (None when undefined).
    pub gap: Option<f64>,
    /// Cut added at the end of the iteration, if any.
    pub cut: Option<CutKind>,
}

/// Relative gap `(ub - lb) / max(|ub|, floor)`.
///
/// Undefined when either bound is infinite or `|ub|` is below `floor`.
pub fn relative_gap(ub: f64, lb: f64, floor: f64) -> Option<f64> {
    if !ub.is_finite() || !lb.is_finite() || ub.abs() < floor {
        return None;
    }
    Some((ub - lb) / ub.abs().max(floor))
}

/// Final result of a Benders run.
#[derive(Debug, Clone, Serialize)]
pub struct BendersOutcome {
    pub status: BendersStatus,

    /// Best first-stage point found (empty if none).
    pub x: Vec<f64>,

    /// Recourse at the best point (empty if none).
    pub y: Vec<f64>,

    /// `f.x + c.y` at the incumbent (`+inf` if none).
    pub obj_val: f64,

    pub lower_bound: f64,
    pub upper_bound: f64,
    pub gap: Option<f64>,
    pub iterations: usize,

    /// Cuts in the order they were added.
    pub cuts: Vec<Cut>,

    pub history: Vec<IterationRecord>,
    pub solve_time_ms: u64,
}

impl BendersOutcome {
    /// True when an incumbent exists.
    pub fn has_solution(&self) -> bool {
        !self.x.is_empty()
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.6}", v))
}

impl fmt::Display for BendersOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>5} {:>20} {:>14} {:>14} {:>14} {:>12} {:>12}",
            "iter", "x_k", "sub_obj", "LB", "UB", "gap", "cut"
        )?;
        for rec in &self.history {
            let x_k = format!("{:?}", rec.x_k);
            let cut = rec.cut.map_or_else(|| "-".to_string(), |k| k.to_string());
            writeln!(
                f,
                "{:>5} {:>20} {:>14} {:>14.6} {:>14.6} {:>12} {:>12}",
                rec.iteration,
                x_k,
                fmt_opt(rec.sub_objective),
                rec.lower_bound,
                rec.upper_bound,
                rec.gap.map_or_else(|| "-".to_string(), |g| format!("{:.3e}", g)),
                cut,
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Status:      {}", self.status)?;
        writeln!(f, "Objective:   {:.6}", self.obj_val)?;
        writeln!(f, "Bounds:      [{:.6}, {:.6}]", self.lower_bound, self.upper_bound)?;
        writeln!(f, "x*:          {:?}", self.x)?;
        writeln!(f, "y*:          {:?}", self.y)?;
        writeln!(f, "Iterations:  {}", self.iterations)?;
        writeln!(f, "Cuts:        {}", self.cuts.len())?;
        for cut in &self.cuts {
            writeln!(f, "  [{}] {}", cut.iteration, cut)?;
        }
        Ok(())
    }
}
