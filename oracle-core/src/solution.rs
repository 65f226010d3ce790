//! Solve results.

use std::fmt;

use crate::model::{ConstrId, VarId};

/// Solution status. Authoritative: primal and dual data are only meaningful
/// when the status is [`SolveStatus::Optimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found
    Optimal,

    /// No point satisfies all constraints and bounds
    Infeasible,

    /// Objective can be improved without limit
    Unbounded,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
        }
    }
}

/// Solve counters.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Simplex pivots across all LP solves
    pub pivots: usize,

    /// Branch-and-bound nodes explored (0 for continuous models)
    pub nodes: u64,

    /// Number of times the incumbent improved during branch-and-bound
    pub incumbent_updates: u64,
}

/// Result of an oracle call.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solve status.
    pub status: SolveStatus,

    /// Primal values, one per variable (empty unless optimal).
    pub x: Vec<f64>,

    /// Objective value (`+inf` / `-inf` when infeasible / unbounded for minimization).
    pub obj_val: f64,

    /// Dual prices `d obj / d rhs_i`, one per constraint. Continuous optimal models only.
    pub duals: Option<Vec<f64>>,

    /// Phase-one multipliers `d w / d rhs_i`, one per constraint. Continuous infeasible models only.
    pub farkas: Option<Vec<f64>>,

    /// Phase-one infeasibility measure `w` (0 when feasible).
    pub infeasibility: f64,

    /// Variable whose column exposed an unbounded ray.
    pub unbounded_var: Option<VarId>,

    /// Solve counters.
    pub info: SolveInfo,
}

impl Solution {
    /// Create an infeasible result.
    pub fn infeasible(farkas: Option<Vec<f64>>, infeasibility: f64, info: SolveInfo) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            x: Vec::new(),
            obj_val: f64::INFINITY,
            duals: None,
            farkas,
            infeasibility,
            unbounded_var: None,
            info,
        }
    }

    /// Create an unbounded result.
    pub fn unbounded(unbounded_var: Option<VarId>, info: SolveInfo) -> Self {
        Self {
            status: SolveStatus::Unbounded,
            x: Vec::new(),
            obj_val: f64::NEG_INFINITY,
            duals: None,
            farkas: None,
            infeasibility: 0.0,
            unbounded_var,
            info,
        }
    }

    /// Create an optimal result.
    pub fn optimal(x: Vec<f64>, obj_val: f64, duals: Option<Vec<f64>>, info: SolveInfo) -> Self {
        Self {
            status: SolveStatus::Optimal,
            x,
            obj_val,
            duals,
            farkas: None,
            infeasibility: 0.0,
            unbounded_var: None,
            info,
        }
    }

    /// True when the status is optimal.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Primal value of a variable (None unless optimal).
    pub fn value(&self, var: VarId) -> Option<f64> {
        if !self.is_optimal() {
            return None;
        }
        self.x.get(var.0).copied()
    }

    /// Dual price of a constraint (None unless optimal and continuous).
    pub fn dual(&self, constr: ConstrId) -> Option<f64> {
        if !self.is_optimal() {
            return None;
        }
        self.duals.as_ref()?.get(constr.0).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_hidden_unless_optimal() {
        let sol = Solution::infeasible(Some(vec![1.0]), 2.0, SolveInfo::default());
        assert_eq!(sol.value(VarId(0)), None);
        assert_eq!(sol.dual(ConstrId(0)), None);
        assert_eq!(sol.obj_val, f64::INFINITY);

        let sol = Solution::optimal(vec![3.0], 3.0, Some(vec![-1.0]), SolveInfo::default());
        assert_eq!(sol.value(VarId(0)), Some(3.0));
        assert_eq!(sol.dual(ConstrId(0)), Some(-1.0));
        assert_eq!(sol.dual(ConstrId(4)), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SolveStatus::Infeasible.to_string(), "Infeasible");
    }
}
