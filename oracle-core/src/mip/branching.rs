//! Branching variable selection.

use super::BoundChange;
use crate::model::Variable;

/// A branching decision.
#[derive(Debug, Clone)]
pub struct BranchDecision {
    /// Variable to branch on.
    pub var: usize,

    /// Current (fractional) value.
    pub value: f64,

    /// Bound change for the "down" branch (x <= floor(value)).
    pub down_branch: BoundChange,

    /// Bound change for the "up" branch (x >= ceil(value)).
    pub up_branch: BoundChange,
}

/// Fractional part distance to the nearest integer, in `[0, 0.5]`.
fn fractionality(value: f64) -> f64 {
    (value - value.round()).abs()
}

/// Pick the integer variable whose value is closest to one half.
///
/// Returns None when every integer variable is within `tol` of an integer.
/// Ties go to the lowest index.
pub fn select_most_fractional(
    x: &[f64],
    vars: &[Variable],
    integer_vars: &[usize],
    tol: f64,
) -> Option<BranchDecision> {
    let mut best: Option<(usize, f64)> = None;
    for &j in integer_vars {
        let frac = fractionality(x[j]);
        if frac <= tol {
            continue;
        }
        if best.map_or(true, |(_, f)| frac > f + 1e-12) {
            best = Some((j, frac));
        }
    }

    let (var, _) = best?;
    let value = x[var];
    let v = &vars[var];
    Some(BranchDecision {
        var,
        value,
        down_branch: BoundChange::down_branch(var, v.lower, v.upper, value),
        up_branch: BoundChange::up_branch(var, v.lower, v.upper, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarType;

    fn vars(n: usize) -> Vec<Variable> {
        (0..n)
            .map(|j| Variable {
                name: format!("x{}", j),
                lower: 0.0,
                upper: 1.0,
                var_type: VarType::Binary,
            })
            .collect()
    }

    #[test]
    fn test_most_fractional() {
        let x = vec![0.3, 0.45, 1.0];
        let d = select_most_fractional(&x, &vars(3), &[0, 1, 2], 1e-6).unwrap();
        assert_eq!(d.var, 1);
        assert_eq!(d.down_branch.upper, 0.0);
        assert_eq!(d.up_branch.lower, 1.0);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let x = vec![0.3, 0.7];
        let d = select_most_fractional(&x, &vars(2), &[0, 1], 1e-6).unwrap();
        assert_eq!(d.var, 0);
    }

    #[test]
    fn test_integer_feasible() {
        let x = vec![1.0, 1e-8, 0.5];
        // Only the first two are integer-restricted
        assert!(select_most_fractional(&x, &vars(3), &[0, 1], 1e-6).is_none());
    }
}
