//! Branch-and-bound nodes as cumulative bound changes.

use crate::error::OracleResult;
use crate::model::{LinearModel, VarId};

/// Bounds imposed on one variable by a branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    pub var: usize,
    pub lower: f64,
    pub upper: f64,
}

impl BoundChange {
    /// `x_var <= floor(value)`, clipped to the current domain.
    pub fn down_branch(var: usize, lower: f64, upper: f64, value: f64) -> Self {
        Self {
            var,
            lower,
            upper: value.floor().min(upper),
        }
    }

    /// `x_var >= ceil(value)`, clipped to the current domain.
    pub fn up_branch(var: usize, lower: f64, upper: f64, value: f64) -> Self {
        Self {
            var,
            lower: value.ceil().max(lower),
            upper,
        }
    }

    /// Lower bound above upper bound.
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper + 1e-9
    }
}

/// Open subproblem of the search.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub id: u64,
    pub depth: usize,

    /// Bound changes from the root to this node, oldest first.
    pub bound_changes: Vec<BoundChange>,

    /// Lower bound on the minimization objective in this subtree.
    pub dual_bound: f64,
}

impl SearchNode {
    pub fn root() -> Self {
        Self {
            id: 0,
            depth: 0,
            bound_changes: Vec::new(),
            dual_bound: f64::NEG_INFINITY,
        }
    }

    /// Child with one more bound change. `dual_bound` is the parent's LP bound.
    pub fn child(&self, id: u64, change: BoundChange, dual_bound: f64) -> Self {
        let mut bound_changes = self.bound_changes.clone();
        bound_changes.push(change);
        Self {
            id,
            depth: self.depth + 1,
            bound_changes,
            dual_bound,
        }
    }

    /// Copy of `relaxation` with this node's bounds applied.
    pub fn apply(&self, relaxation: &LinearModel) -> OracleResult<LinearModel> {
        let mut model = relaxation.clone();
        for change in &self.bound_changes {
            model.set_var_bounds(VarId(change.var), change.lower, change.upper)?;
        }
        Ok(model)
    }

    /// True when the subtree cannot beat `incumbent_obj` by more than `tol`.
    pub fn can_prune(&self, incumbent_obj: f64, tol: f64) -> bool {
        self.dual_bound >= incumbent_obj - tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarType;

    #[test]
    fn test_child_accumulates_bounds() {
        let root = SearchNode::root();
        let a = root.child(1, BoundChange::down_branch(0, 0.0, 5.0, 2.7), 3.0);
        let b = a.child(2, BoundChange::up_branch(1, 0.0, 4.0, 0.2), 3.5);

        assert_eq!(b.depth, 2);
        assert_eq!(b.bound_changes.len(), 2);
        assert_eq!(b.bound_changes[0].upper, 2.0);
        assert_eq!(b.bound_changes[1].lower, 1.0);
        assert_eq!(b.dual_bound, 3.5);
    }

    #[test]
    fn test_apply_overrides_in_order() {
        let mut model = LinearModel::new("m");
        model.add_var("x", 0.0, 10.0, VarType::Integer);

        let root = SearchNode::root();
        let n1 = root.child(1, BoundChange::down_branch(0, 0.0, 10.0, 6.5), 0.0);
        let n2 = n1.child(2, BoundChange::up_branch(0, 0.0, 6.0, 3.5), 0.0);
        let applied = n2.apply(&model).unwrap();

        assert_eq!(applied.variables()[0].lower, 4.0);
        assert_eq!(applied.variables()[0].upper, 6.0);
    }

    #[test]
    fn test_empty_domain() {
        let bad = BoundChange::down_branch(0, 3.0, 5.0, 2.7);
        assert!(bad.is_empty());
        assert!(!BoundChange::up_branch(0, 0.0, 5.0, 2.7).is_empty());
    }

    #[test]
    fn test_pruning() {
        let mut node = SearchNode::root();
        node.dual_bound = 10.0;

        assert!(!node.can_prune(15.0, 1e-9));
        assert!(node.can_prune(10.0, 1e-9));
        assert!(node.can_prune(8.0, 1e-9));
    }
}
