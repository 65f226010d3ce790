//! Branch-and-bound tree controller.

use std::time::Instant;

use log::{debug, info};

use super::{select_most_fractional, BranchDecision, Incumbent, NodeQueue, SearchNode};
use crate::error::{OracleError, OracleResult};
use crate::model::{LinearModel, ObjectiveSense};
use crate::settings::OracleSettings;
use crate::simplex::solve_lp;
use crate::solution::{Solution, SolveInfo, SolveStatus};

/// Branch-and-bound tree over the continuous relaxation.
///
/// Bounds and incumbents are kept in minimization sense; maximization models
/// are negated on the way in and out.
pub struct BranchAndBound<'a> {
    model: &'a LinearModel,
    relaxation: LinearModel,
    integer_vars: Vec<usize>,
    obj_scale: f64,
    queue: NodeQueue,
    pub incumbent: Incumbent,
    next_node_id: u64,
    nodes_explored: u64,
    nodes_pruned: u64,
    pivots: usize,
    start_time: Instant,
    settings: &'a OracleSettings,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(model: &'a LinearModel, settings: &'a OracleSettings) -> Self {
        let obj_scale = match model.objective().sense {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        Self {
            model,
            relaxation: model.relaxed(),
            integer_vars: model.integer_vars(),
            obj_scale,
            queue: NodeQueue::new(settings.node_selection),
            incumbent: Incumbent::default(),
            next_node_id: 1, // 0 reserved for root
            nodes_explored: 0,
            nodes_pruned: 0,
            pivots: 0,
            start_time: Instant::now(),
            settings,
        }
    }

    /// Absolute pruning tolerance around the incumbent.
    fn prune_tol(&self) -> f64 {
        let rel = self.settings.gap_tol * self.incumbent.objective.abs();
        if rel.is_finite() {
            rel.max(self.settings.gap_abs_tol)
        } else {
            self.settings.gap_abs_tol
        }
    }

    fn info(&self) -> SolveInfo {
        SolveInfo {
            pivots: self.pivots,
            nodes: self.nodes_explored,
            incumbent_updates: self.incumbent.improvements,
        }
    }

    fn update_incumbent(&mut self, x: &[f64], obj: f64) -> bool {
        let improved = self.incumbent.offer(x, obj);
        if improved {
            let pruned = self.queue.prune_by_bound(obj, self.prune_tol());
            self.nodes_pruned += pruned as u64;
            if self.settings.verbose {
                info!("New incumbent: obj={:.6e}, pruned {} nodes", self.obj_scale * obj, pruned);
            }
        }
        improved
    }

    fn branch(&mut self, parent: &SearchNode, decision: BranchDecision, bound: f64) {
        for change in [decision.down_branch, decision.up_branch] {
            if change.is_empty() {
                continue;
            }
            let child = parent.child(self.next_node_id, change, bound);
            self.next_node_id += 1;
            self.queue.push(child);
        }
    }

    fn log_progress(&self) {
        if !self.settings.verbose || self.nodes_explored % self.settings.log_freq.max(1) != 0 {
            return;
        }
        info!(
            "Nodes: {} ({} open, {} pruned) | Bound: {:.6e} | Incumbent: {:.6e} | Gap: {:.2}% | Time: {:.1}s",
            self.nodes_explored,
            self.queue.len(),
            self.nodes_pruned,
            self.obj_scale * self.queue.best_bound(),
            self.obj_scale * self.incumbent.objective,
            self.incumbent.gap(self.queue.best_bound()) * 100.0,
            self.start_time.elapsed().as_secs_f64(),
        );
    }

    /// Run the search to completion.
    pub fn solve(mut self) -> OracleResult<Solution> {
        let mut root_infeasibility = 0.0;
        self.queue.push(SearchNode::root());

        while let Some(node) = self.queue.pop() {
            if self.incumbent.exists() && node.can_prune(self.incumbent.objective, self.prune_tol()) {
                self.nodes_pruned += 1;
                continue;
            }
            if self.nodes_explored >= self.settings.max_nodes {
                return Err(OracleError::NodeLimit(self.settings.max_nodes));
            }
            self.nodes_explored += 1;

            let sub = node.apply(&self.relaxation)?;
            let sol = solve_lp(&sub, self.settings)?;
            self.pivots += sol.info.pivots;

            match sol.status {
                SolveStatus::Infeasible => {
                    if node.depth == 0 {
                        root_infeasibility = sol.infeasibility;
                    }
                    debug!("node {} infeasible", node.id);
                }
                SolveStatus::Unbounded => {
                    return Ok(Solution::unbounded(sol.unbounded_var, self.info()));
                }
                SolveStatus::Optimal => {
                    let bound = self.obj_scale * sol.obj_val;
                    if self.incumbent.exists() && bound >= self.incumbent.objective - self.prune_tol() {
                        self.nodes_pruned += 1;
                    } else {
                        match select_most_fractional(
                            &sol.x,
                            sub.variables(),
                            &self.integer_vars,
                            self.settings.int_feas_tol,
                        ) {
                            Some(decision) => {
                                debug!(
                                    "node {} (depth {}): branch on {} = {:.6}",
                                    node.id, node.depth, decision.var, decision.value
                                );
                                self.branch(&node, decision, bound);
                            }
                            None => {
                                let mut x = sol.x;
                                for &j in &self.integer_vars {
                                    x[j] = x[j].round();
                                }
                                let obj = self.obj_scale * self.model.objective_value(&x);
                                self.update_incumbent(&x, obj);
                            }
                        }
                    }
                }
            }
            self.log_progress();
        }

        let info = self.info();
        match self.incumbent.x {
            Some(x) => {
                let obj_val = self.model.objective_value(&x);
                Ok(Solution::optimal(x, obj_val, None, info))
            }
            None => Ok(Solution::infeasible(None, root_infeasibility, info)),
        }
    }
}

/// Solve a mixed-integer model by branch-and-bound.
pub fn solve_mip(model: &LinearModel, settings: &OracleSettings) -> OracleResult<Solution> {
    model.validate()?;
    BranchAndBound::new(model, settings).solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintSense::*, VarType};
    use approx::assert_abs_diff_eq;

    fn knapsack() -> LinearModel {
        // max 8a + 11b + 6c + 4d  s.t.  5a + 7b + 4c + 3d <= 14, binary
        // Relaxation gives 22 with c = 0.5; integer optimum is b + c + d = 21
        let mut m = LinearModel::new("knapsack");
        let vars: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| m.add_var(*name, 0.0, 1.0, VarType::Binary))
            .collect();
        let weights = [5.0, 7.0, 4.0, 3.0];
        let values = [8.0, 11.0, 6.0, 4.0];
        m.add_constraint(
            "capacity",
            vars.iter().zip(weights).map(|(&v, w)| (v, w)),
            LessEqual,
            14.0,
        )
        .unwrap();
        m.set_objective(
            ObjectiveSense::Maximize,
            vars.iter().zip(values).map(|(&v, c)| (v, c)),
            0.0,
        )
        .unwrap();
        m
    }

    #[test]
    fn test_integer_knapsack() {
        let m = knapsack();
        let sol = solve_mip(&m, &OracleSettings::default()).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(sol.obj_val, 21.0, epsilon = 1e-9);
        assert_eq!(sol.x, vec![0.0, 1.0, 1.0, 1.0]);
        assert!(sol.duals.is_none());
        assert!(m.max_violation(&sol.x) <= 1e-9);
        assert!(sol.info.nodes > 1);
    }

    #[test]
    fn test_depth_first_agrees() {
        let m = knapsack();
        let settings = OracleSettings::default().with_node_selection(crate::NodeSelection::DepthFirst);
        let sol = solve_mip(&m, &settings).unwrap();
        assert_abs_diff_eq!(sol.obj_val, 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_integer_infeasible() {
        // 2x = 1 has no integer solution
        let mut m = LinearModel::new("parity");
        let x = m.add_var("x", 0.0, 10.0, VarType::Integer);
        m.add_constraint("half", [(x, 2.0)], Equal, 1.0).unwrap();
        m.set_objective(ObjectiveSense::Minimize, [(x, 1.0)], 0.0).unwrap();

        let sol = solve_mip(&m, &OracleSettings::default()).unwrap();
        assert_eq!(sol.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_node_limit() {
        let m = knapsack();
        let err = solve_mip(&m, &OracleSettings::default().with_max_nodes(1)).unwrap_err();
        assert_eq!(err, OracleError::NodeLimit(1));
    }
}
