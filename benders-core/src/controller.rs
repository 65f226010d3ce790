//! Benders loop controller.
//!
//! Drives the exchange between the master and the subproblem:
//!
//! ```text
//! Init -> SolvingMaster -> SolvingSub -> EvaluatingGap -> Converged
//!              ^                |              |
//!              |                v              v
//!              +------------ AddingCut <-------+
//! ```
//!
//! and finally `Terminated(status)`.

use std::fmt;
use std::time::Instant;

use log::{debug, info, trace, warn};
use oracle_core::{LpOracle, OracleError, SolveStatus};

use crate::cuts::{Cut, CutKind, CutPool};
use crate::error::{BendersError, BendersResult, ProblemKind};
use crate::instance::{dot, BendersInstance};
use crate::master::MasterProblem;
use crate::report::{relative_gap, BendersOutcome, BendersStatus, IterationRecord};
use crate::settings::BendersSettings;
use crate::subproblem::{Recourse, SubProblem};

/// Loop state. Transitions are logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    SolvingMaster,
    SolvingSub,
    EvaluatingGap,
    AddingCut,
    Converged,
    Terminated(BendersStatus),
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Init => write!(f, "INIT"),
            LoopState::SolvingMaster => write!(f, "SOLVING_MASTER"),
            LoopState::SolvingSub => write!(f, "SOLVING_SUB"),
            LoopState::EvaluatingGap => write!(f, "EVALUATING_GAP"),
            LoopState::AddingCut => write!(f, "ADDING_CUT"),
            LoopState::Converged => write!(f, "CONVERGED"),
            LoopState::Terminated(status) => write!(f, "TERMINATED({})", status),
        }
    }
}

/// Benders decomposition over a pluggable oracle.
///
/// Owns its master and subproblem; independent controllers share nothing.
pub struct BendersController<O: LpOracle> {
    instance: BendersInstance,
    oracle: O,
    settings: BendersSettings,
    master: MasterProblem,
    sub: SubProblem,
    cuts: CutPool,
    history: Vec<IterationRecord>,
    lower_bound: f64,
    upper_bound: f64,
    incumbent: Option<(Vec<f64>, Vec<f64>)>,
    state: LoopState,
}

impl<O: LpOracle> BendersController<O> {
    /// Build the master and subproblem template with default settings.
    pub fn new(instance: BendersInstance, oracle: O) -> BendersResult<Self> {
        Self::with_settings(instance, oracle, BendersSettings::default())
    }

    pub fn with_settings(
        instance: BendersInstance,
        oracle: O,
        settings: BendersSettings,
    ) -> BendersResult<Self> {
        instance.validate()?;
        let master = MasterProblem::new(&instance, settings.theta_lower_bound)?;
        let sub = SubProblem::new(&instance)?;
        Ok(Self {
            instance,
            oracle,
            settings,
            master,
            sub,
            cuts: CutPool::new(),
            history: Vec::new(),
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            incumbent: None,
            state: LoopState::Init,
        })
    }

    fn transition(&mut self, next: LoopState) {
        trace!("{} -> {}", self.state, next);
        self.state = next;
    }

    /// Run with an explicit iteration budget and relative gap tolerance.
    pub fn run(&mut self, max_iterations: usize, tolerance: f64) -> BendersResult<BendersOutcome> {
        self.settings.max_iterations = max_iterations;
        self.settings.gap_tol = tolerance;
        self.run_with_settings()
    }

    /// Run with the controller's settings.
    ///
    /// Calling it again continues from the current cuts and bounds.
    pub fn run_with_settings(&mut self) -> BendersResult<BendersOutcome> {
        let start = Instant::now();
        let mut iteration = self.history.len();
        let budget = iteration + self.settings.max_iterations;

        let status = loop {
            if iteration >= budget {
                break BendersStatus::MaxIterations;
            }
            if let Some(limit) = self.settings.time_limit_ms {
                if start.elapsed().as_millis() as u64 >= limit {
                    break BendersStatus::TimeLimit;
                }
            }
            iteration += 1;

            // 1. Master
            self.transition(LoopState::SolvingMaster);
            let master_sol = self.master.solve(&self.oracle)?;
            match master_sol.status {
                SolveStatus::Optimal => {}
                SolveStatus::Infeasible => {
                    info!("iteration {}: master infeasible", iteration);
                    // No master point: the record carries an empty x_k
                    self.record(iteration, Vec::new(), None, None);
                    break BendersStatus::Infeasible;
                }
                SolveStatus::Unbounded => {
                    let variable = master_sol
                        .unbounded_var
                        .map(|v| self.master.model().var(v).name.clone())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    return Err(BendersError::Unbounded {
                        problem: ProblemKind::Master,
                        variable,
                    });
                }
            }
            self.lower_bound = self.lower_bound.max(master_sol.obj_val);
            let x_k = self.master.x_values(&master_sol);
            debug!(
                "iteration {}: master obj {:.6}, x_k = {:?}, theta = {:?}",
                iteration,
                master_sol.obj_val,
                x_k,
                self.master.theta_value(&master_sol)
            );

            // 2-3. Subproblem at x_k
            self.transition(LoopState::SolvingSub);
            let recourse = self.sub.evaluate(&self.oracle, &x_k)?;

            let (objective, y, lambda) = match recourse {
                Recourse::Optimal { objective, y, lambda } => (objective, y, lambda),
                Recourse::Infeasible { infeasibility, lambda } => {
                    if !self.settings.feasibility_cuts {
                        warn!("iteration {}: subproblem has no recourse at {:?}", iteration, x_k);
                        self.record(iteration, x_k, None, None);
                        break BendersStatus::SubproblemInfeasible;
                    }
                    self.transition(LoopState::AddingCut);
                    let cut = Cut::feasibility(iteration, infeasibility, lambda, x_k.clone());
                    self.add_cut(cut)?;
                    self.record(iteration, x_k, None, Some(CutKind::Feasibility));
                    self.log_progress(iteration);
                    continue;
                }
            };

            // 4. Upper bound
            let candidate = dot(&self.instance.f, &x_k) + objective;
            if candidate < self.upper_bound {
                self.upper_bound = candidate;
                self.incumbent = Some((x_k.clone(), y));
            }

            // 5-6. Gap
            self.transition(LoopState::EvaluatingGap);
            if self.converged() {
                self.record(iteration, x_k, Some(objective), None);
                self.log_progress(iteration);
                self.transition(LoopState::Converged);
                break BendersStatus::Optimal;
            }

            // 7. Optimality cut
            self.transition(LoopState::AddingCut);
            let cut = Cut::optimality(iteration, objective, lambda, x_k.clone());
            self.add_cut(cut)?;
            self.record(iteration, x_k, Some(objective), Some(CutKind::Optimality));
            self.log_progress(iteration);
        };

        self.transition(LoopState::Terminated(status));
        info!(
            "Benders finished: {} after {} iterations, LB = {:.6}, UB = {:.6}",
            status, iteration, self.lower_bound, self.upper_bound
        );
        Ok(self.outcome(status, iteration, start))
    }

    fn converged(&self) -> bool {
        let rel = relative_gap(self.upper_bound, self.lower_bound, self.settings.gap_floor)
            .map_or(false, |g| g <= self.settings.gap_tol);
        let abs = self
            .settings
            .gap_abs_tol
            .map_or(false, |tol| self.upper_bound - self.lower_bound <= tol);
        rel || abs
    }

    fn add_cut(&mut self, cut: Cut) -> BendersResult<()> {
        if !cut.is_valid() {
            return Err(BendersError::Oracle(OracleError::Numerical(format!(
                "{} cut from iteration {} has non-finite multipliers",
                cut.kind, cut.iteration
            ))));
        }
        self.master.add_cut(&cut)?;
        debug!("iteration {}: {}", cut.iteration, cut);
        self.cuts.push(cut);
        Ok(())
    }

    fn record(
        &mut self,
        iteration: usize,
        x_k: Vec<f64>,
        sub_objective: Option<f64>,
        cut: Option<CutKind>,
    ) {
        self.history.push(IterationRecord {
            iteration,
            x_k,
            sub_objective,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            gap: relative_gap(self.upper_bound, self.lower_bound, self.settings.gap_floor),
            cut,
        });
    }

    fn log_progress(&self, iteration: usize) {
        if !self.settings.verbose || iteration % self.settings.log_freq.max(1) != 0 {
            return;
        }
        let gap = relative_gap(self.upper_bound, self.lower_bound, self.settings.gap_floor);
        info!(
            "Iter {:>4} | LB: {:.6e} | UB: {:.6e} | Gap: {} | Cuts: {}",
            iteration,
            self.lower_bound,
            self.upper_bound,
            gap.map_or_else(|| "-".to_string(), |g| format!("{:.3e}", g)),
            self.cuts.len(),
        );
    }

    fn outcome(&self, status: BendersStatus, iterations: usize, start: Instant) -> BendersOutcome {
        let (x, y) = self.incumbent.clone().unwrap_or_default();
        let obj_val = if x.is_empty() {
            f64::INFINITY
        } else {
            self.instance.objective(&x, &y)
        };
        BendersOutcome {
            status,
            x,
            y,
            obj_val,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            gap: relative_gap(self.upper_bound, self.lower_bound, self.settings.gap_floor),
            iterations,
            cuts: self.cuts.as_slice().to_vec(),
            history: self.history.clone(),
            solve_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn master(&self) -> &MasterProblem {
        &self.master
    }

    pub fn subproblem(&self) -> &SubProblem {
        &self.sub
    }

    pub fn cuts(&self) -> &CutPool {
        &self.cuts
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn settings(&self) -> &BendersSettings {
        &self.settings
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use oracle_core::SimplexOracle;

    fn worked_controller() -> BendersController<SimplexOracle> {
        BendersController::new(BendersInstance::worked_example(), SimplexOracle::default()).unwrap()
    }

    #[test]
    fn test_worked_example_converges() {
        let mut ctl = worked_controller();
        let outcome = ctl.run(50, 1e-9).unwrap();

        assert_eq!(outcome.status, BendersStatus::Optimal);
        assert_abs_diff_eq!(outcome.obj_val, 4.0, epsilon = 1e-6);
        assert_eq!(ctl.state(), LoopState::Terminated(BendersStatus::Optimal));
        assert_eq!(ctl.master().num_cuts(), outcome.cuts.len());
        assert_eq!(outcome.history.len(), outcome.iterations);
        assert!(outcome.history.last().unwrap().cut.is_none());
    }

    #[test]
    fn test_iteration_budget_is_not_success() {
        let mut ctl = worked_controller();
        let outcome = ctl.run(1, 1e-9).unwrap();

        assert_eq!(outcome.status, BendersStatus::MaxIterations);
        assert_eq!(outcome.iterations, 1);
        // One feasible point evaluated: the incumbent is still reported
        assert!(outcome.has_solution());
        assert!(outcome.upper_bound.is_finite());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            LoopState::Terminated(BendersStatus::SubproblemInfeasible).to_string(),
            "TERMINATED(SubproblemInfeasible)"
        );
    }
}
