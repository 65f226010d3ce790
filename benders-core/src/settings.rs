//! Configuration settings for the Benders loop.

/// Benders loop settings.
#[derive(Debug, Clone)]
pub struct BendersSettings {
    // === Termination ===
    /// Maximum number of master/subproblem rounds.
    pub max_iterations: usize,

    /// Relative gap `(UB - LB) / max(|UB|, gap_floor)` at which the loop stops.
    pub gap_tol: f64,

    /// Absolute gap `UB - LB` at which the loop stops (None disables the check).
    pub gap_abs_tol: Option<f64>,

    /// Smallest `|UB|` for which the relative gap is defined.
    pub gap_floor: f64,

    /// Wall-clock limit in milliseconds, checked between iterations.
    pub time_limit_ms: Option<u64>,

    // === Master ===
    /// Initial lower bound on the recourse estimate θ.
    pub theta_lower_bound: f64,

    // === Subproblem ===
    /// Add feasibility cuts when the subproblem has no recourse.
    /// When false, an infeasible subproblem ends the run.
    pub feasibility_cuts: bool,

    // === Output ===
    /// Log iteration progress.
    pub verbose: bool,

    /// Log frequency (every N iterations).
    pub log_freq: usize,
}

impl Default for BendersSettings {
    fn default() -> Self {
        // BENDERS_MAX_ITERATIONS overrides the iteration budget
        let max_iterations = std::env::var("BENDERS_MAX_ITERATIONS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(100);

        Self {
            max_iterations,
            gap_tol: 1e-6,
            gap_abs_tol: Some(1e-9),
            gap_floor: 1e-10,
            time_limit_ms: None,
            theta_lower_bound: -1e6,
            feasibility_cuts: true,
            verbose: false,
            log_freq: 1,
        }
    }
}

impl BendersSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.gap_tol = tol;
        self
    }

    pub fn with_gap_abs_tol(mut self, tol: Option<f64>) -> Self {
        self.gap_abs_tol = tol;
        self
    }

    pub fn with_theta_lower_bound(mut self, bound: f64) -> Self {
        self.theta_lower_bound = bound;
        self
    }

    pub fn with_feasibility_cuts(mut self, enabled: bool) -> Self {
        self.feasibility_cuts = enabled;
        self
    }

    pub fn with_time_limit_ms(mut self, limit: Option<u64>) -> Self {
        self.time_limit_ms = limit;
        self
    }
}
