//! Configuration settings for the solve oracle.

/// Node selection strategy for the branch-and-bound tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Always select node with best (lowest) dual bound.
    #[default]
    BestBound,

    /// Depth-first search (helps find feasible solutions quickly).
    DepthFirst,
}

/// Oracle settings.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    // === Simplex ===
    /// Maximum number of simplex pivots per LP solve (both phases).
    pub max_pivots: usize,

    /// Primal feasibility tolerance (phase-one residual, bound checks).
    pub tol_feas: f64,

    /// Optimality tolerance on reduced costs.
    pub tol_opt: f64,

    /// Smallest magnitude accepted as a pivot element.
    pub tol_pivot: f64,

    /// Consecutive degenerate pivots before switching to Bland's rule.
    pub bland_after: usize,

    // === Branch-and-bound ===
    /// Maximum number of nodes to explore.
    pub max_nodes: u64,

    /// Integer feasibility tolerance.
    /// A variable is considered integer if |x - round(x)| <= int_feas_tol.
    pub int_feas_tol: f64,

    /// Relative optimality gap at which a node is pruned.
    pub gap_tol: f64,

    /// Absolute optimality gap at which a node is pruned.
    pub gap_abs_tol: f64,

    /// Node selection strategy.
    pub node_selection: NodeSelection,

    // === Output ===
    /// Log branch-and-bound progress.
    pub verbose: bool,

    /// Log frequency (every N nodes).
    pub log_freq: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        // ORACLE_MAX_PIVOTS overrides the pivot budget for large instances
        let max_pivots = std::env::var("ORACLE_MAX_PIVOTS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(50_000);

        Self {
            max_pivots,
            tol_feas: 1e-9,
            tol_opt: 1e-9,
            tol_pivot: 1e-11,
            bland_after: 50,
            max_nodes: 100_000,
            int_feas_tol: 1e-6,
            gap_tol: 1e-9,
            gap_abs_tol: 1e-9,
            node_selection: NodeSelection::default(),
            verbose: false,
            log_freq: 100,
        }
    }
}

impl OracleSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            log_freq: 1,
            ..Self::default()
        }
    }

    /// Set the simplex pivot budget.
    pub fn with_max_pivots(mut self, pivots: usize) -> Self {
        self.max_pivots = pivots;
        self
    }

    /// Set the branch-and-bound node budget.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Set the node selection strategy.
    pub fn with_node_selection(mut self, selection: NodeSelection) -> Self {
        self.node_selection = selection;
        self
    }
}
