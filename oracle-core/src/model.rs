//! Declarative linear model representation.
//!
//! A [`LinearModel`] is plain data: variable declarations with bounds and
//! integrality flags, linear constraints stored as sparse rows, and a single
//! linear objective. Any [`crate::LpOracle`] implementation consumes it.
//!
//! ```text
//! minimize / maximize   c^T x + c0
//! subject to            a_i^T x  (<= | >= | ==)  b_i     for each constraint i
//!                       l_j <= x_j <= u_j                 for each variable j
//!                       x_j integer                       for integer variables
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{OracleError, OracleResult};

/// Sparse constraint row.
pub type SparseRow = sprs::CsVec<f64>;

/// Index of a variable in a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl VarId {
    /// Position of the variable in the model.
    pub fn idx(&self) -> usize {
        self.0
    }
}

/// Index of a constraint in a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstrId(pub usize);

impl ConstrId {
    /// Position of the constraint in the model.
    pub fn idx(&self) -> usize {
        self.0
    }
}

/// Variable type for mixed-integer models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary variable (0 or 1)
    Binary,
}

impl VarType {
    /// True for integer and binary variables.
    pub fn is_integer(&self) -> bool {
        !matches!(self, VarType::Continuous)
    }
}

/// Variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Display name.
    pub name: String,
    /// Lower bound (`f64::NEG_INFINITY` = free below).
    pub lower: f64,
    /// Upper bound (`f64::INFINITY` = free above).
    pub upper: f64,
    /// Integrality restriction.
    pub var_type: VarType,
}

impl Variable {
    /// True when lower and upper bound coincide.
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }
}

/// Relational operator of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// `a^T x <= b`
    LessEqual,
    /// `a^T x >= b`
    GreaterEqual,
    /// `a^T x == b`
    Equal,
}

impl ConstraintSense {
    fn symbol(&self) -> &'static str {
        match self {
            ConstraintSense::LessEqual => "<=",
            ConstraintSense::GreaterEqual => ">=",
            ConstraintSense::Equal => "=",
        }
    }
}

/// A linear constraint `coefs^T x (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Display name.
    pub name: String,
    /// Coefficient row (sparse, indexed by variable position).
    pub coefs: SparseRow,
    /// Relational operator.
    pub sense: ConstraintSense,
    /// Right-hand side.
    pub rhs: f64,
}

impl Constraint {
    /// Evaluate `coefs^T x`.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefs.iter().map(|(j, &a)| a * x[j]).sum()
    }

    /// Amount by which `x` violates this constraint (0 if satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.activity(x);
        match self.sense {
            ConstraintSense::LessEqual => (lhs - self.rhs).max(0.0),
            ConstraintSense::GreaterEqual => (self.rhs - lhs).max(0.0),
            ConstraintSense::Equal => (lhs - self.rhs).abs(),
        }
    }

    /// Render the constraint with variable names, e.g. `c1: 2 x + y <= 5`.
    pub fn display<'a>(&'a self, vars: &'a [Variable]) -> ConstraintDisplay<'a> {
        ConstraintDisplay { constraint: self, vars }
    }
}

/// Helper returned by [`Constraint::display`].
pub struct ConstraintDisplay<'a> {
    constraint: &'a Constraint,
    vars: &'a [Variable],
}

impl fmt::Display for ConstraintDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.constraint.name)?;
        write_terms(f, self.constraint.coefs.iter().map(|(j, &a)| (j, a)), self.vars)?;
        write!(f, " {} {}", self.constraint.sense.symbol(), self.constraint.rhs)
    }
}

fn write_terms(
    f: &mut fmt::Formatter<'_>,
    terms: impl Iterator<Item = (usize, f64)>,
    vars: &[Variable],
) -> fmt::Result {
    let mut first = true;
    for (j, a) in terms {
        let name = vars.get(j).map(|v| v.name.as_str()).unwrap_or("?");
        let mag = a.abs();
        if first {
            if a < 0.0 {
                write!(f, "-")?;
            }
        } else if a < 0.0 {
            write!(f, " - ")?;
        } else {
            write!(f, " + ")?;
        }
        if mag != 1.0 {
            write!(f, "{} ", mag)?;
        }
        write!(f, "{}", name)?;
        first = false;
    }
    if first {
        write!(f, "0")?;
    }
    Ok(())
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    /// Minimize the objective.
    #[default]
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// Linear objective `coefs^T x + constant`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Objective {
    /// Optimization direction.
    pub sense: ObjectiveSense,
    /// Dense coefficient vector (one entry per variable).
    pub coefs: Vec<f64>,
    /// Constant offset.
    pub constant: f64,
}

/// A linear or mixed-integer linear model.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl LinearModel {
    /// Create an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a variable. Binary variables are clamped to `[0, 1]`.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        var_type: VarType,
    ) -> VarId {
        let (lower, upper) = match var_type {
            VarType::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper,
            var_type,
        });
        self.objective.coefs.push(0.0);
        id
    }

    /// Add a constraint `sum(coef * var) (sense) rhs`.
    ///
    /// Repeated variables are summed and zero coefficients dropped.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> OracleResult<ConstrId> {
        let coefs = self.sparse_row(terms)?;
        let id = ConstrId(self.constraints.len());
        self.constraints.push(Constraint {
            name: name.into(),
            coefs,
            sense,
            rhs,
        });
        Ok(id)
    }

    /// Replace the objective.
    pub fn set_objective(
        &mut self,
        sense: ObjectiveSense,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        constant: f64,
    ) -> OracleResult<()> {
        let mut coefs = vec![0.0; self.variables.len()];
        for (var, coef) in terms {
            let slot = coefs.get_mut(var.0).ok_or_else(|| unknown_var(var, self.variables.len()))?;
            *slot += coef;
        }
        self.objective = Objective {
            sense,
            coefs,
            constant,
        };
        Ok(())
    }

    /// Overwrite the right-hand side of a constraint.
    pub fn set_rhs(&mut self, id: ConstrId, rhs: f64) -> OracleResult<()> {
        let n = self.constraints.len();
        let constraint = self.constraints.get_mut(id.0).ok_or_else(|| {
            OracleError::InvalidModel(format!("constraint {} out of range ({} constraints)", id.0, n))
        })?;
        constraint.rhs = rhs;
        Ok(())
    }

    /// Overwrite the bounds of a variable.
    pub fn set_var_bounds(&mut self, var: VarId, lower: f64, upper: f64) -> OracleResult<()> {
        let n = self.variables.len();
        let v = self.variables.get_mut(var.0).ok_or_else(|| unknown_var(var, n))?;
        v.lower = lower;
        v.upper = upper;
        Ok(())
    }

    /// Variable declaration.
    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    /// Constraint.
    pub fn constraint(&self, id: ConstrId) -> &Constraint {
        &self.constraints[id.0]
    }

    /// All variables, in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All constraints, in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Look up a variable by name.
    pub fn find_var(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    /// Look up a constraint by name.
    pub fn find_constraint(&self, name: &str) -> Option<ConstrId> {
        self.constraints.iter().position(|c| c.name == name).map(ConstrId)
    }

    /// Indices of integer (and binary) variables.
    pub fn integer_vars(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.var_type.is_integer())
            .map(|(j, _)| j)
            .collect()
    }

    /// True when the model has no integrality restrictions.
    pub fn is_continuous(&self) -> bool {
        self.variables.iter().all(|v| !v.var_type.is_integer())
    }

    /// Copy of the model with all integrality restrictions dropped.
    pub fn relaxed(&self) -> Self {
        let mut relaxed = self.clone();
        for v in &mut relaxed.variables {
            v.var_type = VarType::Continuous;
        }
        relaxed
    }

    /// Check that all data is finite where required and indices are in range.
    pub fn validate(&self) -> OracleResult<()> {
        let n = self.variables.len();
        if self.objective.coefs.len() != n {
            return Err(OracleError::DimensionMismatch(format!(
                "objective has {} coefficients, expected {}",
                self.objective.coefs.len(),
                n
            )));
        }
        if self.objective.coefs.iter().any(|c| !c.is_finite()) || !self.objective.constant.is_finite() {
            return Err(OracleError::InvalidModel("objective has non-finite coefficients".to_string()));
        }
        for v in &self.variables {
            if v.lower.is_nan() || v.upper.is_nan() {
                return Err(OracleError::InvalidModel(format!("variable {} has NaN bound", v.name)));
            }
            if v.lower == f64::INFINITY || v.upper == f64::NEG_INFINITY {
                return Err(OracleError::InvalidModel(format!(
                    "variable {} has bounds [{}, {}]",
                    v.name, v.lower, v.upper
                )));
            }
        }
        for c in &self.constraints {
            if !c.rhs.is_finite() || c.coefs.iter().any(|(_, a)| !a.is_finite()) {
                return Err(OracleError::InvalidModel(format!(
                    "constraint {} has non-finite data",
                    c.name
                )));
            }
            if let Some(&j) = c.coefs.indices().iter().find(|&&j| j >= n) {
                return Err(OracleError::DimensionMismatch(format!(
                    "constraint {} references variable {} but the model has {}",
                    c.name, j, n
                )));
            }
        }
        Ok(())
    }

    /// Evaluate the objective at `x`.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective
            .coefs
            .iter()
            .zip(x)
            .map(|(c, xi)| c * xi)
            .sum::<f64>()
            + self.objective.constant
    }

    /// Evaluate `a_i^T x` for one constraint.
    pub fn row_activity(&self, id: ConstrId, x: &[f64]) -> f64 {
        self.constraints[id.0].activity(x)
    }

    /// Largest constraint or bound violation at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let rows = self
            .constraints
            .iter()
            .map(|c| c.violation(x))
            .fold(0.0_f64, f64::max);
        let bounds = self
            .variables
            .iter()
            .zip(x)
            .map(|(v, &xj)| (v.lower - xj).max(xj - v.upper).max(0.0))
            .fold(0.0_f64, f64::max);
        rows.max(bounds)
    }

    fn sparse_row(&self, terms: impl IntoIterator<Item = (VarId, f64)>) -> OracleResult<SparseRow> {
        let n = self.variables.len();
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (var, coef) in terms {
            if var.0 >= n {
                return Err(unknown_var(var, n));
            }
            *merged.entry(var.0).or_insert(0.0) += coef;
        }
        let (indices, data): (Vec<usize>, Vec<f64>) =
            merged.into_iter().filter(|(_, a)| *a != 0.0).unzip();
        Ok(SparseRow::new(n, indices, data))
    }
}

fn unknown_var(var: VarId, n: usize) -> OracleError {
    OracleError::InvalidModel(format!("variable {} out of range ({} variables)", var.0, n))
}

impl fmt::Display for LinearModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sense = match self.objective.sense {
            ObjectiveSense::Minimize => "minimize",
            ObjectiveSense::Maximize => "maximize",
        };
        write!(f, "{} ", sense)?;
        write_terms(
            f,
            self.objective
                .coefs
                .iter()
                .enumerate()
                .filter(|(_, c)| **c != 0.0)
                .map(|(j, &c)| (j, c)),
            &self.variables,
        )?;
        if self.objective.constant != 0.0 {
            write!(f, " + {}", self.objective.constant)?;
        }
        writeln!(f)?;
        writeln!(f, "subject to")?;
        for c in &self.constraints {
            writeln!(f, "  {}", c.display(&self.variables))?;
        }
        writeln!(f, "bounds")?;
        for v in &self.variables {
            writeln!(f, "  {} <= {} <= {}", v.lower, v.name, v.upper)?;
        }
        let ints: Vec<&str> = self
            .variables
            .iter()
            .filter(|v| v.var_type.is_integer())
            .map(|v| v.name.as_str())
            .collect();
        if !ints.is_empty() {
            writeln!(f, "integer {}", ints.join(" "))?;
        }
        Ok(())
    }
}
