//! MILP Model
//!
//! A backend-agnostic description of a mixed integer program: variables with
//! bounds, linear and indicator constraints and weighted objective components. The
//! builder records everything here and a [`Solver`](crate::solvers::Solver) turns it
//! into a concrete backend problem.

use std::fmt;

use smallvec::SmallVec;

pub mod builder;

pub use builder::{AssignmentModel, CoverageVars, build_model};

/// Handle to a variable declared in a [`Model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in [`Model::variables`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// 0 or 1.
    Binary,

    /// Whole numbers within the bounds.
    Integer,

    /// Real numbers within the bounds.
    Continuous,
}

/// Declared decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Diagnostic name
    pub name: String,

    /// Variable domain
    pub kind: VariableKind,

    /// Lower bound
    pub lower: f64,

    /// Upper bound, `None` for unbounded
    pub upper: Option<f64>,
}

/// Linear combination of variables plus a constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: SmallVec<[(VarId, f64); 8]>,
    constant: f64,
}

impl LinearExpr {
    /// Empty expression (zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the given variables with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut expr = Self::new();

        for var in vars {
            expr.add_term(var, 1.0);
        }

        expr
    }

    /// Add `coefficient * var`.
    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Builder form of [`LinearExpr::add_term`].
    #[must_use]
    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    /// Add a constant offset.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Append every term of `other`, scaled by `factor`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        for &(var, coefficient) in &other.terms {
            self.add_term(var, coefficient * factor);
        }

        self.constant += other.constant * factor;
    }

    /// Variable terms.
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// Constant offset.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Whether the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression with `value` giving each variable's value.
    pub fn eval(&self, value: impl Fn(VarId) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coefficient)| coefficient * value(var))
            .sum::<f64>()
            + self.constant
    }
}

/// Relation operator for a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Eq => "=",
            Relation::Leq => "<=",
            Relation::Geq => ">=",
        })
    }
}

/// Named linear constraint `lhs (relation) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Diagnostic name
    pub name: String,

    /// Left-hand side expression
    pub lhs: LinearExpr,

    /// Relation operator
    pub relation: Relation,

    /// Right-hand side scalar
    pub rhs: f64,
}

impl Constraint {
    /// Create a named constraint.
    pub fn new(name: impl Into<String>, lhs: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            relation,
            rhs,
        }
    }

    /// Whether the constraint holds for the given values, within `tolerance`.
    pub fn is_satisfied(&self, value: impl Fn(VarId) -> f64, tolerance: f64) -> bool {
        let lhs = self.lhs.eval(value);

        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
            Relation::Leq => lhs <= self.rhs + tolerance,
            Relation::Geq => lhs >= self.rhs - tolerance,
        }
    }
}

/// Constraint that only applies when a binary variable takes a given value.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConstraint {
    /// Binary variable that switches the constraint on
    pub condition: VarId,

    /// Value of `condition` for which the constraint applies
    pub active_when: bool,

    /// Constraint enforced while active
    pub constraint: Constraint,
}

impl IndicatorConstraint {
    /// Whether the indicator holds for the given values, within `tolerance`.
    pub fn is_satisfied(&self, value: impl Fn(VarId) -> f64, tolerance: f64) -> bool {
        let active = value(self.condition) > 0.5;

        active != self.active_when || self.constraint.is_satisfied(value, tolerance)
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Maximise the objective
    Maximise,

    /// Minimise the objective
    Minimise,
}

/// One weighted component of a multi-objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Diagnostic name
    pub name: String,

    /// Expression to optimize
    pub expr: LinearExpr,

    /// Weight within its priority level
    pub weight: f64,

    /// Priority level; components sharing a level are blended by weight
    pub priority: i32,
}

/// Complete optimization problem.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    sense: Sense,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    indicators: Vec<IndicatorConstraint>,
    objectives: Vec<Objective>,
}

impl Model {
    /// Create an empty model.
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        Self {
            name: name.into(),
            sense,
            variables: Vec::new(),
            constraints: Vec::new(),
            indicators: Vec::new(),
            objectives: Vec::new(),
        }
    }

    fn add_variable(&mut self, variable: Variable) -> VarId {
        self.variables.push(variable);

        VarId(self.variables.len() - 1)
    }

    /// Declare a 0/1 variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(Variable {
            name: name.into(),
            kind: VariableKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
        })
    }

    /// Declare an integer variable in `[lower, upper]`.
    pub fn add_integer(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        self.add_variable(Variable {
            name: name.into(),
            kind: VariableKind::Integer,
            lower,
            upper,
        })
    }

    /// Declare a continuous variable in `[lower, upper]`.
    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: Option<f64>,
    ) -> VarId {
        self.add_variable(Variable {
            name: name.into(),
            kind: VariableKind::Continuous,
            lower,
            upper,
        })
    }

    /// Record a linear constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Record an indicator constraint: if `condition == active_when` then `constraint`.
    pub fn add_indicator(&mut self, condition: VarId, active_when: bool, constraint: Constraint) {
        self.indicators.push(IndicatorConstraint {
            condition,
            active_when,
            constraint,
        });
    }

    /// Register a weighted objective component.
    pub fn add_objective(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        weight: f64,
        priority: i32,
    ) {
        self.objectives.push(Objective {
            name: name.into(),
            expr,
            weight,
            priority,
        });
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optimization direction.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Declared variables, indexed by [`VarId::index`].
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Declaration of one variable.
    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(var.0)
    }

    /// Linear constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Indicator constraints.
    pub fn indicators(&self) -> &[IndicatorConstraint] {
        &self.indicators
    }

    /// Objective components.
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Find a linear constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Whether every bound, linear and indicator constraint holds for `values`
    /// (indexed by [`VarId::index`]).
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        let value = |var: VarId| values.get(var.0).copied().unwrap_or(0.0);

        let bounds_hold = self.variables.iter().enumerate().all(|(i, variable)| {
            let v = values.get(i).copied().unwrap_or(0.0);
            let integral = variable.kind == VariableKind::Continuous
                || (v - v.round()).abs() <= tolerance;

            integral
                && v >= variable.lower - tolerance
                && variable.upper.is_none_or(|upper| v <= upper + tolerance)
        });

        bounds_hold
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(value, tolerance))
            && self
                .indicators
                .iter()
                .all(|i| i.is_satisfied(value, tolerance))
    }
}
