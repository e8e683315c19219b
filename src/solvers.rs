//! Solvers for assignment models

use thiserror::Error;

use crate::model::{Model, VarId};

pub mod milp;

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// A constraint or objective refers to a variable the model never declared.
    #[error("{context} refers to undeclared variable #{index}")]
    UnknownVariable {
        /// Constraint or objective name
        context: String,

        /// Position of the missing variable
        index: usize,
    },

    /// An indicator constraint's left-hand side has no finite bounds, so it cannot be
    /// rewritten as a linear constraint.
    #[error("indicator constraint {constraint} has an unbounded left-hand side")]
    UnboundedIndicator {
        /// Name of the indicator's constraint
        constraint: String,
    },

    /// The backend cannot solve objectives spread across several priority levels.
    #[error("objectives use {levels} priority levels; only one is supported")]
    UnsupportedObjectives {
        /// Number of distinct priority levels in the model
        levels: usize,
    },
}

/// How a solve ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal solution was found.
    Optimal,

    /// The constraints cannot all be satisfied.
    Infeasible,

    /// The objective can grow without limit.
    Unbounded,

    /// The backend gave up for another reason.
    Aborted(String),
}

impl SolveStatus {
    /// Whether variable values are available.
    pub fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal)
    }
}

/// Status and variable values of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    status: SolveStatus,
    values: Vec<f64>,
}

impl SolveOutcome {
    /// An optimal solve with one value per declared variable.
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
        }
    }

    /// A solve that produced no values.
    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    /// How the solve ended.
    pub fn status(&self) -> &SolveStatus {
        &self.status
    }

    /// Value of a variable, zero when the solve produced no values.
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    /// Whether a binary variable is set.
    ///
    /// The solver returns floats, so values above [`BINARY_THRESHOLD`] count as 1 to
    /// tolerate numerical noise.
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > BINARY_THRESHOLD
    }

    /// All values, indexed by [`VarId::index`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Trait for solving assignment models
pub trait Solver {
    /// Solve the given model
    ///
    /// Infeasible, unbounded and aborted solves are reported through
    /// [`SolveOutcome::status`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be handed to the backend.
    fn solve(model: &Model) -> Result<SolveOutcome, SolverError>;
}

#[cfg(test)]
mod tests {
    use crate::model::Sense;

    use super::*;

    #[test]
    fn missing_values_read_as_zero() {
        let mut model = Model::new("test", Sense::Maximise);
        let x = model.add_binary("x");

        let outcome = SolveOutcome::without_solution(SolveStatus::Infeasible);

        assert!(outcome.value(x).abs() < f64::EPSILON);
        assert!(!outcome.is_set(x));
        assert!(!outcome.status().is_optimal());
    }

    #[test]
    fn binary_threshold_tolerates_noise() {
        let mut model = Model::new("test", Sense::Maximise);
        let x = model.add_binary("x");
        let y = model.add_binary("y");

        let outcome = SolveOutcome::optimal(vec![0.999_999, 1e-9]);

        assert!(outcome.is_set(x));
        assert!(!outcome.is_set(y));
        assert!(outcome.status().is_optimal());
    }
}
