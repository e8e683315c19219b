//! Optimizer
//!
//! Runs the whole pipeline: validate and sort the input, build the matrices, formulate
//! the model, solve it and read the assignment back.

use std::{
    marker::PhantomData,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{Span, info};

use crate::{
    assignment::{Assignment, Coverage},
    config::OptimizerConfig,
    devices::Device,
    elements::Element,
    model::build_model,
    preprocess::build_matrices,
    problem::{Problem, ProblemError},
    solvers::{SolveStatus, Solver, SolverError, milp::MILPSolver},
    users::User,
};

/// Errors that stop an optimization before a result exists.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Invalid input collections
    #[error(transparent)]
    Problem(#[from] ProblemError),

    /// The model could not be handed to the solver
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Result of one optimization.
#[derive(Debug, Clone)]
pub struct Optimization<'a> {
    assignment: Assignment<'a>,
    coverage: Coverage<'a>,
    status: Option<SolveStatus>,
    elapsed: Duration,
}

impl<'a> Optimization<'a> {
    /// Device to element mapping; every input device is present.
    pub fn assignment(&self) -> &Assignment<'a> {
        &self.assignment
    }

    /// Per-user coverage of the assignment
    pub fn coverage(&self) -> &Coverage<'a> {
        &self.coverage
    }

    /// How the solve ended, or `None` when the input was too small to build a model.
    pub fn status(&self) -> Option<&SolveStatus> {
        self.status.as_ref()
    }

    /// Time spent building and solving the model
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// [`Optimization::elapsed`] in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// The mapping and elapsed seconds.
    pub fn into_parts(self) -> (Assignment<'a>, f64) {
        let seconds = self.elapsed_seconds();

        (self.assignment, seconds)
    }
}

/// Assigns elements to devices with a configurable solver backend.
#[derive(Debug, Clone)]
pub struct Optimizer<S = MILPSolver> {
    config: OptimizerConfig,
    solver: PhantomData<S>,
}

impl Optimizer {
    /// Optimizer using the default MILP backend.
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_solver(config)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl<S: Solver> Optimizer<S> {
    /// Optimizer using the solver `S`.
    pub fn with_solver(config: OptimizerConfig) -> Self {
        Self {
            config,
            solver: PhantomData,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Place elements on devices.
    ///
    /// When any collection is empty no model is built: every device maps to an empty
    /// list and the elapsed time is zero. A solve that does not reach optimality also
    /// maps every device to an empty list, with the time actually spent.
    ///
    /// # Errors
    ///
    /// Returns an [`OptimizeError`] if the collections are invalid or the model
    /// cannot be handed to the solver.
    #[tracing::instrument(
        name = "mosaic.optimizer.optimize",
        skip(self, elements, devices, users),
        fields(
            element_count = elements.len(),
            device_count = devices.len(),
            user_count = users.len(),
            status = tracing::field::Empty,
            elapsed_ms = tracing::field::Empty
        ),
        err
    )]
    pub fn optimize<'a>(
        &self,
        elements: &'a [Element],
        devices: &'a [Device],
        users: &'a [User],
    ) -> Result<Optimization<'a>, OptimizeError> {
        let problem = Problem::new(elements, devices, users)?;

        if problem.is_degenerate() {
            info!("nothing to place");

            return Ok(Optimization {
                assignment: Assignment::empty(&problem),
                coverage: Coverage::none(),
                status: None,
                elapsed: Duration::ZERO,
            });
        }

        let matrices = build_matrices(&problem, &self.config);

        let started_at = Instant::now();

        let built = build_model(&problem, &matrices, &self.config);
        let outcome = S::solve(&built.model)?;

        let elapsed = started_at.elapsed();

        let assignment = Assignment::extract(&problem, &built, &outcome);
        let coverage = Coverage::measure(
            &problem,
            &matrices,
            &assignment,
            outcome.value(built.min_coverage_ratio),
        );

        let span = Span::current();

        span.record("status", tracing::field::debug(outcome.status()));
        span.record("elapsed_ms", tracing::field::display(elapsed.as_millis()));

        info!(
            status = ?outcome.status(),
            placements = assignment.placement_count(),
            elapsed_seconds = elapsed.as_secs_f64(),
            "optimization finished"
        );

        Ok(Optimization {
            assignment,
            coverage,
            status: Some(outcome.status().clone()),
            elapsed,
        })
    }
}

/// Place elements on devices with the default configuration and solver.
///
/// # Errors
///
/// Returns an [`OptimizeError`] if the collections are invalid or the model cannot be
/// handed to the solver.
pub fn optimize<'a>(
    elements: &'a [Element],
    devices: &'a [Device],
    users: &'a [User],
) -> Result<Optimization<'a>, OptimizeError> {
    Optimizer::default().optimize(elements, devices, users)
}
