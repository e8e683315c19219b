//! Mosaic prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    assignment::{Assignment, Coverage, DeviceAssignment, PlacedElement, UserCoverage},
    config::{NoiseConfig, ObjectiveWeights, OptimizerConfig, Thresholds},
    devices::{CompatibilityMetric, Device, DeviceError},
    elements::{Element, ElementError, Size},
    optimizer::{OptimizeError, Optimization, Optimizer, optimize},
    problem::{Problem, ProblemError},
    properties::{Properties, PropertiesError},
    report::{Report, ReportError},
    scenarios::{Expectation, Scenario, ScenarioError},
    solvers::{SolveOutcome, SolveStatus, Solver, SolverError, milp::MILPSolver},
    users::User,
};
