//! Assignment model builder
//!
//! Declares the placement and coverage variables, the capacity, sizing, privacy and
//! pruning constraints, and the two weighted objective terms.

use num_traits::ToPrimitive;
use tracing::debug;

use crate::{
    config::OptimizerConfig,
    matrix::Matrix,
    model::{Constraint, LinearExpr, Model, Relation, Sense, VarId},
    preprocess::Matrices,
    problem::Problem,
};

/// Name of the quality objective component.
pub const QUALITY_OBJECTIVE: &str = "quality";

/// Name of the completeness objective component.
pub const COMPLETENESS_OBJECTIVE: &str = "completeness";

/// Coverage variables of one (user, element) pair the user can access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageVars {
    /// Number of the user's devices carrying the element
    pub num_elements: VarId,

    /// `min(num_elements, 1)`: whether the user can see the element anywhere
    pub has_element: VarId,

    /// Placements beyond the first on the user's devices
    pub num_replicated: VarId,
}

/// A built model together with the variable stores needed to read its solution.
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    /// The optimization problem
    pub model: Model,

    /// `assign[e, d]`: element `e` is placed on device `d` (elements x devices)
    pub assign: Matrix<VarId>,

    /// `size[e, d]`: area element `e` occupies on device `d` (elements x devices)
    pub size: Matrix<VarId>,

    /// Coverage variables (users x elements), `None` where the user has no access
    pub coverage: Matrix<Option<CoverageVars>>,

    /// Number of distinct accessible elements each user can see
    pub unique_elements: Vec<VarId>,

    /// Smallest per-user coverage ratio
    pub min_coverage_ratio: VarId,

    /// Whether `e` may be placed on `d` after privacy and zero-value pruning
    /// (elements x devices)
    pub element_device_access: Matrix<bool>,
}

/// Formulate the assignment problem for the given matrices.
///
/// The problem must not be degenerate; the optimizer short-circuits empty input
/// before building a model.
pub fn build_model(
    problem: &Problem<'_>,
    matrices: &Matrices,
    config: &OptimizerConfig,
) -> AssignmentModel {
    let mut builder = Builder::new(problem, matrices, config);

    builder.constrain_capacity();
    builder.constrain_sizes();

    let mut access = builder.element_device_access();
    builder.constrain_privacy_and_pruning(&mut access);
    builder.constrain_orphan_devices(&access);

    let (coverage, unique_elements) = builder.add_coverage_variables();
    let min_coverage_ratio = builder.add_min_coverage_ratio(&unique_elements);

    builder.add_objectives(&coverage, min_coverage_ratio);

    debug!(
        variables = builder.model.variables().len(),
        constraints = builder.model.constraints().len(),
        indicators = builder.model.indicators().len(),
        "built assignment model"
    );

    AssignmentModel {
        model: builder.model,
        assign: builder.assign,
        size: builder.size,
        coverage,
        unique_elements,
        min_coverage_ratio,
        element_device_access: access,
    }
}

struct Builder<'p, 'a> {
    problem: &'p Problem<'a>,
    matrices: &'p Matrices,
    config: &'p OptimizerConfig,
    model: Model,
    assign: Matrix<VarId>,
    size: Matrix<VarId>,
}

impl<'p, 'a> Builder<'p, 'a> {
    /// Declare one `assign`/`size` pair per (element, device).
    fn new(problem: &'p Problem<'a>, matrices: &'p Matrices, config: &'p OptimizerConfig) -> Self {
        let elements = problem.elements();
        let devices = problem.devices();

        let mut model = Model::new("device_assignment", Sense::Maximise);
        let mut assign = Matrix::new(elements.len(), devices.len());
        let mut size = Matrix::new(elements.len(), devices.len());

        for (e, element) in elements.iter().enumerate() {
            for (d, device) in devices.iter().enumerate() {
                let assigned = model.add_binary(format!("x_{}_{}", element.name(), device.name()));
                let occupied = model.add_integer(
                    format!("s_{}_{}", element.name(), device.name()),
                    0.0,
                    Some(area_to_f64(device.area())),
                );

                assign.set(e, d, assigned);
                size.set(e, d, occupied);
            }
        }

        Self {
            problem,
            matrices,
            config,
            model,
            assign,
            size,
        }
    }

    fn element_count(&self) -> usize {
        self.problem.elements().len()
    }

    fn device_count(&self) -> usize {
        self.problem.devices().len()
    }

    fn force_unassigned(&mut self, name: String, e: usize, d: usize) {
        let assigned = self.assign.at(e, d);

        self.model.add_constraint(Constraint::new(
            name,
            LinearExpr::sum([assigned]),
            Relation::Eq,
            0.0,
        ));
    }

    /// Occupied area on a device never exceeds its area.
    fn constrain_capacity(&mut self) {
        for (d, device) in self.problem.devices().iter().enumerate() {
            let occupied = LinearExpr::sum(self.size.column(d));

            self.model.add_constraint(Constraint::new(
                format!("capacity_constraint_{}", device.name()),
                occupied,
                Relation::Leq,
                area_to_f64(device.area()),
            ));
        }
    }

    /// Elements that do not fit a device are never placed on it, and the occupied
    /// size is zero when unassigned and within the element's bounds when assigned.
    fn constrain_sizes(&mut self) {
        for (d, device) in self.problem.devices().iter().enumerate() {
            for (e, element) in self.problem.elements().iter().enumerate() {
                let min = element.min_size();

                if min.width > device.width() || min.height > device.height() {
                    self.force_unassigned(
                        format!(
                            "min_size_exceeds_constraint_{}_on_{}",
                            element.name(),
                            device.name()
                        ),
                        e,
                        d,
                    );
                }

                let assigned = self.assign.at(e, d);
                let occupied = LinearExpr::sum([self.size.at(e, d)]);
                let max_area = element.max_area().min(device.area());

                self.model.add_indicator(
                    assigned,
                    false,
                    Constraint::new(
                        format!("size_zero_{}_{}", element.name(), device.name()),
                        occupied.clone(),
                        Relation::Eq,
                        0.0,
                    ),
                );
                self.model.add_indicator(
                    assigned,
                    true,
                    Constraint::new(
                        format!("size_min_{}_{}", element.name(), device.name()),
                        occupied.clone(),
                        Relation::Geq,
                        area_to_f64(element.min_area()),
                    ),
                );
                self.model.add_indicator(
                    assigned,
                    true,
                    Constraint::new(
                        format!("size_max_{}_{}", element.name(), device.name()),
                        occupied,
                        Relation::Leq,
                        area_to_f64(max_area),
                    ),
                );
            }
        }
    }

    /// `true` where at least one user can see both the element and the device.
    fn element_device_access(&self) -> Matrix<bool> {
        let users = self.problem.users().len();
        let device_access = &self.matrices.user_device_access;
        let element_access = &self.matrices.user_element_access;

        Matrix::from_fn(self.element_count(), self.device_count(), |e, d| {
            (0..users).any(|u| device_access.at(u, d) && element_access.at(u, e))
        })
    }

    /// Never place an element where no single user may see it, or where its
    /// importance or compatibility is effectively zero.
    fn constrain_privacy_and_pruning(&mut self, access: &mut Matrix<bool>) {
        let epsilon = self.config.thresholds.prune_epsilon;
        let mut pruned = 0_usize;

        for (d, device) in self.problem.devices().iter().enumerate() {
            for (e, element) in self.problem.elements().iter().enumerate() {
                let reason = if !access.at(e, d) {
                    "privacy"
                } else if self.matrices.element_device_importance.at(e, d) < epsilon {
                    "zero_importance"
                } else if self.matrices.element_device_compatibility.at(e, d) < epsilon {
                    "zero_compatibility"
                } else {
                    continue;
                };

                access.set(e, d, false);
                pruned += 1;

                self.force_unassigned(
                    format!("{reason}_{}_{}", element.name(), device.name()),
                    e,
                    d,
                );
            }
        }

        debug!(pruned, "pruned element/device pairs");
    }

    /// A device with nothing placeable on it carries no elements.
    fn constrain_orphan_devices(&mut self, access: &Matrix<bool>) {
        for (d, device) in self.problem.devices().iter().enumerate() {
            if !access.any_in_column(d) {
                self.model.add_constraint(Constraint::new(
                    format!("no_element_constraint_{}", device.name()),
                    LinearExpr::sum(self.assign.column(d)),
                    Relation::Eq,
                    0.0,
                ));
            }
        }
    }

    /// Elements a user can access, by position.
    fn user_elements(&self, u: usize) -> Vec<usize> {
        (0..self.element_count())
            .filter(|&e| self.matrices.user_element_access.at(u, e))
            .collect()
    }

    /// Devices a user can access, by position.
    fn user_devices(&self, u: usize) -> Vec<usize> {
        (0..self.device_count())
            .filter(|&d| self.matrices.user_device_access.at(u, d))
            .collect()
    }

    /// Per-user counts of how many of their devices carry each accessible element.
    fn add_coverage_variables(&mut self) -> (Matrix<Option<CoverageVars>>, Vec<VarId>) {
        let mut coverage = Matrix::new(self.problem.users().len(), self.element_count());
        let mut unique_elements = Vec::with_capacity(self.problem.users().len());

        for (u, user) in self.problem.users().iter().enumerate() {
            let user_devices = self.user_devices(u);
            let mut has_elements = LinearExpr::new();

            for e in self.user_elements(u) {
                let tag = format!(
                    "{}_{}",
                    user.name(),
                    self.problem.elements().get(e).map_or("", |el| el.name())
                );
                let placed = LinearExpr::sum(user_devices.iter().map(|&d| self.assign.at(e, d)));

                let num_elements =
                    self.model.add_integer(format!("user_num_elements_{tag}"), 0.0, None);
                let mut lhs = LinearExpr::sum([num_elements]);
                lhs.add_scaled(&placed, -1.0);
                self.model.add_constraint(Constraint::new(
                    format!("user_num_elements_{tag}"),
                    lhs,
                    Relation::Eq,
                    0.0,
                ));

                let has_element =
                    self.model.add_integer(format!("user_has_element_{tag}"), 0.0, None);
                self.model.add_constraint(Constraint::new(
                    format!("user_has_element_{tag}"),
                    LinearExpr::sum([has_element]).with_term(num_elements, -1.0),
                    Relation::Leq,
                    0.0,
                ));
                self.model.add_constraint(Constraint::new(
                    format!("user_has_element_max_{tag}"),
                    LinearExpr::sum([has_element]),
                    Relation::Leq,
                    1.0,
                ));

                let num_replicated = self.model.add_integer(
                    format!("user_num_replicated_elements_{tag}"),
                    0.0,
                    None,
                );
                let mut lhs = LinearExpr::sum([num_replicated]);
                lhs.add_scaled(&placed, -1.0);
                self.model.add_constraint(Constraint::new(
                    format!("user_num_replicated_elements_{tag}"),
                    lhs,
                    Relation::Geq,
                    -1.0,
                ));

                has_elements.add_term(has_element, 1.0);
                coverage.set(
                    u,
                    e,
                    Some(CoverageVars {
                        num_elements,
                        has_element,
                        num_replicated,
                    }),
                );
            }

            let unique =
                self.model
                    .add_integer(format!("user_num_unique_elements_{}", user.name()), 0.0, None);
            let mut lhs = LinearExpr::sum([unique]);
            lhs.add_scaled(&has_elements, -1.0);
            self.model.add_constraint(Constraint::new(
                format!("user_num_unique_elements_{}", user.name()),
                lhs,
                Relation::Eq,
                0.0,
            ));

            unique_elements.push(unique);
        }

        (coverage, unique_elements)
    }

    /// Worst-case coverage ratio over every user with at least one accessible element.
    fn add_min_coverage_ratio(&mut self, unique_elements: &[VarId]) -> VarId {
        let ratio = self
            .model
            .add_continuous("min_ratio_unique_elements", 0.0, Some(1.0));

        for (u, user) in self.problem.users().iter().enumerate() {
            let accessible = self.user_elements(u).len();

            if let Some(&unique) = unique_elements.get(u)
                && accessible > 0
            {
                self.model.add_constraint(Constraint::new(
                    format!("min_ratio_unique_elements_{}", user.name()),
                    LinearExpr::sum([ratio]).with_term(unique, -1.0 / count_to_f64(accessible)),
                    Relation::Leq,
                    0.0,
                ));
            }
        }

        ratio
    }

    /// Register the quality and completeness terms as separate weighted components.
    fn add_objectives(&mut self, coverage: &Matrix<Option<CoverageVars>>, min_ratio: VarId) {
        let mut quality = LinearExpr::new();

        for (d, device) in self.problem.devices().iter().enumerate() {
            let area = area_to_f64(device.area());

            for e in 0..self.element_count() {
                let coefficient = self.matrices.element_device_compatibility.at(e, d)
                    * self.matrices.element_device_importance.at(e, d)
                    / area;

                if coefficient != 0.0 {
                    quality.add_term(self.size.at(e, d), coefficient);
                }
            }
        }

        let user_count = count_to_f64(self.problem.users().len());
        let mut completeness = LinearExpr::new();

        for u in 0..self.problem.users().len() {
            let elements = self.user_elements(u);

            if self.user_devices(u).is_empty() || elements.is_empty() {
                continue;
            }

            let weight = 1.0 / (count_to_f64(elements.len()) * user_count);

            for e in elements {
                if let Some(vars) = coverage.at(u, e) {
                    completeness.add_term(vars.has_element, weight);
                }
            }
        }

        completeness.add_term(min_ratio, 1.0);

        let weights = self.config.weights;

        self.model
            .add_objective(QUALITY_OBJECTIVE, quality, weights.quality, 0);
        self.model
            .add_objective(COMPLETENESS_OBJECTIVE, completeness, weights.completeness, 0);
    }
}

/// Convert an area to a solver coefficient.
fn area_to_f64(area: u64) -> f64 {
    area.to_f64().unwrap_or(f64::MAX)
}

fn count_to_f64(count: usize) -> f64 {
    count.to_f64().unwrap_or(f64::MAX)
}
