//! Preprocessing
//!
//! Turns raw element, device and user attributes into the normalized importance,
//! compatibility and access matrices consumed by the model builder.

use num_traits::ToPrimitive;
use tracing::debug;

use crate::{
    config::{OptimizerConfig, Thresholds},
    devices::{CompatibilityMetric, Device},
    elements::Element,
    matrix::Matrix,
    problem::{Problem, ProblemError},
    users::User,
};

pub mod noise;

/// The five matrices derived from a [`Problem`].
///
/// Rows and columns are positions in the problem's name-sorted collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrices {
    /// Per-user importance of each element (elements x users), normalized per user.
    pub element_user_importance: Matrix<f64>,

    /// Access-weighted importance of each element on each device (elements x
    /// devices), normalized per device.
    pub element_device_importance: Matrix<f64>,

    /// Compatibility of each element with each device (elements x devices),
    /// normalized per device.
    pub element_device_compatibility: Matrix<f64>,

    /// Whether a user may see a device (users x devices).
    pub user_device_access: Matrix<bool>,

    /// Whether a user may see an element (users x elements).
    pub user_element_access: Matrix<bool>,
}

impl Matrices {
    /// Sort and validate the collections, then build their matrices with the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ProblemError`] if the collections are inconsistent.
    pub fn from_collections(
        elements: &[Element],
        devices: &[Device],
        users: &[User],
    ) -> Result<Self, ProblemError> {
        let problem = Problem::new(elements, devices, users)?;

        Ok(build_matrices(&problem, &OptimizerConfig::default()))
    }
}

/// Build the importance, compatibility and access matrices for a problem.
///
/// Access and importance feed back into each other: an element whose normalized
/// importance for a user is effectively zero is treated as inaccessible to that user,
/// and an element/device pair whose importance rests on a single user of a shared
/// device is discarded.
pub fn build_matrices(problem: &Problem<'_>, config: &OptimizerConfig) -> Matrices {
    let thresholds = config.thresholds;

    let mut element_user_importance = user_importance(problem);
    let user_device_access = user_device_access(problem);
    let mut user_element_access = user_element_access(problem, &mut element_user_importance);

    normalize_user_importance(
        &mut element_user_importance,
        &mut user_element_access,
        thresholds.access_epsilon,
    );

    let element_device_compatibility =
        compatibility(problem, config.compatibility_metric, thresholds.access_epsilon);

    let mut element_device_importance =
        aggregate_device_importance(&element_user_importance, &user_device_access);

    refine_device_importance(
        &mut element_device_importance,
        &user_device_access,
        &mut user_element_access,
        &thresholds,
    );

    let mut matrices = Matrices {
        element_user_importance,
        element_device_importance,
        element_device_compatibility,
        user_device_access,
        user_element_access,
    };

    if config.noise.enabled {
        noise::apply(&mut matrices, &config.noise);
    }

    matrices
}

/// Default element importance with each user's overrides substituted.
fn user_importance(problem: &Problem<'_>) -> Matrix<f64> {
    let elements = problem.elements();
    let users = problem.users();

    Matrix::from_fn(elements.len(), users.len(), |e, u| {
        let Some(element) = elements.get(e) else {
            return 0.0;
        };

        users
            .get(u)
            .and_then(|user| user.importance_of(element.name()))
            .unwrap_or_else(|| element.importance())
    })
}

fn user_device_access(problem: &Problem<'_>) -> Matrix<bool> {
    let users = problem.users();
    let devices = problem.devices();

    Matrix::from_fn(users.len(), devices.len(), |u, d| {
        matches!((users.get(u), devices.get(d)), (Some(user), Some(device)) if device.is_authorized(user))
    })
}

/// Element visibility per user. Importance of hidden elements is forced to zero.
fn user_element_access(
    problem: &Problem<'_>,
    element_user_importance: &mut Matrix<f64>,
) -> Matrix<bool> {
    let users = problem.users();
    let elements = problem.elements();
    let mut access = Matrix::new(users.len(), elements.len());

    for (e, element) in elements.iter().enumerate() {
        for (u, user) in users.iter().enumerate() {
            if element.user_has_access(user) {
                access.set(u, e, true);
            } else {
                element_user_importance.set(e, u, 0.0);
            }
        }
    }

    access
}

/// Mask importance by access, normalize per user and revoke access where the
/// normalized importance is effectively zero.
fn normalize_user_importance(
    element_user_importance: &mut Matrix<f64>,
    user_element_access: &mut Matrix<bool>,
    epsilon: f64,
) {
    let elements = element_user_importance.rows();
    let users = element_user_importance.cols();

    for e in 0..elements {
        for u in 0..users {
            if !user_element_access.at(u, e) {
                element_user_importance.set(e, u, 0.0);
            }
        }
    }

    for u in 0..users {
        element_user_importance.normalize_column(u, epsilon);
    }

    let mut revoked = 0_usize;

    for e in 0..elements {
        for u in 0..users {
            if element_user_importance.at(e, u) < epsilon && user_element_access.at(u, e) {
                user_element_access.set(u, e, false);
                revoked += 1;
            }
        }
    }

    debug!(revoked, "revoked element access for zero-importance pairs");
}

fn compatibility(problem: &Problem<'_>, metric: CompatibilityMetric, epsilon: f64) -> Matrix<f64> {
    let elements = problem.elements();
    let devices = problem.devices();

    let mut compatibility = Matrix::from_fn(elements.len(), devices.len(), |e, d| {
        match (elements.get(e), devices.get(d)) {
            (Some(element), Some(device)) => device.compatibility(element, metric),
            _ => 0.0,
        }
    });

    for d in 0..devices.len() {
        compatibility.normalize_column(d, epsilon);
    }

    compatibility
}

/// Sum user importance over each device's users, averaged by the number of users on
/// the device.
fn aggregate_device_importance(
    element_user_importance: &Matrix<f64>,
    user_device_access: &Matrix<bool>,
) -> Matrix<f64> {
    let elements = element_user_importance.rows();
    let users = element_user_importance.cols();
    let devices = user_device_access.cols();

    let mut importance = Matrix::from_fn(elements, devices, |e, d| {
        (0..users)
            .filter(|&u| user_device_access.at(u, d))
            .map(|u| element_user_importance.at(e, u))
            .sum()
    });

    for d in 0..devices {
        let device_users = user_device_access.count_column(d);

        if device_users > 0 {
            importance.divide_column(d, device_users.to_f64().unwrap_or(1.0));
        }
    }

    importance
}

/// Discard element/device importance that rests on a single user of a shared device.
///
/// When a device has several users but exactly one of them can also see the element,
/// the aggregated importance is zeroed and every other user's access to the element
/// is revoked. Each device column is renormalized afterwards.
fn refine_device_importance(
    element_device_importance: &mut Matrix<f64>,
    user_device_access: &Matrix<bool>,
    user_element_access: &mut Matrix<bool>,
    thresholds: &Thresholds,
) {
    let elements = element_device_importance.rows();
    let devices = element_device_importance.cols();
    let users = user_device_access.rows();

    for d in 0..devices {
        let shared = user_device_access.count_column(d) > 1;

        for e in 0..elements {
            let combined: Vec<bool> = (0..users)
                .map(|u| user_element_access.at(u, e) && user_device_access.at(u, d))
                .collect();

            if shared && combined.iter().filter(|&&both| both).count() == 1 {
                element_device_importance.set(e, d, 0.0);

                for (u, _) in combined.iter().enumerate().filter(|(_, both)| !**both) {
                    user_element_access.set(u, e, false);
                }
            }
        }

        element_device_importance.normalize_column(d, thresholds.access_epsilon);
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        elements::Size,
        properties::Properties,
        test_support::{device, element},
    };

    use super::*;

    fn assert_unit_range(matrix: &Matrix<f64>) {
        if let Some((lo, hi)) = matrix.value_range() {
            assert!(lo >= 0.0, "minimum {lo} below zero");
            assert!(hi <= 1.0, "maximum {hi} above one");
        }
    }

    #[test]
    fn user_overrides_replace_default_importance() -> TestResult {
        let elements = [element("a", 2.0, "5000")?, element("b", 4.0, "5000")?];
        let devices = [device("screen", 1000, 1000, "5000", &["u1", "u2"])?];
        let users = [User::new("u1").with_importance("a", 8.0), User::new("u2")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        // u1: a=8, b=4 -> normalized by 8
        assert!((matrices.element_user_importance.at(0, 0) - 1.0).abs() < 1e-12);
        assert!((matrices.element_user_importance.at(1, 0) - 0.5).abs() < 1e-12);

        // u2: a=2, b=4 -> normalized by 4
        assert!((matrices.element_user_importance.at(0, 1) - 0.5).abs() < 1e-12);
        assert!((matrices.element_user_importance.at(1, 1) - 1.0).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn hidden_elements_have_zero_importance_and_no_access() -> TestResult {
        let elements = [
            element("public", 1.0, "5000")?,
            element("secret", 10.0, "5000")?.visible_to(["boss"]),
        ];
        let devices = [device("screen", 1000, 1000, "5000", &["boss", "guest"])?];
        let users = [User::new("boss"), User::new("guest")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        // users sorted: boss(0), guest(1); elements sorted: public(0), secret(1)
        assert!(matrices.user_element_access.at(0, 1));
        assert!(!matrices.user_element_access.at(1, 1));
        assert!(matrices.element_user_importance.at(1, 1).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn zero_importance_revokes_access() -> TestResult {
        let elements = [element("a", 0.0, "5000")?, element("b", 3.0, "5000")?];
        let devices = [device("screen", 1000, 1000, "5000", &["u"])?];
        let users = [User::new("u")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        assert!(!matrices.user_element_access.at(0, 0));
        assert!(matrices.user_element_access.at(0, 1));

        Ok(())
    }

    #[test]
    fn all_zero_user_column_stays_zero() -> TestResult {
        let elements = [element("a", 0.0, "5000")?];
        let devices = [device("screen", 1000, 1000, "5000", &["u"])?];
        let users = [User::new("u")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        assert!(matrices.element_user_importance.at(0, 0).abs() < f64::EPSILON);
        assert!(matrices.element_device_importance.at(0, 0).abs() < f64::EPSILON);
        assert!(!matrices.element_user_importance.at(0, 0).is_nan());

        Ok(())
    }

    #[test]
    fn compatibility_is_normalized_per_device() -> TestResult {
        let elements = [element("display", 1.0, "5000")?, element("typing", 1.0, "0500")?];
        let devices = [device("tv", 1000, 1000, "5000", &["u"])?];
        let users = [User::new("u")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        assert!((matrices.element_device_compatibility.at(0, 0) - 1.0).abs() < f64::EPSILON);
        assert!(matrices.element_device_compatibility.at(1, 0).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn device_importance_averages_over_device_users() -> TestResult {
        let elements = [element("a", 1.0, "5000")?, element("b", 1.0, "5000")?];
        let devices = [device("shared", 1000, 1000, "5000", &["u1", "u2"])?];
        let users = [
            User::new("u1").with_importance("b", 0.5),
            User::new("u2"),
        ];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        // a: (1 + 1) / 2 = 1.0, b: (0.5 + 1) / 2 = 0.75, then normalized by 1.0
        assert!((matrices.element_device_importance.at(0, 0) - 1.0).abs() < 1e-12);
        assert!((matrices.element_device_importance.at(1, 0) - 0.75).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn single_interested_user_on_shared_device_is_discarded() -> TestResult {
        let elements = [
            element("minutes", 0.0, "5000")?,
            element("time", 1.0, "5000")?,
        ];
        let devices = [
            device("laptop", 1280, 720, "5000", &["secretary"])?,
            device("whiteboard", 2600, 1950, "5000", &["chair", "secretary"])?,
        ];
        let users = [
            User::new("chair"),
            User::new("secretary").with_importance("minutes", 10.0),
        ];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        // elements: minutes(0), time(1); devices: laptop(0), whiteboard(1);
        // users: chair(0), secretary(1)
        assert!(matrices.element_device_importance.at(0, 1).abs() < f64::EPSILON);
        assert!(matrices.element_device_importance.at(0, 0) > 0.0);

        // The secretary keeps access, so the laptop can still carry the minutes.
        assert!(matrices.user_element_access.at(1, 0));
        assert!(!matrices.user_element_access.at(0, 0));

        // Time matters to both whiteboard users and is unaffected.
        assert!((matrices.element_device_importance.at(1, 1) - 1.0).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn refinement_revokes_other_users_outside_the_device() -> TestResult {
        let elements = [element("notes", 1.0, "5000")?.visible_to(["a", "c"])];
        let devices = [
            device("phone", 400, 700, "5000", &["a"])?,
            device("table", 1000, 1000, "5000", &["a", "b"])?,
        ];
        let users = [User::new("a"), User::new("b"), User::new("c")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        // On the table only `a` can see the notes, so `c` (who is not on the table)
        // loses access as well.
        assert!(matrices.user_element_access.at(0, 0));
        assert!(!matrices.user_element_access.at(2, 0));

        Ok(())
    }

    #[test]
    fn normalized_matrices_stay_in_unit_range() -> TestResult {
        let elements = [
            element("a", 3.0, "5050")?,
            element("b", 7.0, "1052")?,
            element("c", 0.5, "2511")?,
        ];
        let devices = [
            device("tv", 1920, 1080, "5050", &["x", "y"])?,
            device("phone", 400, 700, "2340", &["y"])?,
        ];
        let users = [User::new("x").with_importance("c", 30.0), User::new("y")];

        let problem = Problem::new(&elements, &devices, &users)?;
        let matrices = build_matrices(&problem, &OptimizerConfig::default());

        assert_unit_range(&matrices.element_user_importance);
        assert_unit_range(&matrices.element_device_importance);
        assert_unit_range(&matrices.element_device_compatibility);

        Ok(())
    }

    #[test]
    fn rebuilding_without_noise_is_identical() -> TestResult {
        let elements = [element("a", 3.0, "5050")?, element("b", 7.0, "1052")?];
        let devices = [device("tv", 1920, 1080, "5050", &["x", "y"])?];
        let users = [User::new("x"), User::new("y").with_importance("a", 9.0)];

        let problem = Problem::new(&elements, &devices, &users)?;
        let config = OptimizerConfig::default();

        assert_eq!(
            build_matrices(&problem, &config),
            build_matrices(&problem, &config)
        );

        Ok(())
    }

    #[test]
    fn from_collections_uses_sorted_order() -> TestResult {
        let elements = [
            Element::new("z", 1.0, Size::new(1, 1), Size::new(1, 1), Properties::default())?,
            element("a", 2.0, "5000")?,
        ];
        let devices = [device("tv", 100, 100, "5000", &["u"])?];
        let users = [User::new("u")];

        let matrices = Matrices::from_collections(&elements, &devices, &users)?;

        // "a" sorts first and has the highest importance.
        assert!((matrices.element_user_importance.at(0, 0) - 1.0).abs() < 1e-12);
        assert!((matrices.element_user_importance.at(1, 0) - 0.5).abs() < 1e-12);

        Ok(())
    }
}
