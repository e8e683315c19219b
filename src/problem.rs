//! Problem

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{devices::Device, elements::Element, users::User};

/// Errors raised when the input collections are inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum ProblemError {
    /// Two elements share a name.
    #[error("duplicate element name: {0}")]
    DuplicateElement(String),

    /// Two devices share a name.
    #[error("duplicate device name: {0}")]
    DuplicateDevice(String),

    /// Two users share a name.
    #[error("duplicate user name: {0}")]
    DuplicateUser(String),

    /// A device authorizes a user that is not part of the problem.
    #[error("device {device:?} authorizes unknown user {user:?}")]
    UnknownUser {
        /// Device name
        device: String,

        /// Unknown user name
        user: String,
    },

    /// A user overrides an element's importance with a negative or non-finite value.
    #[error("user {user:?} has invalid importance {importance} for element {element:?}")]
    InvalidImportance {
        /// User name
        user: String,

        /// Element the override applies to
        element: String,

        /// Rejected importance
        importance: f64,
    },
}

/// Name-sorted views over the elements, devices and users of one optimization.
///
/// Every matrix and variable store in the crate is indexed by positions in these
/// sorted lists, which makes indices and results reproducible for identical input.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    elements: Vec<&'a Element>,
    devices: Vec<&'a Device>,
    users: Vec<&'a User>,
}

impl<'a> Problem<'a> {
    /// Sort and validate the input collections.
    ///
    /// # Errors
    ///
    /// Returns a [`ProblemError`] if names are duplicated within a collection, a
    /// device authorizes a user that is not in a non-empty `users`, or a user's
    /// importance override is negative or not finite.
    pub fn new(
        elements: &'a [Element],
        devices: &'a [Device],
        users: &'a [User],
    ) -> Result<Self, ProblemError> {
        let elements = sorted_unique(elements, Element::name, ProblemError::DuplicateElement)?;
        let devices = sorted_unique(devices, Device::name, ProblemError::DuplicateDevice)?;
        let users = sorted_unique(users, User::name, ProblemError::DuplicateUser)?;

        for user in &users {
            validate_overrides(user)?;
        }

        let user_names: FxHashSet<&str> = users.iter().map(|user| user.name()).collect();

        // Without users nothing is looked up; the problem is degenerate.
        let checked: &[&Device] = if users.is_empty() { &[] } else { &devices };

        for device in checked {
            // Report the alphabetically first unknown user so errors are stable.
            let mut unknown: Vec<&str> = device
                .authorized_users()
                .filter(|name| !user_names.contains(name))
                .collect();
            unknown.sort_unstable();

            if let Some(user) = unknown.first() {
                return Err(ProblemError::UnknownUser {
                    device: device.name().to_string(),
                    user: (*user).to_string(),
                });
            }
        }

        Ok(Self {
            elements,
            devices,
            users,
        })
    }

    /// Elements sorted by name.
    pub fn elements(&self) -> &[&'a Element] {
        &self.elements
    }

    /// Devices sorted by name.
    pub fn devices(&self) -> &[&'a Device] {
        &self.devices
    }

    /// Users sorted by name.
    pub fn users(&self) -> &[&'a User] {
        &self.users
    }

    /// Whether there is too little input to place anything.
    pub fn is_degenerate(&self) -> bool {
        self.elements.is_empty() || self.devices.is_empty() || self.users.is_empty()
    }
}

fn sorted_unique<'a, T>(
    items: &'a [T],
    name: fn(&T) -> &str,
    duplicate: fn(String) -> ProblemError,
) -> Result<Vec<&'a T>, ProblemError> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| name(a).cmp(name(b)));

    if let Some(pair) = sorted.windows(2).find(|pair| match pair {
        [a, b] => name(a) == name(b),
        _ => false,
    }) && let Some(first) = pair.first()
    {
        return Err(duplicate(name(first).to_string()));
    }

    Ok(sorted)
}

/// Reject the alphabetically first invalid override so errors are stable.
fn validate_overrides(user: &User) -> Result<(), ProblemError> {
    let mut invalid: Vec<(&String, f64)> = user
        .importance_overrides()
        .iter()
        .map(|(element, &importance)| (element, importance))
        .filter(|&(_, importance)| !importance.is_finite() || importance < 0.0)
        .collect();
    invalid.sort_unstable_by(|a, b| a.0.cmp(b.0));

    match invalid.first() {
        Some(&(element, importance)) => Err(ProblemError::InvalidImportance {
            user: user.name().to_string(),
            element: element.clone(),
            importance,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{elements::Size, properties::Properties};

    use super::*;

    fn element(name: &str) -> Result<Element, crate::elements::ElementError> {
        Element::new(
            name,
            1.0,
            Size::new(1, 1),
            Size::new(1, 1),
            Properties::default(),
        )
    }

    #[test]
    fn collections_are_sorted_by_name() -> TestResult {
        let elements = [element("b")?, element("a")?, element("c")?];
        let users = [User::new("z"), User::new("y")];
        let devices = [Device::new(
            "d",
            Size::new(1, 1),
            Properties::default(),
            ["y"],
        )?];

        let problem = Problem::new(&elements, &devices, &users)?;

        let names: Vec<&str> = problem.elements().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let names: Vec<&str> = problem.users().iter().map(|u| u.name()).collect();
        assert_eq!(names, ["y", "z"]);

        Ok(())
    }

    #[test]
    fn duplicate_names_are_rejected() -> TestResult {
        let elements = [element("a")?, element("a")?];

        let result = Problem::new(&elements, &[], &[]);

        assert_eq!(
            result.err(),
            Some(ProblemError::DuplicateElement("a".to_string()))
        );

        Ok(())
    }

    #[test]
    fn unknown_device_user_is_rejected() -> TestResult {
        let devices = [Device::new(
            "Laptop",
            Size::new(1, 1),
            Properties::default(),
            ["ghost"],
        )?];
        let users = [User::new("manager")];

        let result = Problem::new(&[], &devices, &users);

        assert_eq!(
            result.err(),
            Some(ProblemError::UnknownUser {
                device: "Laptop".to_string(),
                user: "ghost".to_string()
            })
        );

        Ok(())
    }

    #[test]
    fn negative_override_is_rejected() -> TestResult {
        let elements = [element("a")?];
        let users = [User::new("manager").with_importance("a", -8.0)];

        let result = Problem::new(&elements, &[], &users);

        assert_eq!(
            result.err(),
            Some(ProblemError::InvalidImportance {
                user: "manager".to_string(),
                element: "a".to_string(),
                importance: -8.0,
            })
        );

        Ok(())
    }

    #[test]
    fn non_finite_overrides_are_rejected() -> TestResult {
        let elements = [element("a")?];

        for importance in [f64::NAN, f64::INFINITY] {
            let users = [User::new("manager").with_importance("a", importance)];

            let result = Problem::new(&elements, &[], &users);

            assert!(
                matches!(result, Err(ProblemError::InvalidImportance { ref element, .. }) if element == "a"),
                "override {importance} accepted"
            );
        }

        Ok(())
    }

    #[test]
    fn empty_collection_is_degenerate() -> TestResult {
        let users = [User::new("manager")];
        let problem = Problem::new(&[], &[], &users)?;

        assert!(problem.is_degenerate());

        Ok(())
    }

    #[test]
    fn devices_may_name_users_when_no_users_are_given() -> TestResult {
        let devices = [Device::new(
            "Laptop",
            Size::new(1, 1),
            Properties::default(),
            ["manager"],
        )?];

        let problem = Problem::new(&[], &devices, &[])?;

        assert!(problem.is_degenerate());
        assert_eq!(problem.devices().len(), 1);

        Ok(())
    }
}
