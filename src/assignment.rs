//! Assignment
//!
//! The result of an optimization: for every device, the elements placed on it in
//! element name order together with the area each one occupies.

use num_traits::ToPrimitive;
use smallvec::SmallVec;

use crate::{
    devices::Device,
    elements::Element,
    model::AssignmentModel,
    preprocess::Matrices,
    problem::Problem,
    solvers::SolveOutcome,
    users::User,
};

/// An element placed on a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedElement<'a> {
    element: &'a Element,
    occupied_size: u64,
}

impl<'a> PlacedElement<'a> {
    /// Record a placement.
    pub fn new(element: &'a Element, occupied_size: u64) -> Self {
        Self {
            element,
            occupied_size,
        }
    }

    /// The placed element
    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// Area the element occupies on the device
    pub fn occupied_size(&self) -> u64 {
        self.occupied_size
    }
}

/// Elements placed on one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceAssignment<'a> {
    device: &'a Device,
    elements: SmallVec<[PlacedElement<'a>; 8]>,
}

impl<'a> DeviceAssignment<'a> {
    /// A device with nothing placed on it.
    pub fn empty(device: &'a Device) -> Self {
        Self {
            device,
            elements: SmallVec::new(),
        }
    }

    /// The device
    pub fn device(&self) -> &'a Device {
        self.device
    }

    /// Placed elements, ordered by element name
    pub fn elements(&self) -> &[PlacedElement<'a>] {
        &self.elements
    }

    /// Total area occupied by the placed elements
    pub fn occupied_area(&self) -> u64 {
        self.elements.iter().map(PlacedElement::occupied_size).sum()
    }

    /// Whether nothing is placed on the device
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the named element is placed on the device
    pub fn contains(&self, element: &str) -> bool {
        self.placement(element).is_some()
    }

    /// Placement of the named element on this device
    pub fn placement(&self, element: &str) -> Option<&PlacedElement<'a>> {
        self.elements.iter().find(|p| p.element.name() == element)
    }
}

/// Mapping of every input device to the elements placed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'a> {
    devices: Vec<DeviceAssignment<'a>>,
}

impl<'a> Assignment<'a> {
    /// Every device of the problem with nothing placed on it.
    ///
    /// This is also the result of a solve that found no assignment.
    pub fn empty(problem: &Problem<'a>) -> Self {
        Self {
            devices: problem
                .devices()
                .iter()
                .map(|&device| DeviceAssignment::empty(device))
                .collect(),
        }
    }

    /// Read the placement out of a solved model.
    ///
    /// An element is placed where its assignment variable is set; its occupied size is
    /// the rounded size variable. A solve that did not reach optimality yields
    /// [`Assignment::empty`] rather than a partial assignment.
    pub fn extract(problem: &Problem<'a>, built: &AssignmentModel, outcome: &SolveOutcome) -> Self {
        let mut assignment = Self::empty(problem);

        if !outcome.status().is_optimal() {
            return assignment;
        }

        for (d, slot) in assignment.devices.iter_mut().enumerate() {
            for (e, &element) in problem.elements().iter().enumerate() {
                if !outcome.is_set(built.assign.at(e, d)) {
                    continue;
                }

                let occupied_size = outcome
                    .value(built.size.at(e, d))
                    .round()
                    .to_u64()
                    .unwrap_or(0);

                slot.elements.push(PlacedElement::new(element, occupied_size));
            }
        }

        assignment
    }

    /// Per-device placements, ordered by device name
    pub fn devices(&self) -> &[DeviceAssignment<'a>] {
        &self.devices
    }

    /// Placements on the named device
    pub fn device(&self, name: &str) -> Option<&DeviceAssignment<'a>> {
        self.devices.iter().find(|d| d.device.name() == name)
    }

    /// Whether the named element is placed on the named device
    pub fn is_placed(&self, element: &str, device: &str) -> bool {
        self.device(device).is_some_and(|d| d.contains(element))
    }

    /// Total number of placements over all devices
    pub fn placement_count(&self) -> usize {
        self.devices.iter().map(|d| d.elements.len()).sum()
    }

    /// Whether no device has anything placed on it
    pub fn is_empty(&self) -> bool {
        self.devices.iter().all(DeviceAssignment::is_empty)
    }
}

/// How many of a user's accessible elements the user can see on their devices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserCoverage<'a> {
    user: &'a User,
    visible: usize,
    accessible: usize,
}

impl<'a> UserCoverage<'a> {
    /// The user
    pub fn user(&self) -> &'a User {
        self.user
    }

    /// Accessible elements placed on at least one of the user's devices
    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Elements the user may access after preprocessing
    pub fn accessible(&self) -> usize {
        self.accessible
    }

    /// `visible / accessible`, or `None` when the user has no accessible element.
    pub fn ratio(&self) -> Option<f64> {
        if self.accessible == 0 {
            return None;
        }

        Some(self.visible.to_f64()? / self.accessible.to_f64()?)
    }
}

/// Coverage of every user, plus the worst-case ratio the solver settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage<'a> {
    users: Vec<UserCoverage<'a>>,
    min_ratio: f64,
}

impl<'a> Coverage<'a> {
    /// Coverage of an assignment given the preprocessed access matrices.
    pub fn measure(
        problem: &Problem<'a>,
        matrices: &Matrices,
        assignment: &Assignment<'a>,
        min_ratio: f64,
    ) -> Self {
        let users = problem
            .users()
            .iter()
            .enumerate()
            .map(|(u, &user)| {
                let mut visible = 0;
                let mut accessible = 0;

                for (e, element) in problem.elements().iter().enumerate() {
                    if !matrices.user_element_access.at(u, e) {
                        continue;
                    }

                    accessible += 1;

                    let seen = assignment.devices().iter().enumerate().any(|(d, slot)| {
                        matrices.user_device_access.at(u, d) && slot.contains(element.name())
                    });

                    if seen {
                        visible += 1;
                    }
                }

                UserCoverage {
                    user,
                    visible,
                    accessible,
                }
            })
            .collect();

        Self { users, min_ratio }
    }

    /// Coverage with no users, used when the problem is degenerate.
    pub fn none() -> Self {
        Self {
            users: Vec::new(),
            min_ratio: 0.0,
        }
    }

    /// Per-user coverage, ordered by user name
    pub fn users(&self) -> &[UserCoverage<'a>] {
        &self.users
    }

    /// Coverage of the named user
    pub fn user(&self, name: &str) -> Option<&UserCoverage<'a>> {
        self.users.iter().find(|c| c.user.name() == name)
    }

    /// Solved minimum coverage ratio over users with an accessible element
    pub fn min_ratio(&self) -> f64 {
        self.min_ratio
    }
}
