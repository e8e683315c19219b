//! Scenarios
//!
//! A scenario is a YAML file describing users, elements and devices, an optional
//! optimizer configuration, and the placements expected of a good solution.
//!
//! ```yaml
//! users:
//!   - manager
//!   - name: secretary
//!     importance:
//!       Meeting Minutes (edit): 10
//! element_table: |
//!   Meeting Minutes (edit) | 0 | 500 | 500 | 900 | 1300 | 5502
//! devices:
//!   - name: Laptop (secretary)
//!     size: [1280, 720]
//!     properties: "4505"
//!     users: [secretary]
//! expect:
//!   Laptop (secretary): [Meeting Minutes (edit)]
//! ```

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    assignment::Assignment,
    config::OptimizerConfig,
    devices::{Device, DeviceError},
    elements::{Element, ElementError, Size},
    optimizer::{OptimizeError, Optimization, Optimizer},
    properties::{Properties, PropertiesError},
    users::User,
};

pub mod tables;

/// Directory scenario sets are loaded from by [`Scenario::from_set`].
pub const DEFAULT_SCENARIO_DIR: &str = "./scenarios";

/// Scenario Parsing Errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// IO error reading a scenario file
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Malformed row in an element or device table
    #[error("Table line {line}: {message}")]
    Table {
        /// 1-based line within the table block
        line: usize,

        /// What is wrong with the row
        message: String,
    },

    /// An expectation names a device or element the scenario does not define
    #[error("Expectation refers to unknown {kind}: {name}")]
    UnknownName {
        /// `"device"` or `"element"`
        kind: &'static str,

        /// The unknown name
        name: String,
    },

    /// Invalid capability vector
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    /// Invalid element definition
    #[error(transparent)]
    Element(#[from] ElementError),

    /// Invalid device definition
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// An element that should, or should not, end up on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Device name
    pub device: String,

    /// Element name
    pub element: String,

    /// `true` if the element must be placed on the device, `false` if it must not
    pub placed: bool,
}

impl Expectation {
    /// Parse an expectation entry; a leading `~` means "must not be placed".
    pub fn parse(device: &str, entry: &str) -> Self {
        let entry = entry.trim();

        match entry.strip_prefix('~') {
            Some(element) => Self {
                device: device.to_string(),
                element: element.trim().to_string(),
                placed: false,
            },
            None => Self {
                device: device.to_string(),
                element: entry.to_string(),
                placed: true,
            },
        }
    }

    /// Whether the assignment satisfies this expectation.
    pub fn is_met(&self, assignment: &Assignment<'_>) -> bool {
        assignment.is_placed(&self.element, &self.device) == self.placed
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.placed {
            write!(f, "{} on {}", self.element, self.device)
        } else {
            write!(f, "{} not on {}", self.element, self.device)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(default)]
    users: Vec<UserFixture>,

    #[serde(default)]
    elements: Vec<ElementFixture>,

    #[serde(default)]
    element_table: Option<String>,

    #[serde(default)]
    devices: Vec<DeviceFixture>,

    #[serde(default)]
    device_table: Option<String>,

    #[serde(default)]
    config: OptimizerConfig,

    #[serde(default)]
    expect: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserFixture {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        importance: BTreeMap<String, f64>,
    },
}

impl From<UserFixture> for User {
    fn from(fixture: UserFixture) -> Self {
        match fixture {
            UserFixture::Name(name) => User::new(name),
            UserFixture::Detailed { name, importance } => importance
                .into_iter()
                .fold(User::new(name), |user, (element, value)| {
                    user.with_importance(element, value)
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementFixture {
    name: String,
    importance: f64,
    min_size: [u32; 2],
    max_size: [u32; 2],
    properties: Properties,
    #[serde(default)]
    visible_to: Option<Vec<String>>,
}

impl TryFrom<ElementFixture> for Element {
    type Error = ElementError;

    fn try_from(fixture: ElementFixture) -> Result<Self, Self::Error> {
        let [min_w, min_h] = fixture.min_size;
        let [max_w, max_h] = fixture.max_size;

        let element = Element::new(
            fixture.name,
            fixture.importance,
            Size::new(min_w, min_h),
            Size::new(max_w, max_h),
            fixture.properties,
        )?;

        Ok(match fixture.visible_to {
            Some(users) => element.visible_to(users),
            None => element,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceFixture {
    name: String,
    size: [u32; 2],
    properties: Properties,
    users: Vec<String>,
}

impl TryFrom<DeviceFixture> for Device {
    type Error = DeviceError;

    fn try_from(fixture: DeviceFixture) -> Result<Self, Self::Error> {
        let [width, height] = fixture.size;

        Device::new(
            fixture.name,
            Size::new(width, height),
            fixture.properties,
            fixture.users,
        )
    }
}

/// A loaded scenario
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    elements: Vec<Element>,
    devices: Vec<Device>,
    users: Vec<User>,
    config: OptimizerConfig,
    expectations: Vec<Expectation>,
}

impl Scenario {
    /// Parse a scenario from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the YAML is malformed, a table row is invalid,
    /// a definition is rejected, or an expectation names an undefined device or element.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_norway::from_str(yaml)?;

        let mut elements = file
            .elements
            .into_iter()
            .map(Element::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(table) = file.element_table.as_deref() {
            elements.extend(tables::parse_element_table(table)?);
        }

        let mut devices = file
            .devices
            .into_iter()
            .map(Device::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(table) = file.device_table.as_deref() {
            devices.extend(tables::parse_device_table(table)?);
        }

        let expectations: Vec<Expectation> = file
            .expect
            .iter()
            .flat_map(|(device, entries)| {
                entries.iter().map(move |entry| Expectation::parse(device, entry))
            })
            .collect();

        validate_expectations(&expectations, &elements, &devices)?;

        let scenario = Self {
            name: name.into(),
            elements,
            devices,
            users: file.users.into_iter().map(User::from).collect(),
            config: file.config,
            expectations,
        };

        debug!(
            scenario = scenario.name,
            elements = scenario.elements.len(),
            devices = scenario.devices.len(),
            users = scenario.users.len(),
            "loaded scenario"
        );

        Ok(scenario)
    }

    /// Load a scenario file; the scenario is named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let name = path
            .file_stem()
            .map_or_else(|| "scenario".to_string(), |stem| stem.to_string_lossy().into_owned());

        Self::from_yaml(name, &contents)
    }

    /// Load `<name>.yml` from [`DEFAULT_SCENARIO_DIR`].
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read or parsed.
    pub fn from_set(name: &str) -> Result<Self, ScenarioError> {
        Self::from_set_in(DEFAULT_SCENARIO_DIR, name)
    }

    /// Load `<name>.yml` from `base_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read or parsed.
    pub fn from_set_in(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, ScenarioError> {
        Self::from_file(base_path.into().join(format!("{name}.yml")))
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defined elements
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Defined devices
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Defined users
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Optimizer configuration from the `config` section
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Mutable configuration, for command-line overrides
    pub fn config_mut(&mut self) -> &mut OptimizerConfig {
        &mut self.config
    }

    /// Expected placements, ordered by device name
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    /// Run the optimizer with the scenario's configuration.
    ///
    /// # Errors
    ///
    /// Returns an [`OptimizeError`] if the collections are invalid or the solver
    /// rejects the model.
    pub fn optimize(&self) -> Result<Optimization<'_>, OptimizeError> {
        Optimizer::new(self.config.clone()).optimize(&self.elements, &self.devices, &self.users)
    }

    /// Expectations the assignment does not meet.
    pub fn check(&self, assignment: &Assignment<'_>) -> Vec<&Expectation> {
        self.expectations
            .iter()
            .filter(|expectation| !expectation.is_met(assignment))
            .collect()
    }
}

fn validate_expectations(
    expectations: &[Expectation],
    elements: &[Element],
    devices: &[Device],
) -> Result<(), ScenarioError> {
    let element_names: FxHashSet<&str> = elements.iter().map(Element::name).collect();
    let device_names: FxHashSet<&str> = devices.iter().map(Device::name).collect();

    for expectation in expectations {
        if !device_names.contains(expectation.device.as_str()) {
            return Err(ScenarioError::UnknownName {
                kind: "device",
                name: expectation.device.clone(),
            });
        }

        if !element_names.contains(expectation.element.as_str()) {
            return Err(ScenarioError::UnknownName {
                kind: "element",
                name: expectation.element.clone(),
            });
        }
    }

    Ok(())
}
