//! Devices

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    elements::{Element, Size},
    properties::{MAX_DISTANCE, Properties},
    users::User,
};

/// Errors raised when constructing a [`Device`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device has no drawable area.
    #[error("device {name:?} has zero width or height")]
    ZeroArea {
        /// Device name
        name: String,
    },
}

/// How element/device compatibility is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityMetric {
    /// Dot product of the two capability vectors.
    #[default]
    Dot,

    /// Closeness of the two capability vectors: the largest possible distance minus
    /// their Euclidean distance.
    Distance,
}

/// A capacity-bounded screen shared by a set of authorized users.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    name: String,
    size: Size,
    properties: Properties,
    users: FxHashSet<String>,
}

impl Device {
    /// Create a device authorized for the named users.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::ZeroArea`] if either dimension is zero.
    pub fn new<I, S>(
        name: impl Into<String>,
        size: Size,
        properties: Properties,
        users: I,
    ) -> Result<Self, DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();

        if size.area() == 0 {
            return Err(DeviceError::ZeroArea { name });
        }

        Ok(Self {
            name,
            size,
            properties,
            users: users.into_iter().map(Into::into).collect(),
        })
    }

    /// Device name, unique within a problem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Screen area in square pixels.
    pub fn area(&self) -> u64 {
        self.size.area()
    }

    /// Capabilities offered by the device.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Names of the users allowed to see this device.
    pub fn authorized_users(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(String::as_str)
    }

    /// Whether `user` may see this device.
    pub fn is_authorized(&self, user: &User) -> bool {
        self.users.contains(user.name())
    }

    /// Number of authorized users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Score how well `element` suits this device. Higher is better, never negative.
    pub fn compatibility(&self, element: &Element, metric: CompatibilityMetric) -> f64 {
        match metric {
            CompatibilityMetric::Dot => f64::from(self.properties.dot(element.properties())),
            CompatibilityMetric::Distance => {
                MAX_DISTANCE - self.properties.distance(element.properties())
            }
        }
    }
}
