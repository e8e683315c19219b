//! Elements

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{properties::Properties, users::User};

/// Errors raised when constructing an [`Element`].
#[derive(Debug, Error, PartialEq)]
pub enum ElementError {
    /// Minimum width or height exceeds the corresponding maximum.
    #[error("element {name:?} has a minimum size larger than its maximum size")]
    InvalidSizeBounds {
        /// Element name
        name: String,
    },

    /// Importance was negative, infinite or not a number.
    #[error("element {name:?} has invalid importance {importance}")]
    InvalidImportance {
        /// Element name
        name: String,

        /// Rejected importance
        importance: f64,
    },
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A placeable UI widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    importance: f64,
    min_size: Size,
    max_size: Size,
    properties: Properties,
    visible_to: Option<FxHashSet<String>>,
}

impl Element {
    /// Create an element visible to every user.
    ///
    /// # Errors
    ///
    /// Returns an [`ElementError`] if the minimum size exceeds the maximum size in
    /// either dimension, or if the importance is negative or not finite.
    pub fn new(
        name: impl Into<String>,
        importance: f64,
        min_size: Size,
        max_size: Size,
        properties: Properties,
    ) -> Result<Self, ElementError> {
        let name = name.into();

        if min_size.width > max_size.width || min_size.height > max_size.height {
            return Err(ElementError::InvalidSizeBounds { name });
        }

        if !importance.is_finite() || importance < 0.0 {
            return Err(ElementError::InvalidImportance { name, importance });
        }

        Ok(Self {
            name,
            importance,
            min_size,
            max_size,
            properties,
            visible_to: None,
        })
    }

    /// Restrict the element to the named users.
    #[must_use]
    pub fn visible_to<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_to = Some(users.into_iter().map(Into::into).collect());
        self
    }

    /// Element name, unique within a problem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default importance used for users without an override.
    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// Smallest size the element can be rendered at.
    pub fn min_size(&self) -> Size {
        self.min_size
    }

    /// Largest size the element is useful at.
    pub fn max_size(&self) -> Size {
        self.max_size
    }

    /// Minimum area in square pixels.
    pub fn min_area(&self) -> u64 {
        self.min_size.area()
    }

    /// Maximum area in square pixels.
    pub fn max_area(&self) -> u64 {
        self.max_size.area()
    }

    /// Capabilities the element needs from a device.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Whether `user` may see this element.
    pub fn user_has_access(&self, user: &User) -> bool {
        self.visible_to
            .as_ref()
            .is_none_or(|users| users.contains(user.name()))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn areas_are_derived_from_sizes() -> TestResult {
        let element = Element::new(
            "Calendar",
            1.0,
            Size::new(500, 500),
            Size::new(1200, 800),
            Properties::default(),
        )?;

        assert_eq!(element.min_area(), 250_000);
        assert_eq!(element.max_area(), 960_000);

        Ok(())
    }

    #[test]
    fn rejects_min_larger_than_max() {
        let result = Element::new(
            "Canvas",
            1.0,
            Size::new(100, 900),
            Size::new(200, 800),
            Properties::default(),
        );

        assert_eq!(
            result,
            Err(ElementError::InvalidSizeBounds {
                name: "Canvas".to_string()
            })
        );
    }

    #[test]
    fn rejects_negative_importance() {
        let result = Element::new(
            "Canvas",
            -1.0,
            Size::new(1, 1),
            Size::new(1, 1),
            Properties::default(),
        );

        assert!(matches!(
            result,
            Err(ElementError::InvalidImportance { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_importance() {
        for importance in [f64::INFINITY, f64::NAN] {
            let result = Element::new(
                "Canvas",
                importance,
                Size::new(1, 1),
                Size::new(1, 1),
                Properties::default(),
            );

            assert!(
                matches!(result, Err(ElementError::InvalidImportance { .. })),
                "importance {importance} accepted"
            );
        }
    }

    #[test]
    fn visibility_defaults_to_everyone() -> TestResult {
        let element = Element::new(
            "Time",
            1.0,
            Size::new(1, 1),
            Size::new(1, 1),
            Properties::default(),
        )?;

        assert!(element.user_has_access(&User::new("intern")));

        let restricted = element.visible_to(["manager"]);

        assert!(restricted.user_has_access(&User::new("manager")));
        assert!(!restricted.user_has_access(&User::new("intern")));

        Ok(())
    }
}
