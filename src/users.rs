//! Users

use rustc_hash::FxHashMap;

/// An actor whose access and importance overrides gate and weight assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    name: String,
    importance: FxHashMap<String, f64>,
}

impl User {
    /// Create a user without importance overrides.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            importance: FxHashMap::default(),
        }
    }

    /// Override the importance of the named element for this user only.
    ///
    /// Overrides are checked when the user joins a [`Problem`](crate::problem::Problem).
    #[must_use]
    pub fn with_importance(mut self, element: impl Into<String>, importance: f64) -> Self {
        self.set_importance(element, importance);
        self
    }

    /// Override the importance of the named element for this user only.
    pub fn set_importance(&mut self, element: impl Into<String>, importance: f64) {
        self.importance.insert(element.into(), importance);
    }

    /// User name, unique within a problem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Importance override for the named element, if any.
    pub fn importance_of(&self, element: &str) -> Option<f64> {
        self.importance.get(element).copied()
    }

    /// All importance overrides.
    pub fn importance_overrides(&self) -> &FxHashMap<String, f64> {
        &self.importance
    }
}
