//! Properties

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest value any capability may take.
pub const MAX_CAPABILITY: u8 = 5;

/// Largest possible Euclidean distance between two [`Properties`] vectors.
pub const MAX_DISTANCE: f64 = 10.0;

/// Errors raised when constructing a [`Properties`] vector.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A capability is outside `0..=5`.
    #[error("{field} must be between 0 and {MAX_CAPABILITY}, got {value}")]
    OutOfRange {
        /// Capability name
        field: &'static str,

        /// Rejected value
        value: u32,
    },

    /// Compact notation was not exactly four decimal digits.
    #[error("invalid properties notation {0:?}, expected four digits such as \"5050\"")]
    InvalidNotation(String),
}

/// Capability vector shared by elements (requirements) and devices (strengths).
///
/// The compact notation used in scenarios lists the four capabilities as digits in
/// order: visual display, text input, touch pointing, mouse pointing. `"5050"` is a
/// large display with touch support and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PropertiesRepr", into = "String")]
pub struct Properties {
    visual_display: u8,
    text_input: u8,
    touch_pointing: u8,
    mouse_pointing: u8,
}

impl Properties {
    /// Create a new capability vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::OutOfRange`] if any capability exceeds 5.
    pub fn new(
        visual_display: u8,
        text_input: u8,
        touch_pointing: u8,
        mouse_pointing: u8,
    ) -> Result<Self, PropertiesError> {
        Ok(Self {
            visual_display: checked("visual_display", visual_display)?,
            text_input: checked("text_input", text_input)?,
            touch_pointing: checked("touch_pointing", touch_pointing)?,
            mouse_pointing: checked("mouse_pointing", mouse_pointing)?,
        })
    }

    /// Visual display capability.
    pub fn visual_display(&self) -> u8 {
        self.visual_display
    }

    /// Text input capability.
    pub fn text_input(&self) -> u8 {
        self.text_input
    }

    /// Touch pointing capability.
    pub fn touch_pointing(&self) -> u8 {
        self.touch_pointing
    }

    /// Mouse pointing capability.
    pub fn mouse_pointing(&self) -> u8 {
        self.mouse_pointing
    }

    fn components(&self) -> [u8; 4] {
        [
            self.visual_display,
            self.text_input,
            self.touch_pointing,
            self.mouse_pointing,
        ]
    }

    /// Dot product similarity with another vector.
    pub fn dot(&self, other: &Properties) -> u32 {
        self.components()
            .iter()
            .zip(other.components())
            .map(|(&a, b)| u32::from(a) * u32::from(b))
            .sum()
    }

    /// Euclidean distance to another vector.
    pub fn distance(&self, other: &Properties) -> f64 {
        let squared: i32 = self
            .components()
            .iter()
            .zip(other.components())
            .map(|(&a, b)| {
                let diff = i32::from(a) - i32::from(b);
                diff * diff
            })
            .sum();

        f64::from(squared).sqrt()
    }
}

fn checked(field: &'static str, value: u8) -> Result<u8, PropertiesError> {
    if value > MAX_CAPABILITY {
        return Err(PropertiesError::OutOfRange {
            field,
            value: u32::from(value),
        });
    }

    Ok(value)
}

impl FromStr for Properties {
    type Err = PropertiesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .trim()
            .chars()
            .map(|c| c.to_digit(10).and_then(|d| u8::try_from(d).ok()))
            .collect::<Option<_>>()
            .ok_or_else(|| PropertiesError::InvalidNotation(s.to_string()))?;

        match digits.as_slice() {
            &[visual, text, touch, mouse] => Self::new(visual, text, touch, mouse),
            _ => Err(PropertiesError::InvalidNotation(s.to_string())),
        }
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.visual_display, self.text_input, self.touch_pointing, self.mouse_pointing
        )
    }
}

impl From<Properties> for String {
    fn from(properties: Properties) -> Self {
        properties.to_string()
    }
}

/// Accepted scenario representations of a capability vector.
///
/// YAML reads an unquoted `5050` as a number, so both forms are accepted, as is an
/// explicit mapping of the four capabilities.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PropertiesRepr {
    Compact(String),
    Numeric(u32),
    Explicit {
        #[serde(default)]
        visual_display: u8,
        #[serde(default)]
        text_input: u8,
        #[serde(default)]
        touch_pointing: u8,
        #[serde(default)]
        mouse_pointing: u8,
    },
}

impl TryFrom<PropertiesRepr> for Properties {
    type Error = PropertiesError;

    fn try_from(repr: PropertiesRepr) -> Result<Self, Self::Error> {
        match repr {
            PropertiesRepr::Compact(notation) => notation.parse(),
            PropertiesRepr::Numeric(value) => format!("{value:04}").parse(),
            PropertiesRepr::Explicit {
                visual_display,
                text_input,
                touch_pointing,
                mouse_pointing,
            } => Self::new(visual_display, text_input, touch_pointing, mouse_pointing),
        }
    }
}
