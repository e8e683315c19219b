//! Shared helpers for unit tests.

use crate::{
    devices::Device,
    elements::{Element, Size},
    users::User,
};

/// Element with a 1x1 minimum and 100x100 maximum size.
pub(crate) fn element(
    name: &str,
    importance: f64,
    properties: &str,
) -> Result<Element, Box<dyn std::error::Error>> {
    sized_element(name, importance, (1, 1), (100, 100), properties)
}

/// Element with explicit size bounds.
pub(crate) fn sized_element(
    name: &str,
    importance: f64,
    min: (u32, u32),
    max: (u32, u32),
    properties: &str,
) -> Result<Element, Box<dyn std::error::Error>> {
    Ok(Element::new(
        name,
        importance,
        Size::new(min.0, min.1),
        Size::new(max.0, max.1),
        properties.parse()?,
    )?)
}

/// Device authorized for `users`.
pub(crate) fn device(
    name: &str,
    width: u32,
    height: u32,
    properties: &str,
    users: &[&str],
) -> Result<Device, Box<dyn std::error::Error>> {
    Ok(Device::new(
        name,
        Size::new(width, height),
        properties.parse()?,
        users.iter().copied(),
    )?)
}

/// Users with the given names and no overrides.
pub(crate) fn users(names: &[&str]) -> Vec<User> {
    names.iter().copied().map(User::new).collect()
}
