//! Pipe-delimited element and device tables
//!
//! ```text
//! Canvas           | 10 | 1440 | 900 | 2600 | 1950 | 5050
//! Laptop (manager) | 1280 | 720 | 4505 | manager
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::str::FromStr;

use crate::{
    devices::Device,
    elements::{Element, Size},
    properties::Properties,
    scenarios::ScenarioError,
};

/// Parse `Name | Importance | min W | min H | max W | max H | Properties` rows.
///
/// # Errors
///
/// Returns [`ScenarioError::Table`] for a row with the wrong number of cells or an
/// unparsable cell, and the wrapped domain error for invalid values.
pub fn parse_element_table(text: &str) -> Result<Vec<Element>, ScenarioError> {
    rows(text)
        .map(|(line, cells)| -> Result<Element, ScenarioError> {
            let [name, importance, min_w, min_h, max_w, max_h, properties] =
                <[&str; 7]>::try_from(cells).map_err(|cells| wrong_width(line, 7, cells.len()))?;

            let name = required(line, name, "element name")?;

            Ok(Element::new(
                name,
                cell(line, importance, "importance")?,
                Size::new(cell(line, min_w, "min width")?, cell(line, min_h, "min height")?),
                Size::new(cell(line, max_w, "max width")?, cell(line, max_h, "max height")?),
                cell::<Properties>(line, properties, "properties")?,
            )?)
        })
        .collect()
}

/// Parse `Name | Width | Height | Properties | user1,user2` rows.
///
/// # Errors
///
/// Returns [`ScenarioError::Table`] for a row with the wrong number of cells or an
/// unparsable cell, and the wrapped domain error for invalid values.
pub fn parse_device_table(text: &str) -> Result<Vec<Device>, ScenarioError> {
    rows(text)
        .map(|(line, cells)| -> Result<Device, ScenarioError> {
            let [name, width, height, properties, users] =
                <[&str; 5]>::try_from(cells).map_err(|cells| wrong_width(line, 5, cells.len()))?;

            let name = required(line, name, "device name")?;

            Ok(Device::new(
                name,
                Size::new(cell(line, width, "width")?, cell(line, height, "height")?),
                cell::<Properties>(line, properties, "properties")?,
                users.split(',').map(str::trim).filter(|user| !user.is_empty()),
            )?)
        })
        .collect()
}

/// Non-empty, non-comment rows with their 1-based line number, split into trimmed cells.
fn rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, row)| (line, row.split('|').map(str::trim).collect()))
}

fn cell<T: FromStr>(line: usize, value: &str, what: &str) -> Result<T, ScenarioError> {
    value.parse().map_err(|_err| ScenarioError::Table {
        line,
        message: format!("invalid {what}: {value:?}"),
    })
}

fn required<'s>(line: usize, value: &'s str, what: &str) -> Result<&'s str, ScenarioError> {
    if value.is_empty() {
        return Err(ScenarioError::Table {
            line,
            message: format!("missing {what}"),
        });
    }

    Ok(value)
}

fn wrong_width(line: usize, expected: usize, found: usize) -> ScenarioError {
    ScenarioError::Table {
        line,
        message: format!("expected {expected} cells, found {found}"),
    }
}
