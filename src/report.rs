//! Report
//!
//! Terminal rendering of an optimization: one table row per placement grouped by
//! device, followed by coverage, timing and expectation results.

use std::{fmt::Write as _, io};

use num_traits::ToPrimitive;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    assignment::DeviceAssignment, optimizer::Optimization, scenarios::Expectation,
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Renders an [`Optimization`], optionally with the expectations it was checked against.
#[derive(Debug, Clone, Copy)]
pub struct Report<'r, 'a> {
    optimization: &'r Optimization<'a>,
    expectations: &'r [Expectation],
}

impl<'r, 'a> Report<'r, 'a> {
    /// Report on an optimization.
    pub fn new(optimization: &'r Optimization<'a>) -> Self {
        Self {
            optimization,
            expectations: &[],
        }
    }

    /// Also list whether each expectation is met.
    #[must_use]
    pub fn with_expectations(mut self, expectations: &'r [Expectation]) -> Self {
        self.expectations = expectations;
        self
    }

    /// Number of expectations the assignment does not meet.
    pub fn unmet_count(&self) -> usize {
        let assignment = self.optimization.assignment();

        self.expectations
            .iter()
            .filter(|expectation| !expectation.is_met(assignment))
            .count()
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let mut builder = Builder::default();
        let mut device_boundary_rows: SmallVec<[usize; 16]> = SmallVec::new();

        builder.push_record(["Device", "Size", "Element", "Occupied", "Share"]);

        let mut row = 1;

        for slot in self.optimization.assignment().devices() {
            device_boundary_rows.push(row);
            row += append_device_rows(&mut builder, slot);
        }

        write_table(&mut out, builder, &device_boundary_rows)?;
        write_summary(&mut out, self.optimization)?;

        if !self.expectations.is_empty() {
            write_expectations(&mut out, self)?;
        }

        Ok(())
    }
}

/// Rows for one device; returns how many were added.
fn append_device_rows(builder: &mut Builder, slot: &DeviceAssignment<'_>) -> usize {
    let device = slot.device();
    let size = format!("{}x{}", device.width(), device.height());

    if slot.is_empty() {
        builder.push_record([device.name(), size.as_str(), "-", "", ""]);

        return 1;
    }

    for (i, placed) in slot.elements().iter().enumerate() {
        let (name, dimensions) = if i == 0 {
            (device.name(), size.as_str())
        } else {
            ("", "")
        };

        builder.push_record([
            name.to_string(),
            dimensions.to_string(),
            placed.element().name().to_string(),
            placed.occupied_size().to_string(),
            format!("{:.1}%", percent(placed.occupied_size(), device.area())),
        ]);
    }

    slot.elements().len()
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    device_boundary_rows: &[usize],
) -> Result<(), ReportError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    for &row in device_boundary_rows {
        if row > 1 {
            theme.insert_horizontal_line(row, separator);
        }
    }

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..5), Alignment::right());

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}")?;

    Ok(())
}

fn write_summary(out: &mut impl io::Write, optimization: &Optimization<'_>) -> Result<(), ReportError> {
    let status = optimization
        .status()
        .map_or_else(|| "nothing to place".to_string(), |status| format!("{status:?}"));

    let mut lines: Vec<(String, String)> = optimization
        .coverage()
        .users()
        .iter()
        .map(|coverage| {
            let ratio = coverage
                .ratio()
                .map_or_else(|| "-".to_string(), |r| format!("{:.2}%", r * 100.0));

            (
                format!(" {}:", coverage.user().name()),
                format!("{}/{} ({ratio})  ", coverage.visible(), coverage.accessible()),
            )
        })
        .collect();

    lines.push((
        " Min coverage:".to_string(),
        format!("{:.2}  ", optimization.coverage().min_ratio()),
    ));
    lines.push((" Status:".to_string(), format!("{status}  ")));
    lines.push((
        " \x1b[1mSolution:\x1b[0m".to_string(),
        format!("\x1b[1m{:.3}s\x1b[0m  ", optimization.elapsed_seconds()),
    ));

    let label_width = lines.iter().map(|(label, _)| visible_width(label)).max().unwrap_or(0);
    let value_width = lines.iter().map(|(_, value)| visible_width(value)).max().unwrap_or(0);

    for (label, value) in &lines {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out)?;

    Ok(())
}

fn write_expectations(out: &mut impl io::Write, report: &Report<'_, '_>) -> Result<(), ReportError> {
    let assignment = report.optimization.assignment();

    for expectation in report.expectations {
        let marker = if expectation.is_met(assignment) {
            "\x1b[32mpass\x1b[0m"
        } else {
            "\x1b[31mFAIL\x1b[0m"
        };

        writeln!(out, " {marker} {expectation}")?;
    }

    let unmet = report.unmet_count();

    writeln!(
        out,
        "\n {} of {} expectations met\n",
        report.expectations.len() - unmet,
        report.expectations.len()
    )?;

    Ok(())
}

fn percent(part: u64, whole: u64) -> f64 {
    match (part.to_f64(), whole.to_f64()) {
        (Some(part), Some(whole)) if whole > 0.0 => part / whole * 100.0,
        _ => 0.0,
    }
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReportError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )?;

    Ok(())
}
