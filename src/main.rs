//! Mosaic
//!
//! Optimizes a scenario and prints the resulting assignment.
//!
//! Pass a scenario file, or use `-s` to load a set from `./scenarios` by name.
//! Exits with an error when any of the scenario's expectations are unmet.

use std::io;

use anyhow::{Result, bail};

use clap::Parser;
use mosaic::{logging, report::Report, scenarios::Scenario, utils::ScenarioArgs};

fn main() -> Result<()> {
    let args = ScenarioArgs::parse();

    logging::init(&args.logging)?;

    let mut scenario = match args.file.as_deref() {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::from_set(&args.set)?,
    };

    args.apply_to(scenario.config_mut());

    let result = scenario.optimize()?;
    let report = Report::new(&result).with_expectations(scenario.expectations());

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    report.write_to(&mut handle)?;

    let unmet = report.unmet_count();

    if unmet > 0 {
        bail!("{unmet} expectation(s) of scenario {:?} not met", scenario.name());
    }

    Ok(())
}
