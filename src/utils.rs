//! Utils

use std::path::PathBuf;

use clap::Parser;

use crate::{config::OptimizerConfig, devices::CompatibilityMetric, logging::LoggingConfig};

/// Arguments for the `mosaic` command
#[derive(Debug, Parser)]
#[command(name = "mosaic", about = "Assign UI elements to shared devices", long_about = None)]
pub struct ScenarioArgs {
    /// Scenario file to optimize
    #[arg(conflicts_with = "set")]
    pub file: Option<PathBuf>,

    /// Scenario set to load from `./scenarios` when no file is given
    #[arg(short, long, default_value = "meeting_room")]
    pub set: String,

    /// Compatibility metric, overriding the scenario's configuration
    #[arg(short, long, value_enum)]
    pub metric: Option<CompatibilityMetric>,

    /// Add tie-break noise to the preprocessed matrices
    #[arg(long)]
    pub noise: bool,

    /// Seed for the tie-break noise
    #[arg(long, requires = "noise")]
    pub seed: Option<u64>,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl ScenarioArgs {
    /// Apply command-line overrides on top of a scenario's configuration.
    pub fn apply_to(&self, config: &mut OptimizerConfig) {
        if let Some(metric) = self.metric {
            config.compatibility_metric = metric;
        }

        if self.noise {
            config.noise.enabled = true;
        }

        if self.seed.is_some() {
            config.noise.seed = self.seed;
        }
    }
}
