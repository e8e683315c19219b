//! Optimizer configuration

use serde::{Deserialize, Serialize};

use crate::devices::CompatibilityMetric;

/// Settings for one optimization run.
///
/// Every field has a default, so a partial YAML `config:` section is enough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Metric used to score element/device compatibility.
    pub compatibility_metric: CompatibilityMetric,

    /// Weights of the two objective terms.
    pub weights: ObjectiveWeights,

    /// Near-zero thresholds.
    pub thresholds: Thresholds,

    /// Tie-break noise added to the preprocessed matrices.
    pub noise: NoiseConfig,
}

/// Weights of the blended objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    /// Weight of the quality term (importance x compatibility x occupied area).
    pub quality: f64,

    /// Weight of the completeness term (per-user coverage).
    pub completeness: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            quality: 0.8,
            completeness: 0.2,
        }
    }
}

/// Values below these thresholds are treated as exact zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Normalized user importance below which the user loses access to an element.
    /// Also the smallest column maximum that normalization will divide by.
    pub access_epsilon: f64,

    /// Device importance or compatibility below which an element is never placed on
    /// that device.
    pub prune_epsilon: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            access_epsilon: 1e-6,
            prune_epsilon: 1e-5,
        }
    }
}

/// Random jitter that breaks ties between otherwise equal assignments.
///
/// Disabled by default. When enabled without a seed, results differ between runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Whether jitter is applied at all.
    pub enabled: bool,

    /// Upper bound of the uniform jitter added to each non-zero entry.
    pub amplitude: f64,

    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amplitude: 0.05,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() -> TestResult {
        let config: OptimizerConfig = serde_norway::from_str(
            "compatibility_metric: distance\nnoise:\n  enabled: true\n  seed: 7\n",
        )?;

        assert_eq!(config.compatibility_metric, CompatibilityMetric::Distance);
        assert!(config.noise.enabled);
        assert_eq!(config.noise.seed, Some(7));
        assert_eq!(config.weights, ObjectiveWeights::default());
        assert_eq!(config.thresholds, Thresholds::default());

        Ok(())
    }

    #[test]
    fn noise_is_off_by_default() {
        assert!(!OptimizerConfig::default().noise.enabled);
    }
}
