//! Tie-break noise
//!
//! Small positive jitter on non-zero matrix entries stops the solver from stalling
//! between assignments of equal value. It is off unless [`NoiseConfig::enabled`] is
//! set, and values may exceed 1.0 once it is applied.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{config::NoiseConfig, matrix::Matrix, preprocess::Matrices};

/// Add jitter to the compatibility and importance matrices.
pub fn apply(matrices: &mut Matrices, config: &NoiseConfig) {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    debug!(amplitude = config.amplitude, seed = ?config.seed, "adding tie-break noise");

    add_noise(&mut matrices.element_device_compatibility, config.amplitude, &mut rng);
    add_noise(&mut matrices.element_device_importance, config.amplitude, &mut rng);
    add_noise(&mut matrices.element_user_importance, config.amplitude, &mut rng);
}

/// Add `amplitude * U[0, 1]` to every non-zero entry. Zero entries stay zero so
/// pruned and inaccessible pairs are not revived.
pub fn add_noise(matrix: &mut Matrix<f64>, amplitude: f64, rng: &mut impl Rng) {
    if amplitude <= 0.0 {
        return;
    }

    matrix.map_in_place(|value| {
        if value == 0.0 {
            value
        } else {
            value + amplitude * rng.gen_range(0.0..=1.0)
        }
    });
}
