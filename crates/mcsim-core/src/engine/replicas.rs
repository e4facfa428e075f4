use super::error::EngineError;
use super::monte_carlo::MonteCarlo;
use rayon::prelude::*;

/// Runs independent replicas side by side.
///
/// Parallelism in this engine is strictly orthogonal to the trial loop:
/// each replica owns its system, criteria, and random stream, and no
/// configuration is ever mutated from two threads. Use this for ensemble
/// averaging or independent windows of an expanded-ensemble run.
///
/// # Arguments
///
/// * `replicas` - The independently configured drivers.
/// * `num_trials` - Trials to attempt in every replica.
pub fn attempt_all(replicas: &mut [MonteCarlo], num_trials: u64) -> Result<(), EngineError> {
    replicas
        .par_iter_mut()
        .map(|replica| replica.attempt(num_trials))
        .collect::<Result<(), EngineError>>()
}
