use super::criteria::Criteria;
use super::error::EngineError;
use super::system::System;
use super::trial::factory::TrialFactory;
use serde::{Deserialize, Serialize};

/// The current checkpoint format version.
///
/// Bumped on any incompatible layout change; restore asserts an exact match
/// and fails loudly otherwise. Checkpoints are deliberately not forward or
/// backward compatible.
pub const CHECKPOINT_VERSION: u32 = 1;

/// The versioned envelope persisting a simulation's stateful core.
///
/// Steppers are not part of the envelope: they are host-owned collaborators
/// re-attached after a restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    version: u32,
    criteria: Criteria,
    system: System,
    trials: TrialFactory,
}

impl Checkpoint {
    /// Captures a checkpoint of the given state.
    pub fn capture(system: &System, criteria: &Criteria, trials: &TrialFactory) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            criteria: criteria.clone(),
            system: system.clone(),
            trials: trials.clone(),
        }
    }

    /// Serializes the checkpoint to text.
    pub fn save(&self) -> Result<String, EngineError> {
        toml::to_string(self).map_err(|err| EngineError::CheckpointSerialize(err.to_string()))
    }

    /// Restores a checkpoint from text.
    ///
    /// # Errors
    ///
    /// [`EngineError::CheckpointVersion`] on any version mismatch;
    /// [`EngineError::CheckpointDeserialize`] on malformed input.
    pub fn restore(text: &str) -> Result<Self, EngineError> {
        let checkpoint: Self = toml::from_str(text)
            .map_err(|err| EngineError::CheckpointDeserialize(err.to_string()))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(EngineError::CheckpointVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(checkpoint)
    }

    /// Consumes the checkpoint, yielding the restored state.
    pub fn into_parts(self) -> (System, Criteria, TrialFactory) {
        (self.system, self.criteria, self.trials)
    }
}
