use crate::engine::error::EngineError;
use crate::engine::system::System;
use crate::engine::trial::select::TrialSelect;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// In-place change of a particle's type (morphing).
///
/// The old type is remembered so revert restores it exactly; the target
/// template must have a matching site count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbParticleType {
    new_type: usize,
    #[serde(skip)]
    old_type: Option<usize>,
}

impl PerturbParticleType {
    /// Creates a morph toward the given particle type.
    pub fn new(new_type: usize) -> Self {
        Self {
            new_type,
            old_type: None,
        }
    }

    /// Returns the target particle type.
    pub fn new_type(&self) -> usize {
        self.new_type
    }

    /// Returns the type the particle had before the morph, if one happened.
    pub fn old_type(&self) -> Option<usize> {
        self.old_type
    }

    pub fn reset(&mut self) {
        self.old_type = None;
    }

    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        _rng: &mut R,
        position_held: bool,
    ) -> Result<(), EngineError> {
        if position_held {
            return Ok(());
        }
        let index = select.mobile().particle_index(0);
        if self.old_type.is_none() {
            self.old_type = Some(system.configuration().particle(index).type_id());
        }
        system.configuration_mut().morph_particle(index, self.new_type);
        Ok(())
    }

    pub fn revert(&mut self, system: &mut System, select: &TrialSelect) {
        if let Some(old_type) = self.old_type.take() {
            let index = select.mobile().particle_index(0);
            system.configuration_mut().morph_particle(index, old_type);
        }
    }

    pub fn finalize(&mut self) {
        self.old_type = None;
    }
}
