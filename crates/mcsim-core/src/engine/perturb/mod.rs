//! # Perturbation Module
//!
//! Atomic, revertible mutations applied to a system during a trial.
//!
//! Every perturbation follows the same three-state protocol:
//!
//! 1. `perturb` mutates the system through the configuration's mutator API,
//!    after the selection stage snapshotted enough state to undo the change.
//! 2. `revert` restores the pre-perturbation state exactly, and may be
//!    called any number of times as long as the change was never finalized.
//! 3. `finalize` commits irreversibly; deferred effects (a removal's actual
//!    deletion, reptation's slot shift) happen here, because only the final
//!    acceptance decision determines success.

pub mod grow;
pub mod morph;
pub mod rotate;
pub mod transfer;
pub mod translate;

use super::error::EngineError;
use super::system::System;
use super::trial::select::TrialSelect;
use super::tunable::Tunable;
use grow::{PerturbDistanceFromAnchor, PerturbReptate};
use morph::PerturbParticleType;
use rand::Rng;
use rotate::{PerturbCrankshaft, PerturbPivot, PerturbRotate};
use serde::{Deserialize, Serialize};
use transfer::{PerturbAdd, PerturbRemove};
use translate::PerturbTranslate;

/// The closed set of perturbations known to the engine.
///
/// The enum tag doubles as the serialized class name; serde reconstructs
/// the concrete payload from the tag, which replaces a name-to-factory
/// deserialization registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Perturb {
    Translate(PerturbTranslate),
    Rotate(PerturbRotate),
    Pivot(PerturbPivot),
    Crankshaft(PerturbCrankshaft),
    Add(PerturbAdd),
    Remove(PerturbRemove),
    ParticleType(PerturbParticleType),
    DistanceFromAnchor(PerturbDistanceFromAnchor),
    Reptate(PerturbReptate),
}

impl Perturb {
    /// Clears transient per-attempt state before a new selection.
    pub fn reset(&mut self) {
        match self {
            Self::Translate(p) => p.reset(),
            Self::Rotate(p) => p.reset(),
            Self::Pivot(p) => p.reset(),
            Self::Crankshaft(p) => p.reset(),
            Self::Add(p) => p.reset(),
            Self::Remove(p) => p.reset(),
            Self::ParticleType(p) => p.reset(),
            Self::DistanceFromAnchor(p) => p.reset(),
            Self::Reptate(p) => p.reset(),
        }
    }

    /// Applies the perturbation to the system.
    ///
    /// # Arguments
    ///
    /// * `system` - The system to mutate.
    /// * `select` - The stage's selection, including the revert snapshot.
    /// * `rng` - Random number source.
    /// * `position_held` - When true, skip the actual mutation; used to
    ///   evaluate the old configuration in Rosenbluth stages.
    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        rng: &mut R,
        position_held: bool,
    ) -> Result<(), EngineError> {
        match self {
            Self::Translate(p) => p.perturb(system, select, rng, position_held),
            Self::Rotate(p) => p.perturb(system, select, rng, position_held),
            Self::Pivot(p) => p.perturb(system, select, rng, position_held),
            Self::Crankshaft(p) => p.perturb(system, select, rng, position_held),
            Self::Add(p) => p.perturb(system, select, rng, position_held),
            Self::Remove(p) => p.perturb(system, select, rng, position_held),
            Self::ParticleType(p) => p.perturb(system, select, rng, position_held),
            Self::DistanceFromAnchor(p) => p.perturb(system, select, rng, position_held),
            Self::Reptate(p) => p.perturb(system, select, rng, position_held),
        }
    }

    /// Restores the system to its pre-perturbation state.
    ///
    /// A no-op when nothing revertible happened in this attempt.
    pub fn revert(&mut self, system: &mut System, select: &TrialSelect) {
        match self {
            Self::Translate(p) => p.revert(system, select),
            Self::Rotate(p) => p.revert(system, select),
            Self::Pivot(p) => p.revert(system, select),
            Self::Crankshaft(p) => p.revert(system, select),
            Self::Add(p) => p.revert(system, select),
            Self::Remove(p) => p.revert(system, select),
            Self::ParticleType(p) => p.revert(system, select),
            Self::DistanceFromAnchor(p) => p.revert(system, select),
            Self::Reptate(p) => p.revert(system, select),
        }
    }

    /// Commits the perturbation irreversibly.
    pub fn finalize(&mut self, system: &mut System, select: &TrialSelect) {
        match self {
            Self::Translate(p) => p.finalize(),
            Self::Rotate(p) => p.finalize(),
            Self::Pivot(p) => p.finalize(),
            Self::Crankshaft(p) => p.finalize(),
            Self::Add(p) => p.finalize(),
            Self::Remove(p) => p.finalize(system, select),
            Self::ParticleType(p) => p.finalize(),
            Self::DistanceFromAnchor(p) => p.finalize(),
            Self::Reptate(p) => p.finalize(system, select),
        }
    }

    /// Returns the tunable parameter, for perturbations that have one.
    pub fn tunable(&self) -> Option<&Tunable> {
        match self {
            Self::Translate(p) => Some(p.tunable()),
            Self::Rotate(p) => Some(p.tunable()),
            Self::Pivot(p) => Some(p.tunable()),
            Self::Crankshaft(p) => Some(p.tunable()),
            _ => None,
        }
    }

    /// Returns the tunable parameter mutably.
    pub fn tunable_mut(&mut self) -> Option<&mut Tunable> {
        match self {
            Self::Translate(p) => Some(p.tunable_mut()),
            Self::Rotate(p) => Some(p.tunable_mut()),
            Self::Pivot(p) => Some(p.tunable_mut()),
            Self::Crankshaft(p) => Some(p.tunable_mut()),
            _ => None,
        }
    }
}
