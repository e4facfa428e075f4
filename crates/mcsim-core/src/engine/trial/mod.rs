//! # Trial Module
//!
//! Randomized proposals to change the configuration.
//!
//! A trial composes one or more stages (selection + perturbation) with a
//! computation policy that turns stage energies into an acceptance
//! probability, and hands the result to the criteria for the final
//! decision. Accepted trials finalize their stages; rejected trials revert
//! them in reverse order, restoring the configuration exactly.

pub mod compute;
pub mod factory;
pub mod rosenbluth;
pub mod select;
pub mod stage;

use super::criteria::{Acceptance, Criteria};
use super::error::EngineError;
use super::perturb::Perturb;
use super::perturb::grow::{PerturbDistanceFromAnchor, PerturbReptate};
use super::perturb::morph::PerturbParticleType;
use super::perturb::rotate::{PerturbCrankshaft, PerturbPivot, PerturbRotate};
use super::perturb::transfer::{PerturbAdd, PerturbRemove};
use super::perturb::translate::PerturbTranslate;
use super::system::System;
use compute::TrialCompute;
use rand::Rng;
use select::TrialSelect;
use serde::{Deserialize, Serialize};
use stage::TrialStage;
use tracing::{debug, instrument};

/// A randomized proposal: stages plus a computation policy plus statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    weight: f64,
    num_attempts: u64,
    num_success: u64,
    compute: TrialCompute,
    stages: Vec<TrialStage>,
    #[serde(skip)]
    acceptance: Acceptance,
}

impl Trial {
    /// Creates a trial from explicit stages and a computation policy.
    pub fn new(stages: Vec<TrialStage>, compute: TrialCompute) -> Self {
        Self {
            weight: 1.0,
            num_attempts: 0,
            num_success: 0,
            compute,
            stages,
            acceptance: Acceptance::default(),
        }
    }

    /// Rigid translation of a random particle.
    pub fn translate(max_move: f64) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::random_particle(),
                Perturb::Translate(PerturbTranslate::new(max_move)),
            )],
            TrialCompute::Move,
        )
    }

    /// Rigid rotation of a random particle.
    pub fn rotate(max_angle: f64) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::random_particle(),
                Perturb::Rotate(PerturbRotate::new(max_angle)),
            )],
            TrialCompute::Move,
        )
    }

    /// Pivot rotation of a random chain tail.
    pub fn pivot(max_angle: f64) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::chain_tail(),
                Perturb::Pivot(PerturbPivot::new(max_angle)),
            )],
            TrialCompute::Move,
        )
    }

    /// Crankshaft rotation of a random interior chain segment.
    pub fn crankshaft(max_angle: f64) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::chain_segment(),
                Perturb::Crankshaft(PerturbCrankshaft::new(max_angle)),
            )],
            TrialCompute::Move,
        )
    }

    /// Grand-canonical insertion of a particle of one type.
    pub fn add(particle_type: usize) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::new_particle(particle_type),
                Perturb::Add(PerturbAdd::new(particle_type)),
            )],
            TrialCompute::Add,
        )
    }

    /// Grand-canonical removal of a random particle of one type.
    pub fn remove(particle_type: usize) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::random_particle().of_type(particle_type),
                Perturb::Remove(PerturbRemove::new()),
            )],
            TrialCompute::Remove,
        )
    }

    /// Morph of a random particle of one type into another.
    pub fn morph(from_type: usize, to_type: usize) -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::random_particle().of_type(from_type),
                Perturb::ParticleType(PerturbParticleType::new(to_type)),
            )],
            TrialCompute::Morph,
        )
    }

    /// Reptation of a random linear chain.
    pub fn reptate() -> Self {
        Self::new(
            vec![TrialStage::new(
                TrialSelect::chain_end(),
                Perturb::Reptate(PerturbReptate::default()),
            )],
            TrialCompute::Move,
        )
    }

    /// Staged configurational-bias regrowth of chain sites.
    ///
    /// Each `(mobile_site, anchor_site)` pair becomes one stage placing the
    /// mobile site at bond distance from its anchor, with `num_steps`
    /// candidates per stage and full Rosenbluth accounting.
    pub fn grow(site_anchor_pairs: Vec<(usize, usize)>, num_steps: usize) -> Self {
        let stages = site_anchor_pairs
            .into_iter()
            .map(|(mobile, anchor)| {
                TrialStage::new(
                    TrialSelect::site_in_particle(mobile, anchor),
                    Perturb::DistanceFromAnchor(PerturbDistanceFromAnchor::default()),
                )
                .with_num_steps(num_steps)
            })
            .collect();
        Self::new(stages, TrialCompute::Move)
    }

    /// Sets the unnormalized dispatch weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Flags every stage as new-only (Mayer sampling).
    pub fn new_only(mut self) -> Self {
        for stage in self.stages.iter_mut() {
            stage.set_new_only(true);
        }
        self
    }

    /// Evaluates every stage's candidates with a reference potential.
    pub fn with_reference(mut self, reference_index: usize) -> Self {
        for stage in self.stages.iter_mut() {
            stage.set_reference(Some(reference_index));
        }
        self
    }

    /// Returns the dispatch weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns the stages.
    pub fn stages(&self) -> &[TrialStage] {
        &self.stages
    }

    /// Returns the number of attempts since the last statistics reset.
    pub fn num_attempts(&self) -> u64 {
        self.num_attempts
    }

    /// Returns the number of accepted attempts since the last reset.
    pub fn num_success(&self) -> u64 {
        self.num_success
    }

    /// Returns the acceptance ratio since the last reset.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.num_attempts == 0 {
            0.0
        } else {
            self.num_success as f64 / self.num_attempts as f64
        }
    }

    /// Resets the attempt statistics.
    pub fn reset_stats(&mut self) {
        self.num_attempts = 0;
        self.num_success = 0;
    }

    /// Returns the most recent attempt's acceptance state.
    pub fn accept(&self) -> &Acceptance {
        &self.acceptance
    }

    /// Tunes every stage toward the observed acceptance ratio, then resets
    /// the statistics.
    pub fn tune(&mut self) {
        let ratio = self.acceptance_ratio();
        for stage in self.stages.iter_mut() {
            stage.tune(ratio);
        }
        self.reset_stats();
    }

    /// Attempts the trial once. Returns whether it was accepted.
    ///
    /// The full protocol: reset scratch, select every stage (an empty
    /// selection forces rejection without energy evaluation), compute the
    /// acceptance state, draw one uniform number for the criteria, then
    /// finalize on acceptance or revert in reverse stage order on
    /// rejection.
    #[instrument(level = "debug", skip_all)]
    pub fn attempt<R: Rng + ?Sized>(
        &mut self,
        criteria: &mut Criteria,
        system: &mut System,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        self.num_attempts += 1;
        self.acceptance.reset();
        for stage in self.stages.iter_mut() {
            stage.before_select();
            stage.select(system, &mut self.acceptance, rng);
        }
        if !self.acceptance.reject() {
            self.compute.perturb_and_acceptance(
                criteria,
                system,
                &mut self.acceptance,
                &mut self.stages,
                rng,
            )?;
        }
        let uniform = rng.gen_range(0.0..1.0);
        let accepted = criteria.is_accepted(&self.acceptance, uniform)?;
        if accepted {
            self.num_success += 1;
            for stage in self.stages.iter_mut().rev() {
                stage.finalize(system);
            }
            debug!(energy = criteria.current_energy(), "accepted");
        } else {
            for stage in self.stages.iter_mut().rev() {
                stage.revert(system);
            }
            debug!("rejected");
        }
        Ok(accepted)
    }
}
