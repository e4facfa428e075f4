use super::rosenbluth::Rosenbluth;
use super::select::TrialSelect;
use crate::engine::criteria::{Acceptance, Criteria};
use crate::engine::error::EngineError;
use crate::engine::perturb::Perturb;
use crate::engine::system::System;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One stage of a trial: a selection paired with a perturbation.
///
/// A stage realizes its perturbation in `num_steps` candidate placements
/// (Rosenbluth steps). A reference potential may replace the full potential
/// during the candidate loop, following the dual-cut configurational-bias
/// approach; the difference is corrected against the full potential once
/// per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialStage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_index: Option<usize>,
    new_only: bool,
    select: TrialSelect,
    perturb: Perturb,
    rosenbluth: Rosenbluth,
}

impl TrialStage {
    /// Creates a single-candidate stage from a selection and perturbation.
    pub fn new(select: TrialSelect, perturb: Perturb) -> Self {
        Self {
            reference_index: None,
            new_only: false,
            select,
            perturb,
            rosenbluth: Rosenbluth::new(1),
        }
    }

    /// Sets the number of candidate placements per attempt.
    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.rosenbluth = Rosenbluth::new(num_steps);
        self
    }

    /// Evaluates candidates with a reference potential.
    pub fn with_reference(mut self, reference_index: usize) -> Self {
        self.reference_index = Some(reference_index);
        self
    }

    /// Sets or clears the reference potential.
    pub fn set_reference(&mut self, reference_index: Option<usize>) {
        self.reference_index = reference_index;
    }

    /// Skips the old-configuration computation (Mayer sampling).
    pub fn set_new_only(&mut self, new_only: bool) {
        self.new_only = new_only;
    }

    /// Returns whether the stage skips the old configuration.
    pub fn is_new_only(&self) -> bool {
        self.new_only
    }

    /// Returns the reference-potential index, if any.
    pub fn reference_index(&self) -> Option<usize> {
        self.reference_index
    }

    /// Returns the stage's selection.
    pub fn trial_select(&self) -> &TrialSelect {
        &self.select
    }

    /// Returns the stage's perturbation.
    pub fn perturb(&self) -> &Perturb {
        &self.perturb
    }

    /// Returns the stage's candidate bookkeeping.
    pub fn rosenbluth(&self) -> &Rosenbluth {
        &self.rosenbluth
    }

    /// Clears per-attempt state before selection.
    pub fn before_select(&mut self) {
        self.perturb.reset();
        self.rosenbluth.reset();
    }

    /// Draws the stage selection and marks it unphysical until the stage
    /// runs; an empty selection forces rejection.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        acceptance: &mut Acceptance,
        rng: &mut R,
    ) {
        let found = self
            .select
            .select(acceptance.perturbed(), system.configuration(), rng);
        if found {
            acceptance.add_to_perturbed(self.select.mobile().select());
            self.set_mobile_physical(false, system);
        } else {
            acceptance.set_reject(true);
        }
    }

    /// Marks the mobile selection physical or unphysical.
    pub fn set_mobile_physical(&mut self, physical: bool, system: &mut System) {
        system
            .configuration_mut()
            .set_selection_physical(self.select.mobile().select(), physical);
    }

    /// Runs all candidate placements of the stage and computes the
    /// Rosenbluth factor.
    ///
    /// For the old configuration (`old == true`) the first candidate holds
    /// the current positions. With several candidates the system is
    /// reverted between placements and the chosen candidate's positions are
    /// loaded at the end; with a single candidate the perturbed state is
    /// simply left in place.
    pub fn attempt<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        criteria: &Criteria,
        old: bool,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        self.set_mobile_physical(true, system);
        let num_steps = self.rosenbluth.num();
        debug_assert!(
            num_steps == 1
                || matches!(
                    self.perturb,
                    Perturb::Translate(_)
                        | Perturb::Rotate(_)
                        | Perturb::Pivot(_)
                        | Perturb::Crankshaft(_)
                        | Perturb::DistanceFromAnchor(_)
                ),
            "multi-candidate stages require repositioning perturbations"
        );
        for step in 0..num_steps {
            let position_held = step == 0 && old;
            self.perturb
                .perturb(system, &mut self.select, rng, position_held)?;
            self.rosenbluth
                .store(step, self.select.mobile(), system.configuration());
            let energy = match self.reference_index {
                None => system.energy_of(self.select.mobile().select())?,
                Some(reference) => {
                    system.reference_energy_of(self.select.mobile().select(), reference)?
                }
            };
            self.rosenbluth.set_energy(step, energy);
            if num_steps > 1 {
                self.perturb.revert(system, &self.select);
            }
        }
        self.rosenbluth.compute(criteria.beta()?, rng, old);
        if !old && num_steps > 1 && self.rosenbluth.chosen_step().is_some() {
            system
                .configuration_mut()
                .update_positions(self.rosenbluth.chosen(), false);
        }
        Ok(())
    }

    /// Marks the mobile selection unphysical between the old and new passes
    /// of a staged computation.
    pub fn mid_stage(&mut self, system: &mut System) {
        self.set_mobile_physical(false, system);
    }

    /// Reverts the stage's perturbation and restores the physical flags.
    pub fn revert(&mut self, system: &mut System) {
        self.set_mobile_physical(true, system);
        self.perturb.revert(system, &self.select);
    }

    /// Finalizes the stage's perturbation and restores the physical flags.
    pub fn finalize(&mut self, system: &mut System) {
        self.set_mobile_physical(true, system);
        self.perturb.finalize(system, &self.select);
    }

    /// Tunes the perturbation toward the observed acceptance ratio.
    pub fn tune(&mut self, acceptance_ratio: f64) {
        if let Some(tunable) = self.perturb.tunable_mut() {
            tunable.tune(acceptance_ratio);
        }
    }
}
