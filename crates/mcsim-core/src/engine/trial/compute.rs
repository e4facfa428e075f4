use super::stage::TrialStage;
use crate::core::config::select::Select;
use crate::engine::criteria::{Acceptance, Criteria};
use crate::engine::error::EngineError;
use crate::engine::perturb::Perturb;
use crate::engine::system::System;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Runs every stage for one side of the attempt and folds the stage
/// Rosenbluth factors into the acceptance state.
///
/// When any stage used a reference potential, the energy bookkeeping is
/// corrected against the full potential over all perturbed sites.
fn compute_rosenbluth<R: Rng + ?Sized>(
    old: bool,
    criteria: &Criteria,
    system: &mut System,
    acceptance: &mut Acceptance,
    stages: &mut [TrialStage],
    rng: &mut R,
) -> Result<(), EngineError> {
    let mut ln_rosenbluth = 0.0;
    let mut energy_change = 0.0;
    let mut reference_used = false;
    for index in 0..stages.len() {
        stages[index].attempt(system, criteria, old, rng)?;
        if stages[index].rosenbluth().chosen_step().is_none() {
            acceptance.set_reject(true);
            trace!("auto reject: every candidate forbidden");
            for stage in stages.iter_mut() {
                stage.set_mobile_physical(true, system);
            }
            return Ok(());
        }
        let energy = if old {
            stages[index].rosenbluth().energy(0)
        } else {
            stages[index].rosenbluth().chosen_energy()
        };
        if old {
            acceptance.add_to_energy_old(energy);
            ln_rosenbluth -= stages[index].rosenbluth().ln_total();
        } else {
            acceptance.add_to_energy_new(energy);
            ln_rosenbluth += stages[index].rosenbluth().ln_total();
        }
        energy_change += energy;
        if stages[index].reference_index().is_some() {
            reference_used = true;
        }
    }
    if reference_used {
        let mut perturbed = Select::new();
        for stage in stages.iter() {
            perturbed.union(stage.trial_select().mobile().select());
        }
        let full = system.energy_of(&perturbed)?;
        acceptance.set_energy_ref(energy_change);
        if old {
            acceptance.set_energy_old(full);
            acceptance.add_to_ln_metropolis_prob(-criteria.beta()? * (-full + energy_change));
        } else {
            acceptance.set_energy_new(full);
            acceptance.add_to_ln_metropolis_prob(-criteria.beta()? * (full - energy_change));
        }
    }
    acceptance.add_to_ln_metropolis_prob(ln_rosenbluth);
    Ok(())
}

/// How a trial turns its stages into an acceptance probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialCompute {
    /// Old energy, perturb, new energy; the proposed total is the running
    /// total plus the difference. Stages flagged new-only skip the old pass
    /// and report the absolute selection energy (Mayer sampling).
    Move,
    /// New-configuration energy plus the grand-canonical insertion factor
    /// `ln(V/N_new) + beta*mu`.
    Add,
    /// Old-configuration energy plus the grand-canonical removal factor
    /// `ln(N_old/V) - beta*mu`.
    Remove,
    /// Like `Move`, plus the semigrand identity-swap factor for the
    /// chemical-potential difference and type counts.
    Morph,
}

impl TrialCompute {
    /// Performs the stages on the system and fills the acceptance state.
    pub fn perturb_and_acceptance<R: Rng + ?Sized>(
        &self,
        criteria: &Criteria,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut R,
    ) -> Result<(), EngineError> {
        match self {
            Self::Move => Self::compute_move(criteria, system, acceptance, stages, rng),
            Self::Add => Self::compute_add(criteria, system, acceptance, stages, rng),
            Self::Remove => Self::compute_remove(criteria, system, acceptance, stages, rng),
            Self::Morph => Self::compute_morph(criteria, system, acceptance, stages, rng),
        }
    }

    fn compute_move<R: Rng + ?Sized>(
        criteria: &Criteria,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let new_only = stages.iter().any(TrialStage::is_new_only);
        if new_only {
            compute_rosenbluth(false, criteria, system, acceptance, stages, rng)?;
            // the absolute selection energy is the proposed total
            return Ok(());
        }
        compute_rosenbluth(true, criteria, system, acceptance, stages, rng)?;
        if acceptance.reject() {
            return Ok(());
        }
        for stage in stages.iter_mut() {
            stage.mid_stage(system);
        }
        compute_rosenbluth(false, criteria, system, acceptance, stages, rng)?;
        let delta = acceptance.energy_new() - acceptance.energy_old();
        acceptance.set_energy_new(criteria.current_energy() + delta);
        trace!(delta, "move energy difference");
        Ok(())
    }

    fn compute_add<R: Rng + ?Sized>(
        criteria: &Criteria,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut R,
    ) -> Result<(), EngineError> {
        compute_rosenbluth(false, criteria, system, acceptance, stages, rng)?;
        if acceptance.reject() {
            return Ok(());
        }
        acceptance.set_energy_new(criteria.current_energy() + acceptance.energy_new());

        let select = stages[0].trial_select();
        let particle_index = select.mobile().particle_index(0);
        let particle_type = system.configuration().particle(particle_index).type_id();
        let volume = system.configuration().domain().volume();
        // the count already includes the inserted particle
        let count_new = system.configuration().num_particles_of_type(particle_type) as f64;
        acceptance
            .add_to_ln_metropolis_prob((volume / count_new).ln() + criteria.beta_mu(particle_type)?);
        Ok(())
    }

    fn compute_remove<R: Rng + ?Sized>(
        criteria: &Criteria,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut R,
    ) -> Result<(), EngineError> {
        compute_rosenbluth(true, criteria, system, acceptance, stages, rng)?;
        if acceptance.reject() {
            return Ok(());
        }
        acceptance.set_energy_new(criteria.current_energy() - acceptance.energy_old());
        acceptance.add_to_macrostate_shift(-1);

        let select = stages[0].trial_select();
        let particle_index = select.mobile().particle_index(0);
        let particle_type = system.configuration().particle(particle_index).type_id();
        let volume = system.configuration().domain().volume();
        // the particle is still present; its deletion is deferred to finalize
        let count_old = system.configuration().num_particles_of_type(particle_type) as f64;
        acceptance.add_to_ln_metropolis_prob(
            -(volume / count_old).ln() - criteria.beta_mu(particle_type)?,
        );
        Ok(())
    }

    fn compute_morph<R: Rng + ?Sized>(
        criteria: &Criteria,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut R,
    ) -> Result<(), EngineError> {
        compute_rosenbluth(true, criteria, system, acceptance, stages, rng)?;
        if acceptance.reject() {
            return Ok(());
        }
        for stage in stages.iter_mut() {
            stage.mid_stage(system);
        }
        compute_rosenbluth(false, criteria, system, acceptance, stages, rng)?;
        let delta = acceptance.energy_new() - acceptance.energy_old();
        acceptance.set_energy_new(criteria.current_energy() + delta);

        let (old_type, new_type) = match stages[0].perturb() {
            Perturb::ParticleType(morph) => (
                morph
                    .old_type()
                    .ok_or_else(|| EngineError::Internal("morph never ran".to_string()))?,
                morph.new_type(),
            ),
            _ => {
                return Err(EngineError::Internal(
                    "morph compute requires a particle-type perturbation".to_string(),
                ));
            }
        };
        // counts after the morph: the particle already switched identity
        let count_old_after = system.configuration().num_particles_of_type(old_type) as f64;
        let count_new_after = system.configuration().num_particles_of_type(new_type) as f64;
        acceptance.add_to_ln_metropolis_prob(
            criteria.beta_mu(new_type)? - criteria.beta_mu(old_type)?
                + ((count_old_after + 1.0) / count_new_after).ln(),
        );
        Ok(())
    }
}
