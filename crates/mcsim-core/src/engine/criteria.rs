use super::error::EngineError;
use crate::core::config::select::Select;
use crate::core::utils::accumulator::Accumulator;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Per-attempt scratch handed from the trial machinery to the acceptance
/// criteria.
///
/// Reset before every attempt; accumulates the log-Metropolis probability,
/// the proposed new running total energy, the old and reference energies, a
/// forced-rejection flag (set for example by an empty selection), and the
/// union of all perturbed sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceptance {
    ln_metropolis_prob: f64,
    energy_new: f64,
    energy_old: f64,
    energy_ref: f64,
    macrostate_shift: i64,
    reject: bool,
    perturbed: Select,
}

impl Acceptance {
    /// Resets all stored quantities before a trial attempt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the natural log of the Metropolis acceptance probability.
    pub fn ln_metropolis_prob(&self) -> f64 {
        self.ln_metropolis_prob
    }

    /// Adds to the log-Metropolis probability.
    pub fn add_to_ln_metropolis_prob(&mut self, delta: f64) {
        self.ln_metropolis_prob += delta;
    }

    /// Returns whether the trial is rejected outright.
    pub fn reject(&self) -> bool {
        self.reject
    }

    /// Forces outright rejection.
    pub fn set_reject(&mut self, reject: bool) {
        self.reject = reject;
    }

    /// Returns the proposed new running total energy.
    pub fn energy_new(&self) -> f64 {
        self.energy_new
    }

    /// Sets the proposed new running total energy.
    pub fn set_energy_new(&mut self, energy: f64) {
        self.energy_new = energy;
    }

    /// Adds to the proposed new energy.
    pub fn add_to_energy_new(&mut self, energy: f64) {
        self.energy_new += energy;
    }

    /// Returns the energy of the old configuration.
    pub fn energy_old(&self) -> f64 {
        self.energy_old
    }

    /// Sets the energy of the old configuration.
    pub fn set_energy_old(&mut self, energy: f64) {
        self.energy_old = energy;
    }

    /// Adds to the energy of the old configuration.
    pub fn add_to_energy_old(&mut self, energy: f64) {
        self.energy_old += energy;
    }

    /// Returns the reference-potential energy of the attempt.
    pub fn energy_ref(&self) -> f64 {
        self.energy_ref
    }

    /// Sets the reference-potential energy of the attempt.
    pub fn set_energy_ref(&mut self, energy: f64) {
        self.energy_ref = energy;
    }

    /// Returns the macrostate shift of the attempt (e.g. -1 for a removal
    /// whose deletion is deferred to finalize).
    pub fn macrostate_shift(&self) -> i64 {
        self.macrostate_shift
    }

    /// Adds to the macrostate shift.
    pub fn add_to_macrostate_shift(&mut self, shift: i64) {
        self.macrostate_shift += shift;
    }

    /// Returns the union of all sites perturbed so far in this attempt.
    pub fn perturbed(&self) -> &Select {
        &self.perturbed
    }

    /// Merges a stage's mobile selection into the perturbed set.
    pub fn add_to_perturbed(&mut self, selection: &Select) {
        self.perturbed.union(selection);
    }
}

/// Running series of a Mayer-sampling run.
///
/// `f12 = exp(-beta * energy) - 1` is the Mayer bond of the pair
/// configuration. The `mayer` series records the sign of the last accepted
/// bond, the `mayer_ref` series the reference-bond ratio; their mean ratio
/// estimates the second virial coefficient relative to the reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MayerStats {
    f12_old: f64,
    f12_ref: f64,
    mayer: Accumulator,
    mayer_ref: Accumulator,
}

impl MayerStats {
    /// Returns the sign series of the sampled Mayer bond.
    pub fn mayer(&self) -> &Accumulator {
        &self.mayer
    }

    /// Returns the reference-bond ratio series.
    pub fn mayer_ref(&self) -> &Accumulator {
        &self.mayer_ref
    }

    /// Returns the running second-virial ratio estimate.
    pub fn second_virial_ratio(&self) -> f64 {
        self.mayer.mean() / self.mayer_ref.mean()
    }
}

/// The acceptance-decision policy of a [`Criteria`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AcceptancePolicy {
    /// Accept iff `uniform < exp(ln_metropolis_prob)`.
    Metropolis,
    /// Never accept; validates that proposal mechanics alone carry no bias.
    AlwaysReject,
    /// Accept on the ratio of Mayer f-bond magnitudes rather than a
    /// Boltzmann factor; accumulates the virial-series averages as a side
    /// effect of every step.
    Mayer(MayerStats),
}

/// The acceptance criteria: thermodynamic state plus decision policy.
///
/// Owns beta (inverse temperature, which must be set before first use),
/// per-type chemical potentials, and the single running total energy of the
/// system. The running energy is updated only through accepted trials, never
/// recomputed from scratch here; explicit consistency checks live in the
/// steppers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    beta: f64,
    beta_initialized: bool,
    chemical_potentials: Vec<f64>,
    current_energy: f64,
    policy: AcceptancePolicy,
}

impl Criteria {
    /// Creates criteria with the given policy; beta remains unset.
    pub fn new(policy: AcceptancePolicy) -> Self {
        Self {
            beta: 0.0,
            beta_initialized: false,
            chemical_potentials: Vec::new(),
            current_energy: 0.0,
            policy,
        }
    }

    /// Creates Metropolis criteria; beta remains unset.
    pub fn metropolis() -> Self {
        Self::new(AcceptancePolicy::Metropolis)
    }

    /// Creates Mayer-sampling criteria; beta remains unset.
    pub fn mayer() -> Self {
        Self::new(AcceptancePolicy::Mayer(MayerStats::default()))
    }

    /// Sets the inverse temperature.
    pub fn set_beta(&mut self, beta: f64) {
        self.beta = beta;
        self.beta_initialized = true;
    }

    /// Returns the inverse temperature.
    ///
    /// # Errors
    ///
    /// [`EngineError::BetaNotInitialized`] before the first `set_beta`.
    pub fn beta(&self) -> Result<f64, EngineError> {
        if self.beta_initialized {
            Ok(self.beta)
        } else {
            Err(EngineError::BetaNotInitialized)
        }
    }

    /// Registers the chemical potential of the next particle type.
    ///
    /// Chemical potentials are indexed by particle type in registration
    /// order.
    pub fn add_chemical_potential(&mut self, chemical_potential: f64) {
        self.chemical_potentials.push(chemical_potential);
    }

    /// Returns the chemical potential of a particle type.
    pub fn chemical_potential(&self, particle_type: usize) -> Result<f64, EngineError> {
        self.chemical_potentials
            .get(particle_type)
            .copied()
            .ok_or(EngineError::ChemicalPotentialMissing { particle_type })
    }

    /// Returns the dimensionless product of beta and the chemical potential.
    pub fn beta_mu(&self, particle_type: usize) -> Result<f64, EngineError> {
        Ok(self.beta()? * self.chemical_potential(particle_type)?)
    }

    /// Sets the running total energy (initialization and explicit resets
    /// only; trials update it through acceptance).
    pub fn set_current_energy(&mut self, energy: f64) {
        self.current_energy = energy;
    }

    /// Returns the running total energy.
    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    /// Returns the acceptance policy.
    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    /// Returns the Mayer series when running under the Mayer policy.
    pub fn mayer_stats(&self) -> Option<&MayerStats> {
        match &self.policy {
            AcceptancePolicy::Mayer(stats) => Some(stats),
            _ => None,
        }
    }

    /// Decides whether a trial attempt is accepted, updating the running
    /// energy on acceptance.
    ///
    /// # Arguments
    ///
    /// * `acceptance` - The attempt's accumulated acceptance state.
    /// * `uniform` - One uniform random draw in `[0, 1)`.
    ///
    /// # Errors
    ///
    /// [`EngineError::BetaNotInitialized`] when beta was never set.
    pub fn is_accepted(
        &mut self,
        acceptance: &Acceptance,
        uniform: f64,
    ) -> Result<bool, EngineError> {
        let beta = self.beta()?;
        match &mut self.policy {
            AcceptancePolicy::Metropolis => {
                let accepted = !acceptance.reject()
                    && uniform < acceptance.ln_metropolis_prob().exp();
                if accepted {
                    self.current_energy = acceptance.energy_new();
                }
                trace!(
                    accepted,
                    ln_prob = acceptance.ln_metropolis_prob(),
                    "metropolis decision"
                );
                Ok(accepted)
            }
            AcceptancePolicy::AlwaysReject => Ok(false),
            AcceptancePolicy::Mayer(stats) => {
                let f12 = (-beta * acceptance.energy_new()).exp() - 1.0;
                let accepted = !acceptance.reject()
                    && (stats.f12_old == 0.0
                        || uniform < (f12 / stats.f12_old).abs());
                if accepted {
                    stats.f12_old = f12;
                    // the reference bond of the newly accepted state
                    stats.f12_ref = (-beta * acceptance.energy_ref()).exp() - 1.0;
                    self.current_energy = acceptance.energy_new();
                }
                if stats.f12_old.abs() > f64::EPSILON {
                    stats
                        .mayer
                        .accumulate(if stats.f12_old < 0.0 { -1.0 } else { 1.0 });
                    stats.mayer_ref.accumulate(stats.f12_ref / stats.f12_old.abs());
                }
                Ok(accepted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metropolis_with_beta(beta: f64) -> Criteria {
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(beta);
        criteria
    }

    #[test]
    fn beta_must_be_set_before_use() {
        let mut criteria = Criteria::metropolis();
        assert!(matches!(
            criteria.beta(),
            Err(EngineError::BetaNotInitialized)
        ));
        let acceptance = Acceptance::default();
        assert!(matches!(
            criteria.is_accepted(&acceptance, 0.5),
            Err(EngineError::BetaNotInitialized)
        ));
        criteria.set_beta(1.0);
        assert_eq!(criteria.beta().unwrap(), 1.0);
    }

    #[test]
    fn metropolis_accepts_downhill_moves() {
        let mut criteria = metropolis_with_beta(1.0);
        let mut acceptance = Acceptance::default();
        acceptance.add_to_ln_metropolis_prob(2.0);
        acceptance.set_energy_new(-1.5);
        assert!(criteria.is_accepted(&acceptance, 0.999).unwrap());
        assert_eq!(criteria.current_energy(), -1.5);
    }

    #[test]
    fn metropolis_rejects_when_the_draw_exceeds_the_probability() {
        let mut criteria = metropolis_with_beta(1.0);
        criteria.set_current_energy(3.0);
        let mut acceptance = Acceptance::default();
        acceptance.add_to_ln_metropolis_prob((0.5f64).ln());
        acceptance.set_energy_new(7.0);
        assert!(!criteria.is_accepted(&acceptance, 0.75).unwrap());
        // rejected attempts never touch the running energy
        assert_eq!(criteria.current_energy(), 3.0);
    }

    #[test]
    fn forced_rejection_wins_over_any_probability() {
        let mut criteria = metropolis_with_beta(1.0);
        let mut acceptance = Acceptance::default();
        acceptance.add_to_ln_metropolis_prob(100.0);
        acceptance.set_reject(true);
        assert!(!criteria.is_accepted(&acceptance, 0.0).unwrap());
    }

    #[test]
    fn always_reject_never_accepts() {
        let mut criteria = Criteria::new(AcceptancePolicy::AlwaysReject);
        criteria.set_beta(1.0);
        let mut acceptance = Acceptance::default();
        acceptance.add_to_ln_metropolis_prob(100.0);
        assert!(!criteria.is_accepted(&acceptance, 0.0).unwrap());
    }

    #[test]
    fn mayer_accepts_the_first_attempt_and_tracks_the_bond() {
        let mut criteria = Criteria::mayer();
        criteria.set_beta(1.0);
        let mut acceptance = Acceptance::default();
        acceptance.set_energy_new(-1.0);
        assert!(criteria.is_accepted(&acceptance, 0.99).unwrap());
        let stats = criteria.mayer_stats().unwrap();
        assert_eq!(stats.mayer().count(), 1);
        // exp(1) - 1 > 0, so the sign series records +1
        assert_eq!(stats.mayer().mean(), 1.0);
    }

    #[test]
    fn mayer_acceptance_uses_bond_ratio_not_boltzmann() {
        let mut criteria = Criteria::mayer();
        criteria.set_beta(1.0);

        let mut first = Acceptance::default();
        first.set_energy_new(-1.0);
        assert!(criteria.is_accepted(&first, 0.5).unwrap());
        let f_old = (1.0f64).exp() - 1.0;

        // a much weaker bond: f_new/f_old is small even though exp(-beta dE) < 1
        // would also be small; the draw decides against the BOND ratio
        let mut second = Acceptance::default();
        second.set_energy_new(-0.1);
        let f_new = (0.1f64).exp() - 1.0;
        let ratio = (f_new / f_old).abs();

        assert!(!criteria.is_accepted(&second, ratio + 1e-9).unwrap());
        assert_eq!(criteria.current_energy(), -1.0);

        assert!(criteria.is_accepted(&second, ratio - 1e-9).unwrap());
        assert_eq!(criteria.current_energy(), -0.1);
    }

    #[test]
    fn chemical_potentials_index_by_registration_order() {
        let mut criteria = metropolis_with_beta(2.0);
        criteria.add_chemical_potential(-2.5);
        criteria.add_chemical_potential(1.0);
        assert_eq!(criteria.chemical_potential(0).unwrap(), -2.5);
        assert_eq!(criteria.beta_mu(1).unwrap(), 2.0);
        assert!(matches!(
            criteria.chemical_potential(2),
            Err(EngineError::ChemicalPotentialMissing { particle_type: 2 })
        ));
    }

    #[test]
    fn perturbed_set_unions_stage_selections() {
        let mut acceptance = Acceptance::default();
        acceptance.add_to_perturbed(&Select::particle(2, vec![0]));
        acceptance.add_to_perturbed(&Select::particle(0, vec![1]));
        assert_eq!(acceptance.perturbed().particle_indices(), &[0, 2]);
        acceptance.reset();
        assert!(acceptance.perturbed().is_empty());
    }
}
