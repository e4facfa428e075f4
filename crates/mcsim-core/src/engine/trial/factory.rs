use super::Trial;
use crate::engine::criteria::Criteria;
use crate::engine::error::EngineError;
use crate::engine::system::System;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

/// The weighted collection of trials a simulation dispatches over.
///
/// Each driver step draws a trial index from the cumulative weight
/// distribution and delegates the attempt; setup code can instead execute a
/// specific index deterministically. Aggregate acceptance statistics live in
/// the individual trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialFactory {
    trials: Vec<Trial>,
}

impl TrialFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trial.
    pub fn add(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    /// Returns the number of registered trials.
    pub fn num(&self) -> usize {
        self.trials.len()
    }

    /// Returns a trial by index.
    pub fn trial(&self, index: usize) -> &Trial {
        &self.trials[index]
    }

    /// Returns the registered trials.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Attempts one randomly chosen trial, weighted by trial weight.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoTrials`] when the factory is empty.
    pub fn attempt<R: Rng + ?Sized>(
        &mut self,
        criteria: &mut Criteria,
        system: &mut System,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        if self.trials.is_empty() {
            return Err(EngineError::NoTrials);
        }
        let weights: Vec<f64> = self.trials.iter().map(Trial::weight).collect();
        let distribution = WeightedIndex::new(&weights)
            .map_err(|err| EngineError::Internal(format!("invalid trial weights: {}", err)))?;
        let index = distribution.sample(rng);
        self.attempt_specific(index, criteria, system, rng)
    }

    /// Attempts the trial at a specific index (deterministic dispatch).
    pub fn attempt_specific<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        criteria: &mut Criteria,
        system: &mut System,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        self.trials[index].attempt(criteria, system, rng)
    }

    /// Tunes every trial and resets its statistics.
    pub fn tune_all(&mut self) {
        for trial in self.trials.iter_mut() {
            trial.tune();
        }
    }

    /// Sums attempts across all trials.
    pub fn total_attempts(&self) -> u64 {
        self.trials.iter().map(Trial::num_attempts).sum()
    }

    /// Sums accepted attempts across all trials.
    pub fn total_successes(&self) -> u64 {
        self.trials.iter().map(Trial::num_success).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::configuration::Configuration;
    use crate::core::config::particle::Particle;
    use crate::core::spatial::domain::Domain;
    use crate::engine::system::Potential;
    use crate::core::model::two_body::TwoBodyModel;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn lj_system(num_particles: usize) -> System {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(Particle::single_site(0, 3));
        for _ in 0..num_particles {
            config.add_particle_of_type(0);
        }
        let mut system = System::new(config);
        system.add_potential(Potential::two_body(TwoBodyModel::lennard_jones()));
        system
    }

    #[test]
    fn empty_factories_refuse_to_dispatch() {
        let mut factory = TrialFactory::new();
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        let mut system = lj_system(1);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            factory.attempt(&mut criteria, &mut system, &mut rng),
            Err(EngineError::NoTrials)
        ));
    }

    #[test]
    fn weighted_dispatch_prefers_heavier_trials() {
        let mut factory = TrialFactory::new();
        factory.add(Trial::translate(0.1).with_weight(100.0));
        factory.add(Trial::rotate(0.1).with_weight(0.001));
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(0.0);
        let mut system = lj_system(2);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            factory.attempt(&mut criteria, &mut system, &mut rng).unwrap();
        }
        assert!(factory.trial(0).num_attempts() > 40);
        assert_eq!(factory.total_attempts(), 50);
    }

    #[test]
    fn attempt_specific_hits_the_requested_trial() {
        let mut factory = TrialFactory::new();
        factory.add(Trial::translate(0.1));
        factory.add(Trial::rotate(0.1));
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(0.0);
        let mut system = lj_system(1);
        let mut rng = StdRng::seed_from_u64(5);
        factory
            .attempt_specific(1, &mut criteria, &mut system, &mut rng)
            .unwrap();
        assert_eq!(factory.trial(0).num_attempts(), 0);
        assert_eq!(factory.trial(1).num_attempts(), 1);
    }

    #[test]
    fn tune_all_resets_statistics() {
        let mut factory = TrialFactory::new();
        factory.add(Trial::translate(0.1));
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(0.0);
        let mut system = lj_system(2);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            factory.attempt(&mut criteria, &mut system, &mut rng).unwrap();
        }
        factory.tune_all();
        assert_eq!(factory.total_attempts(), 0);
    }
}
