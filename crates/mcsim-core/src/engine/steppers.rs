use super::criteria::Criteria;
use super::error::EngineError;
use super::system::System;
use super::trial::factory::TrialFactory;
use std::time::Instant;
use tracing::{info, warn};

/// A read-only collaborator polled by the driver on a fixed schedule.
///
/// Steppers never drive the core; the driver calls `update` every
/// `steps_per` trials and `write` on the same schedule for text output.
///
/// `Send` so that whole drivers can move across replica worker threads.
pub trait Analyze: Send {
    /// How many trials between polls.
    fn steps_per(&self) -> u64;

    /// Called once before the first trial.
    fn initialize(&mut self, _criteria: &Criteria, _system: &System, _trials: &TrialFactory) {}

    /// Called every `steps_per` trials.
    fn update(
        &mut self,
        criteria: &Criteria,
        system: &System,
        trials: &TrialFactory,
    ) -> Result<(), EngineError>;

    /// Returns a status line for logging, if the stepper produces one.
    fn write(
        &mut self,
        _criteria: &Criteria,
        _system: &System,
        _trials: &TrialFactory,
    ) -> Option<String> {
        None
    }
}

/// A mutating collaborator polled by the driver on a fixed schedule.
pub trait Modify: Send {
    /// How many trials between polls.
    fn steps_per(&self) -> u64;

    /// Called once before the first trial.
    fn initialize(
        &mut self,
        _criteria: &mut Criteria,
        _system: &mut System,
        _trials: &mut TrialFactory,
    ) {
    }

    /// Called every `steps_per` trials.
    fn update(
        &mut self,
        criteria: &mut Criteria,
        system: &mut System,
        trials: &mut TrialFactory,
    ) -> Result<(), EngineError>;
}

/// Validates the incremental-energy-tracking invariant.
///
/// Recomputes the total energy from scratch and compares it with the
/// running total tracked through trial acceptances. A divergence beyond the
/// tolerance is fatal by design: it means the revert/finalize bookkeeping
/// broke, and silently absorbing it would corrupt every subsequent
/// acceptance decision.
pub struct CheckEnergy {
    steps_per: u64,
    tolerance: f64,
}

impl CheckEnergy {
    /// Creates a check polled every `steps_per` trials.
    ///
    /// # Arguments
    ///
    /// * `steps_per` - Trials between checks.
    /// * `tolerance` - The largest tolerated absolute difference.
    pub fn new(steps_per: u64, tolerance: f64) -> Self {
        Self {
            steps_per,
            tolerance,
        }
    }
}

impl Modify for CheckEnergy {
    fn steps_per(&self) -> u64 {
        self.steps_per
    }

    fn update(
        &mut self,
        criteria: &mut Criteria,
        system: &mut System,
        _trials: &mut TrialFactory,
    ) -> Result<(), EngineError> {
        let recomputed = system.energy()?;
        let tracked = criteria.current_energy();
        if (recomputed - tracked).abs() > self.tolerance {
            return Err(EngineError::EnergyDivergence {
                tracked,
                recomputed,
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}

/// Periodically tunes every trial's perturbation parameters.
pub struct Tune {
    steps_per: u64,
}

impl Tune {
    pub fn new(steps_per: u64) -> Self {
        Self { steps_per }
    }
}

impl Modify for Tune {
    fn steps_per(&self) -> u64 {
        self.steps_per
    }

    fn update(
        &mut self,
        _criteria: &mut Criteria,
        _system: &mut System,
        trials: &mut TrialFactory,
    ) -> Result<(), EngineError> {
        trials.tune_all();
        Ok(())
    }
}

/// Cooperative wall-clock budget.
///
/// Checked on the polling schedule rather than per trial, to bound the cost
/// of the check; exceeding the budget is a controlled fatal termination,
/// not a recoverable condition.
pub struct WallClockLimit {
    steps_per: u64,
    limit_secs: f64,
    start: Instant,
}

impl WallClockLimit {
    /// Creates a budget of `limit_secs` seconds, polled every `steps_per`
    /// trials.
    pub fn new(steps_per: u64, limit_secs: f64) -> Self {
        Self {
            steps_per,
            limit_secs,
            start: Instant::now(),
        }
    }
}

impl Analyze for WallClockLimit {
    fn steps_per(&self) -> u64 {
        self.steps_per
    }

    fn update(
        &mut self,
        _criteria: &Criteria,
        _system: &System,
        _trials: &TrialFactory,
    ) -> Result<(), EngineError> {
        let elapsed_secs = self.start.elapsed().as_secs_f64();
        if elapsed_secs > self.limit_secs {
            warn!(elapsed_secs, limit_secs = self.limit_secs, "wall clock exhausted");
            return Err(EngineError::WallClockExceeded {
                elapsed_secs,
                limit_secs: self.limit_secs,
            });
        }
        Ok(())
    }
}

/// Periodic status logging through `tracing`.
pub struct Log {
    steps_per: u64,
}

impl Log {
    pub fn new(steps_per: u64) -> Self {
        Self { steps_per }
    }
}

impl Analyze for Log {
    fn steps_per(&self) -> u64 {
        self.steps_per
    }

    fn update(
        &mut self,
        criteria: &Criteria,
        system: &System,
        trials: &TrialFactory,
    ) -> Result<(), EngineError> {
        info!(
            energy = criteria.current_energy(),
            num_particles = system.configuration().num_particles(),
            attempts = trials.total_attempts(),
            successes = trials.total_successes(),
            "status"
        );
        Ok(())
    }

    fn write(
        &mut self,
        criteria: &Criteria,
        system: &System,
        trials: &TrialFactory,
    ) -> Option<String> {
        Some(format!(
            "energy {:.8} particles {} acceptance {:.4}",
            criteria.current_energy(),
            system.configuration().num_particles(),
            if trials.total_attempts() == 0 {
                0.0
            } else {
                trials.total_successes() as f64 / trials.total_attempts() as f64
            }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::configuration::Configuration;
    use crate::core::config::particle::Particle;
    use crate::core::model::two_body::TwoBodyModel;
    use crate::core::spatial::domain::Domain;
    use crate::engine::system::Potential;

    fn small_system() -> System {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(Particle::single_site(0, 3));
        config.add_particle_of_type(0);
        let mut system = System::new(config);
        system.add_potential(Potential::two_body(TwoBodyModel::lennard_jones()));
        system
    }

    #[test]
    fn check_energy_passes_when_tracked_matches() {
        let mut system = small_system();
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(system.energy().unwrap());
        let mut trials = TrialFactory::new();
        let mut check = CheckEnergy::new(10, 1e-8);
        check
            .update(&mut criteria, &mut system, &mut trials)
            .unwrap();
    }

    #[test]
    fn check_energy_fails_loudly_on_divergence() {
        let mut system = small_system();
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(42.0);
        let mut trials = TrialFactory::new();
        let mut check = CheckEnergy::new(10, 1e-8);
        assert!(matches!(
            check.update(&mut criteria, &mut system, &mut trials),
            Err(EngineError::EnergyDivergence { .. })
        ));
    }

    #[test]
    fn wall_clock_limit_trips_after_the_budget() {
        let mut limit = WallClockLimit::new(1, 0.0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let system = small_system();
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        let trials = TrialFactory::new();
        assert!(matches!(
            limit.update(&criteria, &system, &trials),
            Err(EngineError::WallClockExceeded { .. })
        ));
    }

    #[test]
    fn log_write_produces_a_status_line() {
        let system = small_system();
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        criteria.set_current_energy(-1.25);
        let trials = TrialFactory::new();
        let mut log = Log::new(100);
        let line = log.write(&criteria, &system, &trials).unwrap();
        assert!(line.contains("particles 1"));
        assert!(line.contains("energy"));
    }
}
