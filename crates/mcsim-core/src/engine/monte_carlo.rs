use super::criteria::Criteria;
use super::error::EngineError;
use super::steppers::{Analyze, Modify};
use super::system::System;
use super::trial::Trial;
use super::trial::factory::TrialFactory;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

/// The driver loop: system, criteria, trials, steppers, and the random
/// number source, advanced one attempt at a time.
///
/// Construction computes the initial total energy so the criteria's running
/// total starts consistent; from then on the total is only updated through
/// accepted trials, and the `CheckEnergy` stepper validates the invariant
/// periodically.
pub struct MonteCarlo {
    system: System,
    criteria: Criteria,
    trials: TrialFactory,
    rng: StdRng,
    analyzers: Vec<Box<dyn Analyze>>,
    modifiers: Vec<Box<dyn Modify>>,
    num_trials: u64,
}

impl MonteCarlo {
    /// Creates a driver over a system and criteria, seeding the random
    /// number generator for reproducible runs.
    ///
    /// # Errors
    ///
    /// Propagates energy-evaluation errors from the initial total.
    pub fn new(system: System, mut criteria: Criteria, seed: u64) -> Result<Self, EngineError> {
        let initial_energy = system.energy()?;
        criteria.set_current_energy(initial_energy);
        debug!(initial_energy, "driver initialized");
        Ok(Self {
            system,
            criteria,
            trials: TrialFactory::new(),
            rng: StdRng::seed_from_u64(seed),
            analyzers: Vec::new(),
            modifiers: Vec::new(),
            num_trials: 0,
        })
    }

    /// Returns the system.
    pub fn system(&self) -> &System {
        &self.system
    }

    /// Returns the system mutably (setup only; never during a trial).
    pub fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }

    /// Returns the criteria.
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Returns the criteria mutably.
    pub fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    /// Returns the trial factory.
    pub fn trials(&self) -> &TrialFactory {
        &self.trials
    }

    /// Registers a trial.
    pub fn add_trial(&mut self, trial: Trial) {
        self.trials.add(trial);
    }

    /// Registers a read-only stepper.
    pub fn add_analyze(&mut self, mut analyze: Box<dyn Analyze>) {
        analyze.initialize(&self.criteria, &self.system, &self.trials);
        self.analyzers.push(analyze);
    }

    /// Registers a mutating stepper.
    pub fn add_modify(&mut self, mut modify: Box<dyn Modify>) {
        modify.initialize(&mut self.criteria, &mut self.system, &mut self.trials);
        self.modifiers.push(modify);
    }

    /// Returns the number of trial attempts driven so far.
    pub fn num_trials(&self) -> u64 {
        self.num_trials
    }

    /// Attempts `num` trials, polling the steppers on their schedules.
    ///
    /// # Errors
    ///
    /// Stepper failures (energy divergence, wall-clock exhaustion) and
    /// trial-machinery failures abort the loop immediately.
    #[instrument(skip(self))]
    pub fn attempt(&mut self, num: u64) -> Result<(), EngineError> {
        for _ in 0..num {
            self.trials
                .attempt(&mut self.criteria, &mut self.system, &mut self.rng)?;
            self.num_trials += 1;
            self.poll_steppers()?;
        }
        Ok(())
    }

    /// Forces insertion attempts until the configuration holds `target`
    /// particles of the given type.
    ///
    /// Uses a dedicated insertion trial dispatched deterministically,
    /// bypassing the registered trial weights; the running energy stays
    /// consistent because the attempts run under the normal criteria.
    pub fn seek_num_particles(
        &mut self,
        particle_type: usize,
        target: usize,
    ) -> Result<(), EngineError> {
        let mut add = Trial::add(particle_type);
        let mut attempts: u64 = 0;
        while self
            .system
            .configuration()
            .num_particles_of_type(particle_type)
            < target
        {
            add.attempt(&mut self.criteria, &mut self.system, &mut self.rng)?;
            attempts += 1;
            if attempts > 1_000_000 {
                return Err(EngineError::Internal(format!(
                    "unable to reach {} particles of type {} in {} attempts",
                    target, particle_type, attempts
                )));
            }
        }
        Ok(())
    }

    fn poll_steppers(&mut self) -> Result<(), EngineError> {
        for analyze in self.analyzers.iter_mut() {
            if self.num_trials % analyze.steps_per() == 0 {
                analyze.update(&self.criteria, &self.system, &self.trials)?;
            }
        }
        for modify in self.modifiers.iter_mut() {
            if self.num_trials % modify.steps_per() == 0 {
                modify.update(&mut self.criteria, &mut self.system, &mut self.trials)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::configuration::Configuration;
    use crate::core::config::particle::Particle;
    use crate::core::model::two_body::TwoBodyModel;
    use crate::core::spatial::domain::Domain;
    use crate::engine::steppers::CheckEnergy;
    use crate::engine::system::Potential;

    fn lj_system(num_particles: usize, box_length: f64) -> System {
        use crate::core::config::select::Select;
        use crate::core::spatial::position::Position;

        let mut config = Configuration::new(Domain::cubic(box_length));
        config.add_particle_type(Particle::single_site(0, 3));
        // spread on a grid so the starting state has no overlaps
        let spacing = 2.0;
        let per_side = (box_length / spacing) as usize;
        for i in 0..num_particles {
            let index = config.add_particle_of_type(0);
            let (x, y, z) = (
                i % per_side,
                (i / per_side) % per_side,
                i / (per_side * per_side),
            );
            let offset = |n: usize| -0.5 * box_length + 0.5 * spacing + spacing * n as f64;
            config.displace_selection(
                &Select::particle(index, vec![0]),
                &Position::new(vec![offset(x), offset(y), offset(z)]),
            );
        }
        let mut system = System::new(config);
        system.add_potential(Potential::two_body(TwoBodyModel::lennard_jones()));
        system
    }

    fn metropolis(beta: f64, mu: f64) -> Criteria {
        let mut criteria = Criteria::metropolis();
        criteria.set_beta(beta);
        criteria.add_chemical_potential(mu);
        criteria
    }

    #[test]
    fn construction_initializes_the_running_energy() {
        let system = lj_system(2, 8.0);
        let expected = system.energy().unwrap();
        let mc = MonteCarlo::new(system, metropolis(1.0, -2.0), 17).unwrap();
        assert_eq!(mc.criteria().current_energy(), expected);
    }

    #[test]
    fn seek_num_particles_reaches_the_target() {
        let system = lj_system(0, 8.0);
        let mut mc = MonteCarlo::new(system, metropolis(0.5, 10.0), 17).unwrap();
        mc.seek_num_particles(0, 5).unwrap();
        assert_eq!(mc.system().configuration().num_particles_of_type(0), 5);
    }

    #[test]
    fn translate_trials_keep_the_energy_consistent() {
        let system = lj_system(8, 10.0);
        let mut mc = MonteCarlo::new(system, metropolis(1.0, -2.0), 3).unwrap();
        mc.add_trial(Trial::translate(0.3));
        mc.add_modify(Box::new(CheckEnergy::new(50, 1e-8)));
        mc.attempt(500).unwrap();
        assert_eq!(mc.num_trials(), 500);
        let recomputed = mc.system().energy().unwrap();
        assert!((recomputed - mc.criteria().current_energy()).abs() < 1e-8);
    }

    #[test]
    fn accepted_translate_tracks_the_analytic_pair_energy() {
        use crate::core::config::select::Select;
        use crate::core::spatial::position::Position;

        // two LJ particles (sigma = epsilon = 1) at separation 1.25 in a
        // 6x6x6 box; after one accepted translate the running energy must
        // equal 4(r^-12 - r^-6) recomputed from the new separation
        let mut config = Configuration::new(Domain::cubic(6.0));
        config.add_particle_type(Particle::single_site(0, 3));
        config.add_particle_of_type(0);
        let second = config.add_particle_of_type(0);
        config.displace_selection(
            &Select::particle(second, vec![0]),
            &Position::new(vec![1.25, 0.0, 0.0]),
        );
        let mut system = System::new(config);
        system.add_potential(Potential::two_body(TwoBodyModel::lennard_jones()));

        let mut criteria = Criteria::metropolis();
        criteria.set_beta(1.0);
        let mut mc = MonteCarlo::new(system, criteria, 21).unwrap();
        mc.add_trial(Trial::translate(0.15));

        while mc.trials().total_successes() == 0 {
            mc.attempt(1).unwrap();
            assert!(mc.num_trials() < 1000, "no acceptance in 1000 attempts");
        }

        let config = mc.system().configuration();
        let r2 = config.domain().squared_separation(
            config.particle(0).site(0).position(),
            config.particle(1).site(0).position(),
        );
        let r = r2.sqrt();
        let expected = 4.0 * (r.powi(-12) - r.powi(-6));
        assert!(
            (mc.criteria().current_energy() - expected).abs() < 1e-10,
            "running {} vs direct {}",
            mc.criteria().current_energy(),
            expected
        );
    }

    #[test]
    fn mayer_sampling_estimates_the_lj_second_virial() {
        use crate::core::config::select::Select;
        use crate::core::spatial::position::Position;
        use std::f64::consts::PI;

        // two LJ particles in a huge box with a near-infinite cutoff; the
        // hard-sphere reference potential provides the normalization
        let mut config = Configuration::new(Domain::cubic(1000.0));
        config.add_particle_type(Particle::single_site(0, 3));
        config.add_particle_of_type(0);
        let second = config.add_particle_of_type(0);
        config.displace_selection(
            &Select::particle(second, vec![0]),
            &Position::new(vec![1.1, 0.0, 0.0]),
        );
        config.set_model_param("cutoff", 0, 499.0);
        let mut system = System::new(config);
        system.add_potential(Potential::two_body(TwoBodyModel::lennard_jones()));
        system.add_reference(Potential::two_body(TwoBodyModel::hard_sphere()));

        let mut criteria = Criteria::mayer();
        criteria.set_beta(1.0);
        let mut mc = MonteCarlo::new(system, criteria, 19).unwrap();
        mc.add_trial(Trial::translate(1.0).new_only().with_reference(0));

        mc.attempt(20_000).unwrap();

        let stats = mc.criteria().mayer_stats().unwrap();
        assert_eq!(stats.mayer().count(), 20_000);
        let b2 = 2.0 / 3.0 * PI * stats.second_virial_ratio();
        // the exact value at this temperature is about -5.3; a short run
        // only brackets it loosely
        assert!(b2 < 0.0, "b2 = {}", b2);
        assert!((b2 - (-5.3)).abs() < 15.0, "b2 = {}", b2);
    }

    #[test]
    fn mixed_transfer_trials_keep_the_energy_consistent() {
        let system = lj_system(4, 10.0);
        let mut mc = MonteCarlo::new(system, metropolis(0.8, -2.0), 7).unwrap();
        mc.add_trial(Trial::translate(0.4));
        mc.add_trial(Trial::add(0));
        mc.add_trial(Trial::remove(0));
        mc.add_modify(Box::new(CheckEnergy::new(500, 1e-8)));
        mc.attempt(10_000).unwrap();
        let recomputed = mc.system().energy().unwrap();
        assert!((recomputed - mc.criteria().current_energy()).abs() < 1e-8);
        assert!(mc.system().configuration().num_particles() > 0);
    }

    #[test]
    fn cell_accelerated_trials_stay_consistent_with_brute_force() {
        use crate::core::model::visit_cell::VisitModelCell;
        use crate::engine::system::VisitStrategy;

        let mut system = lj_system(30, 12.0);
        let list = system.configuration_mut().init_cells(3.0).unwrap();
        let cell_potential = Potential::two_body(TwoBodyModel::lennard_jones())
            .with_visitor(VisitStrategy::Cell(VisitModelCell::new(list)));
        // replace the brute-force potential installed by the helper
        let mut cell_system = System::new(system.configuration().clone());
        cell_system.add_potential(cell_potential);

        let mut mc = MonteCarlo::new(cell_system, metropolis(1.0, 0.2), 23).unwrap();
        mc.add_trial(Trial::translate(0.5));
        mc.add_trial(Trial::add(0));
        mc.add_trial(Trial::remove(0));
        mc.add_modify(Box::new(CheckEnergy::new(20, 1e-8)));
        mc.attempt(300).unwrap();

        // the cell list is still internally consistent
        VisitModelCell::new(list)
            .check(mc.system().configuration())
            .unwrap();

        // and agrees with a brute-force recomputation
        let brute = Potential::two_body(TwoBodyModel::lennard_jones());
        let brute_energy = brute.energy(mc.system().configuration()).unwrap();
        let cell_energy = mc.system().energy().unwrap();
        assert!(
            (brute_energy - cell_energy).abs() < 1e-9,
            "brute {} vs cell {}",
            brute_energy,
            cell_energy
        );
        assert!((cell_energy - mc.criteria().current_energy()).abs() < 1e-8);
    }
}
