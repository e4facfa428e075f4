use crate::core::spatial::position::Position;
use crate::engine::error::EngineError;
use crate::engine::system::System;
use crate::engine::trial::select::TrialSelect;
use crate::engine::tunable::Tunable;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rigid translation of a selection by a uniformly random displacement.
///
/// Each coordinate of the displacement is drawn from
/// `[-max_move, max_move]`, where `max_move` is the tunable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbTranslate {
    tunable: Tunable,
    #[serde(skip)]
    revert_possible: bool,
}

impl Default for PerturbTranslate {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl PerturbTranslate {
    /// Creates a translation with the given maximum displacement per axis.
    pub fn new(max_move: f64) -> Self {
        Self {
            tunable: Tunable::new(max_move, 1e-10, 1e10),
            revert_possible: false,
        }
    }

    pub fn tunable(&self) -> &Tunable {
        &self.tunable
    }

    pub fn tunable_mut(&mut self) -> &mut Tunable {
        &mut self.tunable
    }

    pub fn reset(&mut self) {
        self.revert_possible = false;
    }

    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        rng: &mut R,
        position_held: bool,
    ) -> Result<(), EngineError> {
        if position_held {
            return Ok(());
        }
        let dimension = system.configuration().dimension();
        let max_move = self.tunable.value();
        let displacement = Position::new(
            (0..dimension)
                .map(|_| rng.gen_range(-max_move..=max_move))
                .collect(),
        );
        system
            .configuration_mut()
            .displace_selection(select.mobile().select(), &displacement);
        self.revert_possible = true;
        Ok(())
    }

    pub fn revert(&mut self, system: &mut System, select: &TrialSelect) {
        if self.revert_possible {
            system
                .configuration_mut()
                .update_positions(select.mobile_original(), false);
        }
    }

    pub fn finalize(&mut self) {
        self.revert_possible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::configuration::Configuration;
    use crate::core::config::particle::Particle;
    use crate::core::config::select::Select;
    use crate::core::spatial::domain::Domain;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn system_with_particles(n: usize) -> System {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(Particle::single_site(0, 3));
        for _ in 0..n {
            config.add_particle_of_type(0);
        }
        System::new(config)
    }

    #[test]
    fn perturb_moves_and_revert_restores_exactly() {
        for seed in 0..20 {
            let mut system = system_with_particles(3);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut select = TrialSelect::random_particle();
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let before = system.configuration().clone();

            let mut perturb = PerturbTranslate::new(2.0);
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
            assert_ne!(system.configuration(), &before);

            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);

            // revert is idempotent while never finalized
            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }

    #[test]
    fn position_held_leaves_the_system_untouched() {
        let mut system = system_with_particles(1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut select = TrialSelect::random_particle();
        assert!(select.select(&Select::new(), system.configuration(), &mut rng));
        let before = system.configuration().clone();

        let mut perturb = PerturbTranslate::new(2.0);
        perturb
            .perturb(&mut system, &mut select, &mut rng, true)
            .unwrap();
        assert_eq!(system.configuration(), &before);

        // nothing to revert either
        perturb.revert(&mut system, &select);
        assert_eq!(system.configuration(), &before);
    }

    #[test]
    fn displacement_respects_the_tunable_bound() {
        let mut system = system_with_particles(1);
        let mut rng = StdRng::seed_from_u64(5);
        let mut select = TrialSelect::random_particle();
        assert!(select.select(&Select::new(), system.configuration(), &mut rng));
        let before = system
            .configuration()
            .particle(0)
            .site(0)
            .position()
            .clone();

        let mut perturb = PerturbTranslate::new(0.01);
        perturb
            .perturb(&mut system, &mut select, &mut rng, false)
            .unwrap();
        let after = system.configuration().particle(0).site(0).position();
        for dim in 0..3 {
            assert!((after.get(dim) - before.get(dim)).abs() <= 0.01 + 1e-12);
        }
    }
}
