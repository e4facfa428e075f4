use crate::engine::error::EngineError;
use crate::engine::system::System;
use crate::engine::trial::select::TrialSelect;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Insertion of one particle of a fixed type at a uniformly random position.
///
/// The particle is added on the first `perturb` of an attempt and claimed as
/// the stage's mobile selection; every subsequent candidate call re-places
/// it. Revert removes the just-added particle again; finalize keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbAdd {
    particle_type: usize,
    #[serde(skip)]
    added: Option<usize>,
}

impl PerturbAdd {
    /// Creates an insertion of the given particle type.
    pub fn new(particle_type: usize) -> Self {
        Self {
            particle_type,
            added: None,
        }
    }

    /// Returns the inserted particle type.
    pub fn particle_type(&self) -> usize {
        self.particle_type
    }

    pub fn reset(&mut self) {
        self.added = None;
    }

    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        rng: &mut R,
        _position_held: bool,
    ) -> Result<(), EngineError> {
        if self.added.is_none() {
            let index = system
                .configuration_mut()
                .add_particle_of_type(self.particle_type);
            select.set_mobile_particle(system.configuration(), index);
            self.added = Some(index);
            trace!(index, "inserted trial particle");
        }
        let index = self.added.expect("just ensured above");
        let target = system.configuration().domain().random_position(rng);
        let mut displacement = target;
        displacement.subtract(system.configuration().particle(index).position());
        system
            .configuration_mut()
            .displace_selection(select.mobile().select(), &displacement);
        Ok(())
    }

    pub fn revert(&mut self, system: &mut System, _select: &TrialSelect) {
        if let Some(index) = self.added.take() {
            system.configuration_mut().remove_particle(index);
        }
    }

    pub fn finalize(&mut self) {
        self.added = None;
    }
}

/// Deletion of the selected particle.
///
/// The actual removal is deferred to finalize: `perturb` only marks the
/// selection unphysical after its old-configuration energy was captured, so
/// revert can restore the exact pre-attempt state (positions, properties,
/// particle count) without re-deriving anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerturbRemove {
    #[serde(skip)]
    revert_possible: bool,
    #[serde(skip)]
    finalize_possible: bool,
}

impl PerturbRemove {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.revert_possible = false;
        self.finalize_possible = false;
    }

    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        _rng: &mut R,
        _position_held: bool,
    ) -> Result<(), EngineError> {
        system
            .configuration_mut()
            .set_selection_physical(select.mobile().select(), false);
        self.revert_possible = true;
        self.finalize_possible = true;
        Ok(())
    }

    pub fn revert(&mut self, system: &mut System, select: &TrialSelect) {
        if self.revert_possible {
            system
                .configuration_mut()
                .set_selection_physical(select.mobile().select(), true);
        }
    }

    pub fn finalize(&mut self, system: &mut System, select: &TrialSelect) {
        if self.finalize_possible {
            let index = select.mobile().particle_index(0);
            system.configuration_mut().remove_particle(index);
            trace!(index, "removed particle");
            self.finalize_possible = false;
            self.revert_possible = false;
        }
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
    fn add_then_revert_restores_the_particle_count_and_state() {
        for seed in 0..10 {
            let mut system = system_with_particles(2);
            let mut rng = StdRng::seed_from_u64(seed);
            let before = system.configuration().clone();

            let mut select = TrialSelect::new_particle(0);
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let mut perturb = PerturbAdd::new(0);
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
            assert_eq!(system.configuration().num_particles(), 3);

            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }

    #[test]
    fn add_finalize_keeps_the_particle_inside_the_box() {
        let mut system = system_with_particles(0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut select = TrialSelect::new_particle(0);
        assert!(select.select(&Select::new(), system.configuration(), &mut rng));
        let mut perturb = PerturbAdd::new(0);
        perturb
            .perturb(&mut system, &mut select, &mut rng, false)
            .unwrap();
        perturb.finalize();
        assert_eq!(system.configuration().num_particles(), 1);
        let position = system.configuration().particle(0).site(0).position();
        for dim in 0..3 {
            assert!(position.get(dim).abs() <= 4.0);
        }
        // a finalized add must not be revertible
        perturb.revert(&mut system, &select);
        assert_eq!(system.configuration().num_particles(), 1);
    }

    #[test]
    fn repeated_add_perturbs_replace_rather_than_duplicate() {
        let mut system = system_with_particles(0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut select = TrialSelect::new_particle(0);
        assert!(select.select(&Select::new(), system.configuration(), &mut rng));
        let mut perturb = PerturbAdd::new(0);
        for _ in 0..5 {
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
        }
        assert_eq!(system.configuration().num_particles(), 1);
    }

    #[test]
    fn remove_defers_deletion_to_finalize() {
        let mut system = system_with_particles(3);
        let mut rng = StdRng::seed_from_u64(4);
        let mut select = TrialSelect::random_particle();
        assert!(select.select(&Select::new(), system.configuration(), &mut rng));
        let before = system.configuration().clone();

        let mut perturb = PerturbRemove::new();
        perturb
            .perturb(&mut system, &mut select, &mut rng, true)
            .unwrap();
        // still three particles, but the selection no longer interacts
        assert_eq!(system.configuration().num_particles(), 3);
        let p = select.mobile().particle_index(0);
        assert!(!system.configuration().particle(p).site(0).is_physical());

        perturb.finalize(&mut system, &select);
        assert_eq!(system.configuration().num_particles(), 2);
        let _ = before;
    }

    #[test]
    fn remove_then_revert_is_byte_identical() {
        for seed in 0..10 {
            let mut system = system_with_particles(4);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut select = TrialSelect::random_particle();
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let before = system.configuration().clone();

            let mut perturb = PerturbRemove::new();
            perturb
                .perturb(&mut system, &mut select, &mut rng, true)
                .unwrap();
            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }
}
