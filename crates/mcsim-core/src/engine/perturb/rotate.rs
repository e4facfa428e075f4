use crate::core::config::select::SelectPosition;
use crate::core::spatial::position::Position;
use crate::core::spatial::rotation::RotationMatrix;
use crate::engine::error::EngineError;
use crate::engine::system::System;
use crate::engine::trial::select::TrialSelect;
use crate::engine::tunable::Tunable;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Applies a rotation to the cached original positions of a selection and
/// writes the result into the system without rewrapping.
fn apply_rotation(
    system: &mut System,
    select: &TrialSelect,
    rotation: &RotationMatrix,
    pivot: &Position,
) {
    let mut moved: SelectPosition = select.mobile_original().clone();
    for i in 0..moved.num_particles() {
        for j in 0..moved.site_indices(i).len() {
            let mut position = moved.site_position(i, j).clone();
            rotation.rotate(&mut position, pivot);
            moved.set_site_position(i, j, position);
        }
    }
    system.configuration_mut().update_positions(&moved, false);
}

/// Rigid rotation of a whole particle about its reference position.
///
/// The tunable parameter is the maximum rotation angle in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbRotate {
    tunable: Tunable,
    #[serde(skip)]
    revert_possible: bool,
}

impl Default for PerturbRotate {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl PerturbRotate {
    /// Creates a rotation with the given maximum angle in radians.
    pub fn new(max_angle: f64) -> Self {
        Self {
            tunable: Tunable::new(max_angle, 1e-10, std::f64::consts::PI),
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
        let rotation = RotationMatrix::random(dimension, self.tunable.value(), rng);
        let pivot = select.mobile_original().particle_position(0).clone();
        apply_rotation(system, select, &rotation, &pivot);
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

/// Rotation of a chain tail about an anchor site (pivot move).
///
/// The selection provides the tail as mobile sites and the pivot as the
/// anchor site; the tunable parameter is the maximum angle in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbPivot {
    tunable: Tunable,
    #[serde(skip)]
    revert_possible: bool,
}

impl Default for PerturbPivot {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl PerturbPivot {
    /// Creates a pivot move with the given maximum angle in radians.
    pub fn new(max_angle: f64) -> Self {
        Self {
            tunable: Tunable::new(max_angle, 1e-10, std::f64::consts::PI),
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
        let anchor = select.anchor();
        let p = anchor.particle_index(0);
        let s = anchor.site_indices(0)[0];
        let pivot = system
            .configuration()
            .particle(p)
            .site(s)
            .position()
            .clone();
        let dimension = system.configuration().dimension();
        let rotation = RotationMatrix::random(dimension, self.tunable.value(), rng);
        apply_rotation(system, select, &rotation, &pivot);
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

/// Rotation of an interior chain segment about the axis between its two
/// anchor sites (crankshaft move). Three-dimensional configurations only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbCrankshaft {
    tunable: Tunable,
    #[serde(skip)]
    revert_possible: bool,
}

impl Default for PerturbCrankshaft {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl PerturbCrankshaft {
    /// Creates a crankshaft move with the given maximum angle in radians.
    pub fn new(max_angle: f64) -> Self {
        Self {
            tunable: Tunable::new(max_angle, 1e-10, std::f64::consts::PI),
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
        assert_eq!(
            system.configuration().dimension(),
            3,
            "crankshaft moves require three dimensions"
        );
        let anchor = select.anchor();
        let p = anchor.particle_index(0);
        let anchors = anchor.site_indices(0);
        let first = system
            .configuration()
            .particle(p)
            .site(anchors[0])
            .position()
            .clone();
        let second = system.configuration().particle(p).site(anchors[1]).position();
        let mut axis = second.clone();
        axis.subtract(&first);
        let angle = rng.gen_range(-self.tunable.value()..=self.tunable.value());
        let rotation = RotationMatrix::from_axis_angle(&axis, angle);
        apply_rotation(system, select, &rotation, &first);
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

    fn chain_system() -> System {
        let mut config = Configuration::new(Domain::cubic(20.0));
        config.add_particle_type(Particle::chain(0, 5, 1.0));
        config.add_particle_of_type(0);
        System::new(config)
    }

    #[test]
    fn rotate_preserves_intra_particle_distances_and_reverts_exactly() {
        for seed in 0..10 {
            let mut system = chain_system();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut select = TrialSelect::random_particle();
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let before = system.configuration().clone();
            let d01_before = before
                .particle(0)
                .site(0)
                .position()
                .distance(before.particle(0).site(1).position());

            let mut perturb = PerturbRotate::new(1.0);
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
            let d01_after = system
                .configuration()
                .particle(0)
                .site(0)
                .position()
                .distance(system.configuration().particle(0).site(1).position());
            assert!((d01_before - d01_after).abs() < 1e-10);

            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }

    #[test]
    fn pivot_leaves_head_fixed_and_reverts_exactly() {
        for seed in 0..10 {
            let mut system = chain_system();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut select = TrialSelect::chain_tail();
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let pivot_site = select.anchor().site_indices(0)[0];
            let before = system.configuration().clone();

            let mut perturb = PerturbPivot::new(1.0);
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
            // sites up to and including the pivot never move
            for s in 0..=pivot_site {
                assert_eq!(
                    system.configuration().particle(0).site(s).position(),
                    before.particle(0).site(s).position()
                );
            }
            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }

    #[test]
    fn crankshaft_fixes_both_anchors_and_reverts_exactly() {
        for seed in 0..10 {
            let mut system = chain_system();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut select = TrialSelect::chain_segment();
            assert!(select.select(&Select::new(), system.configuration(), &mut rng));
            let anchors: Vec<usize> = select.anchor().site_indices(0).to_vec();
            let before = system.configuration().clone();

            let mut perturb = PerturbCrankshaft::new(1.0);
            perturb
                .perturb(&mut system, &mut select, &mut rng, false)
                .unwrap();
            for &s in &anchors {
                assert_eq!(
                    system.configuration().particle(0).site(s).position(),
                    before.particle(0).site(s).position()
                );
            }
            // bond lengths along the segment are preserved
            for window in 0..4 {
                let b = before
                    .particle(0)
                    .site(window)
                    .position()
                    .distance(before.particle(0).site(window + 1).position());
                let a = system
                    .configuration()
                    .particle(0)
                    .site(window)
                    .position()
                    .distance(system.configuration().particle(0).site(window + 1).position());
                assert!((a - b).abs() < 1e-10);
            }

            perturb.revert(&mut system, &select);
            assert_eq!(system.configuration(), &before);
        }
    }
}
