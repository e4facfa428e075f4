use crate::core::config::select::SelectPosition;
use crate::core::spatial::position::Position;
use crate::core::spatial::rotation::random_direction;
use crate::engine::error::EngineError;
use crate::engine::system::System;
use crate::engine::trial::select::TrialSelect;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Returns the bond length between two sites of a particle, read from the
/// bond's `length` property, or the fallback when no such bond exists.
fn bond_length(
    system: &System,
    particle_index: usize,
    site1: usize,
    site2: usize,
    fallback: f64,
) -> f64 {
    system
        .configuration()
        .particle(particle_index)
        .bond_between(site1, site2)
        .and_then(|bond| bond.properties.value("length"))
        .unwrap_or(fallback)
}

/// Places a mobile site at a fixed distance and random orientation from an
/// anchor site (one step of growing a chain).
///
/// The distance comes from the bond connecting the mobile and anchor sites
/// when such a bond carries a `length` property, otherwise from the
/// configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbDistanceFromAnchor {
    default_distance: f64,
    #[serde(skip)]
    revert_possible: bool,
}

impl Default for PerturbDistanceFromAnchor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PerturbDistanceFromAnchor {
    /// Creates a placement with the given fallback bond distance.
    pub fn new(default_distance: f64) -> Self {
        Self {
            default_distance,
            revert_possible: false,
        }
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
            self.revert_possible = true;
            return Ok(());
        }
        let p = select.mobile().particle_index(0);
        let mobile_site = select.mobile().site_indices(0)[0];
        let anchor_site = select.anchor().site_indices(0)[0];
        let distance = bond_length(system, p, mobile_site, anchor_site, self.default_distance);

        let anchor_position = system
            .configuration()
            .particle(p)
            .site(anchor_site)
            .position()
            .clone();
        let mut direction = random_direction(system.configuration().dimension(), rng);
        direction.multiply(distance);
        let mut placed = anchor_position;
        placed.add(&direction);

        let mut moved: SelectPosition = select.mobile().clone();
        moved.set_site_position(0, 0, placed);
        system.configuration_mut().update_positions(&moved, false);
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

/// Reptation: the end site of a linear chain crawls to the opposite end.
///
/// `perturb` places the vacating end site at bond distance from the
/// opposite end, which already yields the correct energy difference. The
/// slot shift that restores chain order, moving every site's position and
/// properties down (or up) one index, is deferred to finalize: it reassigns
/// which physical site occupies which slot and must only happen once the
/// trial is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbReptate {
    default_distance: f64,
    #[serde(skip)]
    revert_possible: bool,
    #[serde(skip)]
    finalize_possible: bool,
}

impl Default for PerturbReptate {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PerturbReptate {
    /// Creates a reptation move with the given fallback bond distance.
    pub fn new(default_distance: f64) -> Self {
        Self {
            default_distance,
            revert_possible: false,
            finalize_possible: false,
        }
    }

    pub fn reset(&mut self) {
        self.revert_possible = false;
        self.finalize_possible = false;
    }

    pub fn perturb<R: Rng + ?Sized>(
        &mut self,
        system: &mut System,
        select: &mut TrialSelect,
        rng: &mut R,
        position_held: bool,
    ) -> Result<(), EngineError> {
        if position_held {
            self.finalize_possible = true;
            return Ok(());
        }
        let p = select.mobile().particle_index(0);
        let end = select.mobile().site_indices(0)[0];
        let opposite = select.anchor().site_indices(0)[0];
        // chain spacing from the bond at the vacating end
        let neighbor = if end == 0 { 1 } else { end - 1 };
        let distance = bond_length(system, p, end, neighbor, self.default_distance);

        let target_anchor = system
            .configuration()
            .particle(p)
            .site(opposite)
            .position()
            .clone();
        let mut direction = random_direction(system.configuration().dimension(), rng);
        direction.multiply(distance);
        let mut placed = target_anchor;
        placed.add(&direction);

        let mut moved: SelectPosition = select.mobile().clone();
        moved.set_site_position(0, 0, placed);
        system.configuration_mut().update_positions(&moved, false);
        self.revert_possible = true;
        self.finalize_possible = true;
        Ok(())
    }

    pub fn revert(&mut self, system: &mut System, select: &TrialSelect) {
        if self.revert_possible {
            system
                .configuration_mut()
                .update_positions(select.mobile_original(), false);
        }
    }

    /// Shifts every site's position and properties by one slot so the chain
    /// reads head-to-tail again, with the freshly placed position at the
    /// far end.
    pub fn finalize(&mut self, system: &mut System, select: &TrialSelect) {
        if !self.finalize_possible {
            return;
        }
        self.finalize_possible = false;
        self.revert_possible = false;

        let p = select.mobile().particle_index(0);
        let end = select.mobile().site_indices(0)[0];
        let num_sites = system.configuration().particle(p).num_sites();

        let mut shifted = SelectPosition::new();
        shifted.set_particle(p, (0..num_sites).collect());
        system.configuration().load_selection(&mut shifted);

        let positions: Vec<Position> = (0..num_sites)
            .map(|s| {
                system
                    .configuration()
                    .particle(p)
                    .site(s)
                    .position()
                    .clone()
            })
            .collect();
        let properties: Vec<_> = (0..num_sites)
            .map(|s| system.configuration().particle(p).site(s).properties().clone())
            .collect();

        if end == 0 {
            // head crawled past the tail: slide everything down one slot
            for s in 0..num_sites - 1 {
                shifted.set_site_position(0, s, positions[s + 1].clone());
                shifted.set_site_properties(0, s, properties[s + 1].clone());
            }
            shifted.set_site_position(0, num_sites - 1, positions[0].clone());
            shifted.set_site_properties(0, num_sites - 1, properties[0].clone());
        } else {
            // tail crawled past the head: slide everything up one slot
            for s in (1..num_sites).rev() {
                shifted.set_site_position(0, s, positions[s - 1].clone());
                shifted.set_site_properties(0, s, properties[s - 1].clone());
            }
            shifted.set_site_position(0, 0, positions[num_sites - 1].clone());
            shifted.set_site_properties(0, 0, properties[num_sites - 1].clone());
        }
        system.configuration_mut().update_positions(&shifted, false);
    }
}
