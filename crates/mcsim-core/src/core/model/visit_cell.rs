use super::two_body::TwoBodyModel;
use super::visit::pair_energy;
use crate::core::config::configuration::Configuration;
use crate::core::config::select::Select;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellVisitError {
    #[error("cell list {index} does not exist in the domain")]
    MissingCellList { index: usize },
    #[error(
        "stale cell membership: site ({particle}, {site}) is registered in cell \
         {registered} but its position maps to cell {actual}"
    )]
    StaleMembership {
        particle: usize,
        site: usize,
        registered: usize,
        actual: usize,
    },
}

/// The cell-accelerated energy visitor, for two-body models only.
///
/// Instead of all particle pairs, only the neighbor stencil of each occupied
/// bin is visited, which brings the average cost down to O(N · stencil) for
/// short-ranged cutoff potentials. Correctness rests entirely on the
/// membership invariant maintained by the configuration's position tracker;
/// [`VisitModelCell::check`] validates that invariant against a fresh
/// recompute and should be wired into periodic consistency checks, because a
/// stale membership silently produces wrong energies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitModelCell {
    /// Which of the domain's cell lists to iterate.
    cells_index: usize,
}

impl VisitModelCell {
    /// Creates a visitor over the given cell list.
    ///
    /// # Arguments
    ///
    /// * `cells_index` - Index of a cell list previously built with
    ///   `Configuration::init_cells`.
    pub fn new(cells_index: usize) -> Self {
        Self { cells_index }
    }

    /// Returns the cell-list index this visitor iterates.
    pub fn cells_index(&self) -> usize {
        self.cells_index
    }

    /// Returns the total two-body energy of the configuration.
    ///
    /// Bin pairs are visited once (`cell1 < cell2` over the stencil), then
    /// member pairs within each bin once.
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential.
    /// * `config` - The configuration to iterate.
    pub fn two_body(&self, model: &TwoBodyModel, config: &Configuration) -> f64 {
        let cells = config.domain().cells(self.cells_index);
        let mut energy = 0.0;
        for cell1 in 0..cells.num_total() {
            let members1 = cells.members_of(cell1);
            if members1.is_empty() {
                continue;
            }
            // neighboring bins, each unordered bin pair visited once
            for &cell2 in cells.neighbors_of(cell1) {
                if cell1 >= cell2 {
                    continue;
                }
                for &(p1, s1) in members1 {
                    let site1 = config.particle(p1).site(s1);
                    if !site1.is_physical() {
                        continue;
                    }
                    for &(p2, s2) in cells.members_of(cell2) {
                        if p1 == p2 {
                            continue;
                        }
                        let site2 = config.particle(p2).site(s2);
                        if !site2.is_physical() {
                            continue;
                        }
                        energy += pair_energy(model, config, site1, site2);
                    }
                }
            }
            // within the bin itself
            for i in 0..members1.len() {
                let (p1, s1) = members1[i];
                let site1 = config.particle(p1).site(s1);
                if !site1.is_physical() {
                    continue;
                }
                for &(p2, s2) in members1.iter().skip(i + 1) {
                    if p1 == p2 {
                        continue;
                    }
                    let site2 = config.particle(p2).site(s2);
                    if !site2.is_physical() {
                        continue;
                    }
                    energy += pair_energy(model, config, site1, site2);
                }
            }
        }
        energy
    }

    /// Returns the two-body energy of a selection against the rest of the
    /// configuration, walking only the stencils of the selected sites.
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential.
    /// * `config` - The configuration to iterate.
    /// * `selection` - The mobile sites whose interactions are wanted.
    pub fn two_body_of(
        &self,
        model: &TwoBodyModel,
        config: &Configuration,
        selection: &Select,
    ) -> f64 {
        let cells = config.domain().cells(self.cells_index);
        let mut energy = 0.0;
        for (p1, s1) in selection.site_pairs() {
            let site1 = config.particle(p1).site(s1);
            let cell1 = site1.cell_id(self.cells_index);
            for &cell2 in cells.neighbors_of(cell1) {
                for &(p2, s2) in cells.members_of(cell2) {
                    if p1 == p2 {
                        continue;
                    }
                    if selection.contains_site(p2, s2) && (p2, s2) < (p1, s1) {
                        continue;
                    }
                    let site2 = config.particle(p2).site(s2);
                    if !site2.is_physical() {
                        continue;
                    }
                    energy += pair_energy(model, config, site1, site2);
                }
            }
        }
        energy
    }

    /// Validates the membership invariant of the underlying cell list.
    ///
    /// Every live site must be registered in exactly the bin its current
    /// position maps to, and the total registered site count must match the
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CellVisitError::StaleMembership`] naming the first
    /// offending site.
    pub fn check(&self, config: &Configuration) -> Result<(), CellVisitError> {
        if self.cells_index >= config.domain().num_cell_lists() {
            return Err(CellVisitError::MissingCellList {
                index: self.cells_index,
            });
        }
        let cells = config.domain().cells(self.cells_index);
        for (p, particle) in config.particles().iter().enumerate() {
            for (s, site) in particle.sites().iter().enumerate() {
                let actual = config.domain().cell_id(self.cells_index, site.position());
                let registered = site.cell_id(self.cells_index);
                if registered != actual
                    || !cells.members_of(registered).contains(&(p, s))
                {
                    return Err(CellVisitError::StaleMembership {
                        particle: p,
                        site: s,
                        registered,
                        actual,
                    });
                }
            }
        }
        debug_assert_eq!(cells.num_sites(), config.num_sites());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::particle::Particle;
    use crate::core::model::visit::VisitModel;
    use crate::core::spatial::domain::Domain;
    use crate::core::spatial::position::Position;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_config(num_particles: usize, box_length: f64, seed: u64) -> Configuration {
        let mut config = Configuration::new(Domain::cubic(box_length));
        config.add_particle_type(Particle::single_site(0, 3));
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..num_particles {
            let index = config.add_particle_of_type(0);
            let displacement = Position::new(vec![
                rng.gen_range(-0.5 * box_length..0.5 * box_length),
                rng.gen_range(-0.5 * box_length..0.5 * box_length),
                rng.gen_range(-0.5 * box_length..0.5 * box_length),
            ]);
            config.displace_selection(
                &Select::particle(index, vec![0]),
                &displacement,
            );
        }
        config
    }

    #[test]
    fn cell_energy_matches_brute_force_for_random_configurations() {
        for seed in 0..3 {
            let mut config = random_config(60, 12.0, seed);
            let list = config.init_cells(3.0).unwrap();
            let visitor = VisitModelCell::new(list);
            let model = TwoBodyModel::lennard_jones();
            let brute = VisitModel::two_body(&model, &config, 0);
            let celled = visitor.two_body(&model, &config);
            assert!(
                (brute - celled).abs() < 1e-9,
                "seed {}: brute {} vs cell {}",
                seed,
                brute,
                celled
            );
        }
    }

    #[test]
    fn cell_energy_tracks_moves_across_bin_boundaries() {
        let mut config = random_config(50, 12.0, 9);
        let list = config.init_cells(3.0).unwrap();
        let visitor = VisitModelCell::new(list);
        let model = TwoBodyModel::lennard_jones();
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..20 {
            let index = rng.gen_range(0..config.num_particles());
            let displacement = Position::new(vec![
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
            ]);
            config.displace_selection(&Select::particle(index, vec![0]), &displacement);
            visitor.check(&config).unwrap();
            let brute = VisitModel::two_body(&model, &config, 0);
            let celled = visitor.two_body(&model, &config);
            assert!((brute - celled).abs() < 1e-9);
        }
    }

    #[test]
    fn selection_energy_matches_brute_force_selection_energy() {
        let mut config = random_config(40, 12.0, 21);
        let list = config.init_cells(3.0).unwrap();
        let visitor = VisitModelCell::new(list);
        let model = TwoBodyModel::lennard_jones();
        for index in [0, 7, 39] {
            let selection = Select::particle(index, vec![0]);
            let brute = VisitModel::two_body_of(&model, &config, &selection, 0);
            let celled = visitor.two_body_of(&model, &config, &selection);
            assert!((brute - celled).abs() < 1e-9);
        }
    }

    #[test]
    fn check_passes_on_consistent_membership() {
        let mut config = random_config(30, 12.0, 5);
        let list = config.init_cells(3.0).unwrap();
        VisitModelCell::new(list).check(&config).unwrap();
    }

    #[test]
    fn check_fails_for_missing_cell_list() {
        let config = random_config(5, 12.0, 5);
        let result = VisitModelCell::new(0).check(&config);
        assert!(matches!(
            result,
            Err(CellVisitError::MissingCellList { .. })
        ));
    }
}
