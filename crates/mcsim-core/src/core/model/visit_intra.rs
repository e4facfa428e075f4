use super::two_body::TwoBodyModel;
use super::visit::pair_energy;
use crate::core::config::configuration::Configuration;
use crate::core::config::select::Select;
use serde::{Deserialize, Serialize};

/// The intra-particle energy visitor.
///
/// Computes same-particle non-bonded pair interactions, skipping pairs whose
/// site-index separation along the chain is at most `intra_cut`. This
/// implements the usual "1-4 exclusion"-style policy for connected chains:
/// with `intra_cut = 1`, directly bonded neighbors are excluded; with
/// `intra_cut = 3`, pairs up to three bonds apart are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitModelIntra {
    /// Pairs with `|s1 - s2| <= intra_cut` are excluded.
    intra_cut: usize,
}

impl VisitModelIntra {
    /// Creates a visitor with the given exclusion window.
    ///
    /// # Arguments
    ///
    /// * `intra_cut` - The largest excluded site-index separation.
    pub fn new(intra_cut: usize) -> Self {
        Self { intra_cut }
    }

    /// Returns the exclusion window.
    pub fn intra_cut(&self) -> usize {
        self.intra_cut
    }

    fn excluded(&self, s1: usize, s2: usize) -> bool {
        s1.abs_diff(s2) <= self.intra_cut
    }

    /// Returns the total intra-particle energy of a group.
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential.
    /// * `config` - The configuration to iterate.
    /// * `group_index` - Which group to restrict the loop to.
    pub fn two_body(
        &self,
        model: &TwoBodyModel,
        config: &Configuration,
        group_index: usize,
    ) -> f64 {
        let select = config.group_select(group_index);
        let mut energy = 0.0;
        for i in 0..select.num_particles() {
            let p = select.particle_index(i);
            let sites = select.site_indices(i);
            for (a, &s1) in sites.iter().enumerate() {
                let site1 = config.particle(p).site(s1);
                if !site1.is_physical() {
                    continue;
                }
                for &s2 in sites.iter().skip(a + 1) {
                    if self.excluded(s1, s2) {
                        continue;
                    }
                    let site2 = config.particle(p).site(s2);
                    if !site2.is_physical() {
                        continue;
                    }
                    energy += pair_energy(model, config, site1, site2);
                }
            }
        }
        energy
    }

    /// Returns the intra-particle energy of a selection against the rest of
    /// each selected particle.
    ///
    /// Pairs with both sites inside the selection are counted once.
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
        let mut energy = 0.0;
        for (p, s1) in selection.site_pairs() {
            let particle = config.particle(p);
            let site1 = particle.site(s1);
            for s2 in 0..particle.num_sites() {
                if s2 == s1 || self.excluded(s1, s2) {
                    continue;
                }
                if selection.contains_site(p, s2) && s2 < s1 {
                    continue;
                }
                let site2 = particle.site(s2);
                if !site2.is_physical() {
                    continue;
                }
                energy += pair_energy(model, config, site1, site2);
            }
        }
        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::particle::Particle;
    use crate::core::spatial::domain::Domain;

    fn chain_config(num_sites: usize) -> Configuration {
        let mut config = Configuration::new(Domain::cubic(20.0));
        config.add_particle_type(Particle::chain(0, num_sites, 1.1));
        config.add_particle_of_type(0);
        config
    }

    #[test]
    fn bonded_neighbors_are_excluded() {
        let config = chain_config(3);
        let model = TwoBodyModel::lennard_jones();
        // only the 0-2 pair survives intra_cut = 1
        let visitor = VisitModelIntra::new(1);
        let r: f64 = 2.2;
        let expected = 4.0 * (r.powi(-12) - r.powi(-6));
        let energy = visitor.two_body(&model, &config, 0);
        assert!((energy - expected).abs() < 1e-12);
    }

    #[test]
    fn wider_windows_exclude_more_pairs() {
        let config = chain_config(4);
        let model = TwoBodyModel::lennard_jones();
        let narrow = VisitModelIntra::new(1).two_body(&model, &config, 0);
        let wide = VisitModelIntra::new(3).two_body(&model, &config, 0);
        assert_ne!(narrow, 0.0);
        assert_eq!(wide, 0.0);
    }

    #[test]
    fn selection_energy_counts_pairs_once() {
        let config = chain_config(5);
        let model = TwoBodyModel::lennard_jones();
        let visitor = VisitModelIntra::new(1);
        let full = visitor.two_body(&model, &config, 0);
        let all = Select::particle(0, (0..5).collect());
        let of_all = visitor.two_body_of(&model, &config, &all);
        assert!((full - of_all).abs() < 1e-12);
    }

    #[test]
    fn single_site_selection_sees_the_rest_of_the_chain() {
        let config = chain_config(3);
        let model = TwoBodyModel::lennard_jones();
        let visitor = VisitModelIntra::new(1);
        let end = Select::particle(0, vec![2]);
        let full = visitor.two_body(&model, &config, 0);
        let of_end = visitor.two_body_of(&model, &config, &end);
        // the only non-excluded pair (0, 2) involves the end site
        assert!((full - of_end).abs() < 1e-12);
    }
}
