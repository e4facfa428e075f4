use super::one_body::OneBodyModel;
use super::two_body::TwoBodyModel;
use super::{ModelOneBody, ModelTwoBody};
use crate::core::config::configuration::Configuration;
use crate::core::config::select::Select;
use crate::core::config::site::Site;
use itertools::Itertools;

/// Returns the cutoff-tested minimum-image pair energy of two sites, or zero
/// beyond the mixed cutoff.
pub(crate) fn pair_energy(
    model: &TwoBodyModel,
    config: &Configuration,
    site1: &Site,
    site2: &Site,
) -> f64 {
    let squared_distance = config
        .domain()
        .squared_separation(site1.position(), site2.position());
    let (type1, type2) = (site1.type_id(), site2.type_id());
    let cutoff = config.model_params().mixed("cutoff", type1, type2);
    if squared_distance > cutoff * cutoff {
        return 0.0;
    }
    model.energy(squared_distance, type1, type2, config.model_params())
}

/// The brute-force energy visitor.
///
/// Iterates all site pairs of a group with a double loop and a per-pair
/// minimum-image wrap. O(N²) in the particle count; this is the correctness
/// baseline that cell-accelerated visitors are validated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitModel;

impl VisitModel {
    /// Returns the total two-body energy of a group.
    ///
    /// Every unordered cross-particle site pair is visited exactly once;
    /// unphysical sites are skipped.
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential.
    /// * `config` - The configuration to iterate.
    /// * `group_index` - Which group to restrict the loop to.
    pub fn two_body(model: &TwoBodyModel, config: &Configuration, group_index: usize) -> f64 {
        let select = config.group_select(group_index);
        let mut energy = 0.0;
        for (i, j) in (0..select.num_particles()).tuple_combinations() {
            let p1 = select.particle_index(i);
            let p2 = select.particle_index(j);
            for &s1 in select.site_indices(i) {
                let site1 = config.particle(p1).site(s1);
                if !site1.is_physical() {
                    continue;
                }
                for &s2 in select.site_indices(j) {
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

    /// Returns the two-body energy of a selection against a group.
    ///
    /// Pairs between the selection and the rest of the group are always
    /// counted; pairs with both sites inside the selection are counted once.
    /// Same-particle pairs are never visited here (see the intra visitor).
    ///
    /// # Arguments
    ///
    /// * `model` - The pair potential.
    /// * `config` - The configuration to iterate.
    /// * `selection` - The mobile sites whose interactions are wanted.
    /// * `group_index` - The environment group.
    pub fn two_body_of(
        model: &TwoBodyModel,
        config: &Configuration,
        selection: &Select,
        group_index: usize,
    ) -> f64 {
        let group = config.group_select(group_index);
        let mut energy = 0.0;
        for (p1, s1) in selection.site_pairs() {
            let site1 = config.particle(p1).site(s1);
            for i in 0..group.num_particles() {
                let p2 = group.particle_index(i);
                if p2 == p1 {
                    continue;
                }
                for &s2 in group.site_indices(i) {
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

    /// Returns the total one-body energy of a group.
    ///
    /// # Arguments
    ///
    /// * `model` - The single-site potential.
    /// * `config` - The configuration to iterate.
    /// * `group_index` - Which group to restrict the loop to.
    pub fn one_body(model: &OneBodyModel, config: &Configuration, group_index: usize) -> f64 {
        let mut energy = 0.0;
        config.for_each_site(group_index, |_, _, site| {
            if site.is_physical() {
                energy += model.energy(site, config.model_params());
            }
        });
        energy
    }

    /// Returns the one-body energy of a selection.
    ///
    /// # Arguments
    ///
    /// * `model` - The single-site potential.
    /// * `config` - The configuration to read sites from.
    /// * `selection` - The sites whose energy is wanted.
    pub fn one_body_of(model: &OneBodyModel, config: &Configuration, selection: &Select) -> f64 {
        let mut energy = 0.0;
        for (p, s) in selection.site_pairs() {
            energy += model.energy(config.particle(p).site(s), config.model_params());
        }
        energy
    }
}
