use super::group::Group;
use super::model_params::ModelParams;
use super::particle::Particle;
use super::select::{Select, SelectPosition};
use super::site::Site;
use crate::core::spatial::domain::{Domain, DomainError};
use crate::core::spatial::position::Position;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The live state of a particle simulation.
///
/// A configuration owns the periodic [`Domain`], the list of live particles,
/// a catalog of particle-type templates used to instantiate new particles,
/// the per-type interaction parameters, and a set of [`Group`]s with their
/// cached member selections (group 0 always selects everything).
///
/// The configuration is the single source of truth: perturbations never
/// touch particle storage directly, they mutate state only through the
/// methods here, which keep the derived state (group selections, cell-list
/// membership) consistent on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    num_site_types: usize,
    domain: Domain,
    particle_types: Vec<Particle>,
    particles: Vec<Particle>,
    groups: Vec<Group>,
    group_selects: Vec<Select>,
    model_params: ModelParams,
}

impl Configuration {
    /// Creates an empty configuration in the given domain.
    ///
    /// The all-matching group is registered at index 0.
    ///
    /// # Arguments
    ///
    /// * `domain` - The periodic box.
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            particle_types: Vec::new(),
            particles: Vec::new(),
            groups: vec![Group::all()],
            group_selects: vec![Select::new()],
            model_params: ModelParams::default(),
            num_site_types: 0,
        }
    }

    /// Returns the domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Returns the spatial dimension.
    pub fn dimension(&self) -> usize {
        self.domain.dimension()
    }

    /// Registers a particle-type template and returns its type id.
    ///
    /// Templates must be registered before interaction parameters are
    /// customized: the parameter tables are re-created to cover the union of
    /// all site types seen so far.
    ///
    /// # Arguments
    ///
    /// * `template` - The template particle; its type id is overwritten with
    ///   the assigned id.
    pub fn add_particle_type(&mut self, mut template: Particle) -> usize {
        assert_eq!(
            template.dimension(),
            self.dimension(),
            "template dimension must match the domain"
        );
        let type_id = self.particle_types.len();
        template.set_type_id(type_id);
        let max_site_type = template
            .sites()
            .iter()
            .map(|site| site.type_id())
            .max()
            .expect("templates must have at least one site");
        self.particle_types.push(template);
        if max_site_type + 1 > self.num_site_types {
            self.num_site_types = max_site_type + 1;
            self.model_params = ModelParams::standard(self.num_site_types);
        }
        type_id
    }

    /// Returns the number of registered particle types.
    pub fn num_particle_types(&self) -> usize {
        self.particle_types.len()
    }

    /// Returns a particle-type template.
    pub fn particle_type(&self, type_id: usize) -> &Particle {
        &self.particle_types[type_id]
    }

    /// Returns the number of distinct site types.
    pub fn num_site_types(&self) -> usize {
        self.num_site_types
    }

    /// Returns the interaction parameter tables.
    pub fn model_params(&self) -> &ModelParams {
        &self.model_params
    }

    /// Sets a self value of a named interaction parameter.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name (e.g. `epsilon`).
    /// * `site_type` - The site type to update.
    /// * `value` - The new self value.
    pub fn set_model_param(&mut self, name: &str, site_type: usize, value: f64) {
        self.model_params.set_value(name, site_type, value);
    }

    /// Registers a custom interaction parameter.
    pub fn add_model_param(&mut self, parameter: super::model_params::Parameter) {
        self.model_params.add(parameter);
    }

    /// Registers a group and returns its index.
    ///
    /// # Arguments
    ///
    /// * `group` - The membership predicate.
    pub fn add_group(&mut self, group: Group) -> usize {
        let mut select = Select::new();
        for (index, particle) in self.particles.iter().enumerate() {
            if group.is_in_particle(particle) {
                select.add_particle(index, group.site_indices(particle));
            }
        }
        self.groups.push(group);
        self.group_selects.push(select);
        self.groups.len() - 1
    }

    /// Returns the number of groups (at least 1: the all group).
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns a group by index.
    pub fn group(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    /// Returns the cached member selection of a group.
    pub fn group_select(&self, index: usize) -> &Select {
        &self.group_selects[index]
    }

    /// Returns the live particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Returns a live particle by index.
    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    /// Returns the number of live particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Returns the number of live particles of one type.
    pub fn num_particles_of_type(&self, type_id: usize) -> usize {
        self.particles
            .iter()
            .filter(|p| p.type_id() == type_id)
            .count()
    }

    /// Returns the number of particles in a group.
    pub fn num_particles_in_group(&self, group_index: usize) -> usize {
        self.group_selects[group_index].num_particles()
    }

    /// Returns the total number of sites across all particles.
    pub fn num_sites(&self) -> usize {
        self.particles.iter().map(|p| p.num_sites()).sum()
    }

    /// Instantiates a particle from a type template and returns its index.
    ///
    /// The new particle appears at the template coordinates; insertion
    /// trials move it afterwards. All derived state (group selections,
    /// cell-list membership) is updated.
    ///
    /// # Arguments
    ///
    /// * `type_id` - The template to instantiate; must be registered.
    pub fn add_particle_of_type(&mut self, type_id: usize) -> usize {
        assert!(
            type_id < self.particle_types.len(),
            "unknown particle type: {}",
            type_id
        );
        let particle = self.particle_types[type_id].clone();
        self.particles.push(particle);
        let index = self.particles.len() - 1;
        for (g, group) in self.groups.iter().enumerate() {
            let particle = &self.particles[index];
            if group.is_in_particle(particle) {
                let sites = group.site_indices(particle);
                self.group_selects[g].add_particle(index, sites);
            }
        }
        self.track_new_particle_cells(index);
        index
    }

    /// Removes a live particle and returns it.
    ///
    /// Later particle indices shift down by one; all derived state is
    /// rebuilt accordingly.
    ///
    /// # Arguments
    ///
    /// * `index` - The particle to remove.
    pub fn remove_particle(&mut self, index: usize) -> Particle {
        let particle = self.particles.remove(index);
        debug!(index, "removed particle, rebuilding derived state");
        self.rebuild_group_selects();
        self.rebuild_cell_membership();
        particle
    }

    /// Captures the current positions and properties of a selection into its
    /// cache.
    ///
    /// # Arguments
    ///
    /// * `selection` - The selection whose cache is filled.
    pub fn load_selection(&self, selection: &mut SelectPosition) {
        selection.resize();
        for i in 0..selection.num_particles() {
            let p = selection.particle_index(i);
            let particle = &self.particles[p];
            selection.set_particle_position(i, particle.position().clone());
            let sites: Vec<usize> = selection.site_indices(i).to_vec();
            for (j, &s) in sites.iter().enumerate() {
                selection.set_site_position(i, j, particle.site(s).position().clone());
                selection.set_site_properties(i, j, particle.site(s).properties().clone());
            }
        }
    }

    /// Writes a selection's cached positions and properties back into the
    /// configuration.
    ///
    /// # Arguments
    ///
    /// * `selection` - The cached state to apply.
    /// * `wrap` - Whether to rewrap each touched particle afterwards.
    ///   Revert paths pass `false`: rewrap-on-revert would corrupt the undo.
    pub fn update_positions(&mut self, selection: &SelectPosition, wrap: bool) {
        for i in 0..selection.num_particles() {
            let p = selection.particle_index(i);
            {
                let particle = &mut self.particles[p];
                particle.set_position(selection.particle_position(i).clone());
                for (j, &s) in selection.site_indices(i).iter().enumerate() {
                    let site = particle.site_mut(s);
                    site.set_position(selection.site_position(i, j).clone());
                    *site.properties_mut() = selection.site_properties(i, j).clone();
                }
            }
            if wrap {
                self.wrap_particle(p);
            }
            self.position_tracker(p);
        }
    }

    /// Rigidly displaces the sites of a selection.
    ///
    /// The particle reference position moves with its sites; the particle is
    /// rewrapped only when every one of its sites is part of the selection.
    ///
    /// # Arguments
    ///
    /// * `selection` - Which particles and sites to displace.
    /// * `displacement` - The displacement vector.
    pub fn displace_selection(&mut self, selection: &Select, displacement: &Position) {
        for i in 0..selection.num_particles() {
            let p = selection.particle_index(i);
            let whole_particle;
            {
                let particle = &mut self.particles[p];
                whole_particle = selection.site_indices(i).len() == particle.num_sites();
                particle.displace_reference(displacement);
                for &s in selection.site_indices(i) {
                    particle.site_mut(s).displace(displacement);
                }
            }
            if whole_particle {
                self.wrap_particle(p);
            }
            self.position_tracker(p);
        }
    }

    /// Overwrites the position of one site and refreshes the derived state.
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle owning the site.
    /// * `site_index` - The local site index.
    /// * `position` - The new position.
    pub fn set_site_position(
        &mut self,
        particle_index: usize,
        site_index: usize,
        position: Position,
    ) {
        self.particles[particle_index]
            .site_mut(site_index)
            .set_position(position);
        self.position_tracker(particle_index);
    }

    /// Marks every site of a selection as physical or unphysical.
    ///
    /// # Arguments
    ///
    /// * `selection` - Which sites to mark.
    /// * `physical` - The new flag value.
    pub fn set_selection_physical(&mut self, selection: &Select, physical: bool) {
        for (p, s) in selection.site_pairs() {
            self.particles[p].site_mut(s).set_physical(physical);
        }
    }

    /// Changes the type of a live particle in place.
    ///
    /// Site types are overwritten with the target template's site types; the
    /// topology must match. Group selections are rebuilt since membership
    /// may change.
    ///
    /// # Arguments
    ///
    /// * `index` - The particle to morph.
    /// * `type_id` - The target particle type.
    pub fn morph_particle(&mut self, index: usize, type_id: usize) {
        assert!(
            type_id < self.particle_types.len(),
            "unknown particle type: {}",
            type_id
        );
        assert_eq!(
            self.particles[index].num_sites(),
            self.particle_types[type_id].num_sites(),
            "morph requires matching site counts"
        );
        let site_types: Vec<usize> = self.particle_types[type_id]
            .sites()
            .iter()
            .map(|s| s.type_id())
            .collect();
        let particle = &mut self.particles[index];
        particle.set_type_id(type_id);
        for (site, &t) in particle.sites_iter_mut().zip(site_types.iter()) {
            site.set_type_id(t);
        }
        self.rebuild_group_selects();
    }

    /// Builds a cell-list decomposition over the domain and registers every
    /// live site with it. Returns the cell-list index.
    ///
    /// # Arguments
    ///
    /// * `min_length` - The minimum bin side length; pass the maximum mixed
    ///   cutoff for short-ranged potentials.
    ///
    /// # Errors
    ///
    /// Propagates [`DomainError`] when the domain cannot host the list.
    pub fn init_cells(&mut self, min_length: f64) -> Result<usize, DomainError> {
        let list_index = self.domain.init_cells(min_length)?;
        for p in 0..self.particles.len() {
            let cells_and_sites: Vec<(usize, usize)> = {
                let particle = &self.particles[p];
                particle
                    .sites()
                    .iter()
                    .enumerate()
                    .map(|(s, site)| (s, self.domain.cell_id(list_index, site.position())))
                    .map(|(s, cell)| (cell, s))
                    .collect()
            };
            for (cell, s) in cells_and_sites {
                self.particles[p].site_mut(s).set_cell_id(list_index, cell);
                self.domain.cells_mut(list_index).add(p, s, cell);
            }
        }
        Ok(list_index)
    }

    /// Re-registers every live site with every active cell list.
    ///
    /// Used after bulk changes (particle removal) that shift particle
    /// indices.
    pub fn rebuild_cell_membership(&mut self) {
        for list_index in 0..self.domain.num_cell_lists() {
            self.domain.cells_mut(list_index).clear_members();
        }
        for p in 0..self.particles.len() {
            self.track_new_particle_cells(p);
        }
    }

    /// Recomputes every group's member selection from scratch.
    pub fn rebuild_group_selects(&mut self) {
        for (g, group) in self.groups.iter().enumerate() {
            let mut select = Select::new();
            for (index, particle) in self.particles.iter().enumerate() {
                if group.is_in_particle(particle) {
                    select.add_particle(index, group.site_indices(particle));
                }
            }
            self.group_selects[g] = select;
        }
    }

    /// Updates the cell-list membership of one particle after its positions
    /// changed.
    ///
    /// This is the transactional bookkeeping step that keeps the invariant
    /// "a site is in exactly one bin of each active list, consistent with
    /// its current position".
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle whose sites moved.
    pub fn position_tracker(&mut self, particle_index: usize) {
        let num_lists = self.domain.num_cell_lists();
        for list_index in 0..num_lists {
            let moves: Vec<(usize, Option<usize>, usize)> = {
                let particle = &self.particles[particle_index];
                particle
                    .sites()
                    .iter()
                    .enumerate()
                    .map(|(s, site)| {
                        let new_cell = self.domain.cell_id(list_index, site.position());
                        let old_cell = if site.has_cell_id(list_index) {
                            Some(site.cell_id(list_index))
                        } else {
                            None
                        };
                        (s, old_cell, new_cell)
                    })
                    .collect()
            };
            for (s, old_cell, new_cell) in moves {
                match old_cell {
                    Some(old) if old == new_cell => {}
                    Some(old) => {
                        self.domain
                            .cells_mut(list_index)
                            .update(particle_index, s, old, new_cell);
                        self.particles[particle_index]
                            .site_mut(s)
                            .set_cell_id(list_index, new_cell);
                    }
                    None => {
                        self.domain
                            .cells_mut(list_index)
                            .add(particle_index, s, new_cell);
                        self.particles[particle_index]
                            .site_mut(s)
                            .set_cell_id(list_index, new_cell);
                    }
                }
            }
        }
    }

    /// Rewraps a particle into the box, using its first site as reference.
    ///
    /// # Arguments
    ///
    /// * `index` - The particle to rewrap.
    pub fn wrap_particle(&mut self, index: usize) {
        let shift = {
            let particle = &self.particles[index];
            self.domain.shift(particle.site(0).position())
        };
        if shift.squared_norm() > 0.0 {
            self.particles[index].displace(&shift);
        }
    }

    /// Invokes a closure on every site of a group, in particle order.
    ///
    /// This is the one-body iteration surface consumed by external
    /// collaborators (trajectory writers) and by one-body potentials.
    ///
    /// # Arguments
    ///
    /// * `group_index` - Which group to walk.
    /// * `visitor` - Called with `(particle_index, site_index, site)`.
    pub fn for_each_site<F>(&self, group_index: usize, mut visitor: F)
    where
        F: FnMut(usize, usize, &Site),
    {
        let select = &self.group_selects[group_index];
        for i in 0..select.num_particles() {
            let p = select.particle_index(i);
            for &s in select.site_indices(i) {
                visitor(p, s, self.particles[p].site(s));
            }
        }
    }

    fn track_new_particle_cells(&mut self, index: usize) {
        self.particles[index]
            .sites_iter_mut()
            .for_each(Site::clear_cell_ids);
        self.position_tracker(index);
    }
}
