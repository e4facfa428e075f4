use super::properties::Properties;
use crate::core::spatial::position::Position;
use serde::{Deserialize, Serialize};

/// An ordered index-set view into a configuration.
///
/// A selection names a subset of particles and, for each, a subset of its
/// sites. Selections are lightweight: they carry no ownership back to the
/// configuration, only indices, and are created fresh for each trial
/// attempt.
///
/// Invariants:
/// - Particle indices are strictly increasing (no duplicates).
/// - Each per-particle site list is sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Select {
    particle_indices: Vec<usize>,
    site_indices: Vec<Vec<usize>>,
}

impl Select {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a selection of one particle with the given sites.
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle to select.
    /// * `site_indices` - The local site indices; sorted internally.
    pub fn particle(particle_index: usize, mut site_indices: Vec<usize>) -> Self {
        site_indices.sort_unstable();
        site_indices.dedup();
        Self {
            particle_indices: vec![particle_index],
            site_indices: vec![site_indices],
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.particle_indices.clear();
        self.site_indices.clear();
    }

    /// Returns true when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.particle_indices.is_empty()
    }

    /// Returns the number of selected particles.
    pub fn num_particles(&self) -> usize {
        self.particle_indices.len()
    }

    /// Returns the total number of selected sites.
    pub fn num_sites(&self) -> usize {
        self.site_indices.iter().map(|s| s.len()).sum()
    }

    /// Returns the selected particle indices in increasing order.
    pub fn particle_indices(&self) -> &[usize] {
        &self.particle_indices
    }

    /// Returns the particle index of the i-th selected particle.
    pub fn particle_index(&self, i: usize) -> usize {
        self.particle_indices[i]
    }

    /// Returns the sorted site indices of the i-th selected particle.
    pub fn site_indices(&self, i: usize) -> &[usize] {
        &self.site_indices[i]
    }

    /// Returns the position of a particle in the selection, if present.
    pub fn find_particle(&self, particle_index: usize) -> Option<usize> {
        self.particle_indices
            .binary_search(&particle_index)
            .ok()
    }

    /// Returns true when the particle is part of the selection.
    pub fn contains_particle(&self, particle_index: usize) -> bool {
        self.find_particle(particle_index).is_some()
    }

    /// Returns true when a specific site is part of the selection.
    pub fn contains_site(&self, particle_index: usize, site_index: usize) -> bool {
        self.find_particle(particle_index)
            .map(|pos| self.site_indices[pos].binary_search(&site_index).is_ok())
            .unwrap_or(false)
    }

    /// Adds a particle with the given sites, merging if already present.
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle to add.
    /// * `site_indices` - The local site indices to include.
    pub fn add_particle(&mut self, particle_index: usize, site_indices: Vec<usize>) {
        for site in site_indices {
            self.add_site(particle_index, site);
        }
    }

    /// Adds one site of one particle, keeping the invariants.
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle owning the site.
    /// * `site_index` - The local site index.
    pub fn add_site(&mut self, particle_index: usize, site_index: usize) {
        match self.particle_indices.binary_search(&particle_index) {
            Ok(pos) => {
                let sites = &mut self.site_indices[pos];
                if let Err(insert_at) = sites.binary_search(&site_index) {
                    sites.insert(insert_at, site_index);
                }
            }
            Err(pos) => {
                self.particle_indices.insert(pos, particle_index);
                self.site_indices.insert(pos, vec![site_index]);
            }
        }
    }

    /// Removes one site of one particle; drops the particle when its site
    /// list empties. Absent entries are ignored.
    pub fn remove_site(&mut self, particle_index: usize, site_index: usize) {
        if let Ok(pos) = self.particle_indices.binary_search(&particle_index) {
            let sites = &mut self.site_indices[pos];
            if let Ok(site_pos) = sites.binary_search(&site_index) {
                sites.remove(site_pos);
            }
            if sites.is_empty() {
                self.particle_indices.remove(pos);
                self.site_indices.remove(pos);
            }
        }
    }

    /// Merges another selection into this one.
    pub fn union(&mut self, other: &Select) {
        for i in 0..other.num_particles() {
            for &site in other.site_indices(i) {
                self.add_site(other.particle_index(i), site);
            }
        }
    }

    /// Iterates over `(particle_index, site_index)` pairs.
    pub fn site_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.particle_indices
            .iter()
            .zip(self.site_indices.iter())
            .flat_map(|(&p, sites)| sites.iter().map(move |&s| (p, s)))
    }
}

/// A selection that also carries cached copies of the corresponding
/// positions and properties, captured at selection time.
///
/// The cached vectors are always kept the same shape as the index vectors
/// (resize-on-mutate), so a stale cache can never be loaded against the
/// wrong indices. Perturbations capture the pre-move state here and reload
/// it on revert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectPosition {
    select: Select,
    particle_positions: Vec<Position>,
    site_positions: Vec<Vec<Position>>,
    site_properties: Vec<Vec<Properties>>,
}

impl SelectPosition {
    /// Creates an empty selection with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a plain selection, sizing the cache to match.
    ///
    /// # Arguments
    ///
    /// * `select` - The index set to wrap.
    pub fn from_select(select: Select) -> Self {
        let mut sp = Self {
            select,
            ..Self::default()
        };
        sp.resize();
        sp
    }

    /// Returns the underlying index set.
    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Removes all entries and cached state.
    pub fn clear(&mut self) {
        self.select.clear();
        self.resize();
    }

    /// Returns true when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
    }

    /// Returns the number of selected particles.
    pub fn num_particles(&self) -> usize {
        self.select.num_particles()
    }

    /// Returns the total number of selected sites.
    pub fn num_sites(&self) -> usize {
        self.select.num_sites()
    }

    /// Returns the particle index of the i-th selected particle.
    pub fn particle_index(&self, i: usize) -> usize {
        self.select.particle_index(i)
    }

    /// Returns the sorted site indices of the i-th selected particle.
    pub fn site_indices(&self, i: usize) -> &[usize] {
        self.select.site_indices(i)
    }

    /// Replaces the index set with a single particle, resizing the cache.
    ///
    /// # Arguments
    ///
    /// * `particle_index` - The particle to select.
    /// * `site_indices` - The local site indices to include.
    pub fn set_particle(&mut self, particle_index: usize, site_indices: Vec<usize>) {
        self.select = Select::particle(particle_index, site_indices);
        self.resize();
    }

    /// Adds one site of one particle, resizing the cache.
    pub fn add_site(&mut self, particle_index: usize, site_index: usize) {
        self.select.add_site(particle_index, site_index);
        self.resize();
    }

    /// Returns the cached reference position of the i-th selected particle.
    pub fn particle_position(&self, i: usize) -> &Position {
        &self.particle_positions[i]
    }

    /// Returns the cached position of the j-th site of the i-th particle.
    pub fn site_position(&self, i: usize, j: usize) -> &Position {
        &self.site_positions[i][j]
    }

    /// Returns the cached properties of the j-th site of the i-th particle.
    pub fn site_properties(&self, i: usize, j: usize) -> &Properties {
        &self.site_properties[i][j]
    }

    /// Overwrites a cached site position.
    pub fn set_site_position(&mut self, i: usize, j: usize, position: Position) {
        self.site_positions[i][j] = position;
    }

    /// Overwrites a cached particle reference position.
    pub fn set_particle_position(&mut self, i: usize, position: Position) {
        self.particle_positions[i] = position;
    }

    /// Overwrites cached site properties.
    pub fn set_site_properties(&mut self, i: usize, j: usize, properties: Properties) {
        self.site_properties[i][j] = properties;
    }

    /// Grows or shrinks the cache to match the index vectors.
    ///
    /// New slots are filled with defaults; surviving entries are untouched.
    pub fn resize(&mut self) {
        let n = self.select.num_particles();
        self.particle_positions.resize(n, Position::default());
        self.site_positions.resize(n, Vec::new());
        self.site_properties.resize(n, Vec::new());
        for i in 0..n {
            let num_sites = self.select.site_indices(i).len();
            self.site_positions[i].resize(num_sites, Position::default());
            self.site_properties[i].resize(num_sites, Properties::default());
        }
    }
}
