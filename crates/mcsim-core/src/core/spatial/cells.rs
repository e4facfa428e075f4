use serde::{Deserialize, Serialize};
use tracing::debug;

/// A spatial hash of sites into fixed-size bins with precomputed neighbor
/// stencils, used to accelerate short-ranged pairwise energy evaluation.
///
/// Each spatial dimension is partitioned into `floor(side_length/min_length)`
/// bins. If the resulting grid is too coarse to give meaningful neighbor
/// lists (total bins at most `3^D`), the decomposition disables itself:
/// `num_total() == 0` is the no-op sentinel every consumer must check.
///
/// The full neighbor map (27-bin stencil in 3-D, 9-bin in 2-D, including the
/// bin itself) is built eagerly at creation and must be rebuilt whenever the
/// box size changes.
///
/// Membership invariant: a site is in exactly one bin of each active
/// decomposition at all times, consistent with its current wrapped position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cells {
    /// Number of bins along each dimension.
    num: Vec<usize>,
    /// For each bin, the indices of all stencil bins (including itself).
    neighbors: Vec<Vec<usize>>,
    /// For each bin, the `(particle_index, site_index)` pairs currently inside.
    members: Vec<Vec<(usize, usize)>>,
}

impl Cells {
    /// Builds a decomposition for a box with the given side lengths.
    ///
    /// Returns a disabled decomposition (`num_total() == 0`) when fewer than
    /// `3^D + 1` bins would result, since the stencil would then cover the
    /// entire box and the list could not prune any pairs.
    ///
    /// # Arguments
    ///
    /// * `min_length` - The minimum bin side length; typically the largest
    ///   mixed interaction cutoff. Must be positive.
    /// * `side_lengths` - The box side length per dimension (2-D or 3-D).
    pub fn create(min_length: f64, side_lengths: &[f64]) -> Self {
        assert!(min_length > 1e-15, "min_length too small: {}", min_length);
        let dimension = side_lengths.len();
        assert!(
            dimension == 2 || dimension == 3,
            "unrecognized dimension: {}",
            dimension
        );
        let num: Vec<usize> = side_lengths
            .iter()
            .map(|side| (side / min_length).floor() as usize)
            .collect();
        let total: usize = num.iter().product();
        if total <= 3usize.pow(dimension as u32) {
            debug!(
                min_length,
                total, "too few bins for a useful stencil, disabling cell list"
            );
            return Self::default();
        }
        let mut cells = Self {
            num,
            neighbors: Vec::new(),
            members: vec![Vec::new(); total],
        };
        cells.build_neighbors();
        cells
    }

    /// Returns the total number of bins, or zero when disabled.
    pub fn num_total(&self) -> usize {
        if self.num.is_empty() {
            0
        } else {
            self.num.iter().product()
        }
    }

    /// Returns true when this decomposition is the disabled sentinel.
    pub fn is_enabled(&self) -> bool {
        self.num_total() > 0
    }

    /// Returns the number of bins along one dimension.
    pub fn num_in_dimension(&self, dim: usize) -> usize {
        self.num[dim]
    }

    /// Returns the stencil bin indices of a bin, including itself.
    pub fn neighbors_of(&self, cell: usize) -> &[usize] {
        &self.neighbors[cell]
    }

    /// Returns the `(particle_index, site_index)` members of a bin.
    pub fn members_of(&self, cell: usize) -> &[(usize, usize)] {
        &self.members[cell]
    }

    /// Returns the total number of sites across all bins.
    pub fn num_sites(&self) -> usize {
        self.members.iter().map(|m| m.len()).sum()
    }

    /// Maps box-scaled coordinates in `[-0.5, 0.5]` to a bin index.
    ///
    /// # Arguments
    ///
    /// * `scaled_coord` - The wrapped position divided element-wise by the
    ///   box side lengths.
    pub fn id(&self, scaled_coord: &[f64]) -> usize {
        debug_assert_eq!(scaled_coord.len(), self.num.len());
        let mut cell = 0;
        let mut stride = 1;
        for (dim, &coord) in scaled_coord.iter().enumerate() {
            debug_assert!(
                coord.abs() <= 0.5 + 1e-8,
                "coordinate {} is not box-scaled",
                coord
            );
            let bins = self.num[dim];
            let along = (((coord + 0.5) * bins as f64) as usize).min(bins - 1);
            cell += along * stride;
            stride *= bins;
        }
        cell
    }

    /// Registers a site in a bin.
    ///
    /// Member lists stay sorted so that membership is canonical: reverted
    /// moves restore bit-identical state and serialization is deterministic.
    pub fn add(&mut self, particle: usize, site: usize, cell: usize) {
        let members = &mut self.members[cell];
        if let Err(insert_at) = members.binary_search(&(particle, site)) {
            members.insert(insert_at, (particle, site));
        }
    }

    /// Unregisters a site from a bin.
    ///
    /// The site must currently be a member of the bin.
    pub fn remove(&mut self, particle: usize, site: usize, cell: usize) {
        let members = &mut self.members[cell];
        let index = members.binary_search(&(particle, site)).unwrap_or_else(|_| {
            panic!(
                "site ({}, {}) is not a member of cell {}",
                particle, site, cell
            )
        });
        members.remove(index);
    }

    /// Moves a site between bins.
    pub fn update(&mut self, particle: usize, site: usize, old_cell: usize, new_cell: usize) {
        if old_cell != new_cell {
            self.remove(particle, site, old_cell);
            self.add(particle, site, new_cell);
        }
    }

    /// Clears all membership without touching the grid or stencils.
    pub fn clear_members(&mut self) {
        for members in self.members.iter_mut() {
            members.clear();
        }
    }

    fn build_neighbors(&mut self) {
        let total = self.num_total();
        self.neighbors = vec![Vec::new(); total];
        match self.num.len() {
            2 => self.build_neighbors_2d(),
            3 => self.build_neighbors_3d(),
            _ => unreachable!(),
        }
    }

    fn build_neighbors_2d(&mut self) {
        let (mx, my) = (self.num[0] as isize, self.num[1] as isize);
        for x in 0..mx {
            for y in 0..my {
                let cell = self.wrapped_id(&[x, y]);
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        let neighbor = self.wrapped_id(&[x + dx, y + dy]);
                        self.neighbors[cell].push(neighbor);
                    }
                }
            }
        }
    }

    fn build_neighbors_3d(&mut self) {
        let (mx, my, mz) = (
            self.num[0] as isize,
            self.num[1] as isize,
            self.num[2] as isize,
        );
        for x in 0..mx {
            for y in 0..my {
                for z in 0..mz {
                    let cell = self.wrapped_id(&[x, y, z]);
                    for dx in -1..=1 {
                        for dy in -1..=1 {
                            for dz in -1..=1 {
                                let neighbor = self.wrapped_id(&[x + dx, y + dy, z + dz]);
                                self.neighbors[cell].push(neighbor);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Bin index from possibly out-of-range per-dimension indices, wrapped
    /// periodically.
    fn wrapped_id(&self, indices: &[isize]) -> usize {
        let mut cell = 0;
        let mut stride = 1;
        for (dim, &index) in indices.iter().enumerate() {
            let bins = self.num[dim] as isize;
            let wrapped = ((index % bins) + bins) % bins;
            cell += (wrapped as usize) * stride;
            stride *= self.num[dim];
        }
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_partitions_each_dimension_by_floor() {
        let cells = Cells::create(2.0, &[12.0, 12.0, 12.0]);
        assert_eq!(cells.num_in_dimension(0), 6);
        assert_eq!(cells.num_total(), 216);
        assert!(cells.is_enabled());
    }

    #[test]
    fn create_disables_when_too_few_bins() {
        let cells = Cells::create(2.0, &[6.0, 6.0, 6.0]);
        assert_eq!(cells.num_total(), 0);
        assert!(!cells.is_enabled());
    }

    #[test]
    fn three_dimensional_stencil_has_27_bins_including_self() {
        let cells = Cells::create(1.0, &[8.0, 8.0, 8.0]);
        for cell in 0..cells.num_total() {
            let neighbors = cells.neighbors_of(cell);
            assert_eq!(neighbors.len(), 27);
            assert!(neighbors.contains(&cell));
        }
    }

    #[test]
    fn two_dimensional_stencil_has_9_bins_including_self() {
        let cells = Cells::create(1.0, &[8.0, 8.0]);
        for cell in 0..cells.num_total() {
            let neighbors = cells.neighbors_of(cell);
            assert_eq!(neighbors.len(), 9);
            assert!(neighbors.contains(&cell));
        }
    }

    #[test]
    fn stencils_are_symmetric() {
        let cells = Cells::create(1.0, &[6.0, 5.0, 4.0]);
        for cell in 0..cells.num_total() {
            for &neighbor in cells.neighbors_of(cell) {
                assert!(
                    cells.neighbors_of(neighbor).contains(&cell),
                    "stencil asymmetry between {} and {}",
                    cell,
                    neighbor
                );
            }
        }
    }

    #[test]
    fn id_maps_scaled_extremes_into_range() {
        let cells = Cells::create(1.0, &[8.0, 8.0, 8.0]);
        assert_eq!(cells.id(&[-0.5, -0.5, -0.5]), 0);
        let last = cells.id(&[0.5, 0.5, 0.5]);
        assert_eq!(last, cells.num_total() - 1);
    }

    #[test]
    fn membership_add_remove_update_round_trips() {
        let mut cells = Cells::create(1.0, &[8.0, 8.0, 8.0]);
        cells.add(3, 0, 10);
        assert_eq!(cells.members_of(10), &[(3, 0)]);
        assert_eq!(cells.num_sites(), 1);

        cells.update(3, 0, 10, 11);
        assert!(cells.members_of(10).is_empty());
        assert_eq!(cells.members_of(11), &[(3, 0)]);

        cells.remove(3, 0, 11);
        assert_eq!(cells.num_sites(), 0);
    }

    #[test]
    #[should_panic(expected = "not a member")]
    fn removing_an_absent_site_panics() {
        let mut cells = Cells::create(1.0, &[8.0, 8.0, 8.0]);
        cells.remove(0, 0, 0);
    }
}
