use super::cells::Cells;
use super::position::Position;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("cell lists are not supported for triclinic domains")]
    TriclinicCells,
    #[error(
        "requested cell list rejected: min_length {min_length} yields too few bins \
         for the minimum side length {min_side_length}"
    )]
    CellsRejected {
        min_length: f64,
        min_side_length: f64,
    },
    #[error("domain has no side lengths defined")]
    NoSideLengths,
}

/// A periodic simulation box.
///
/// The box is described by side lengths per dimension (cuboid), optionally
/// sheared by the lower-triangular tilt factors `xy`, `xz`, `yz` (triclinic),
/// plus a per-dimension periodicity flag. The domain owns zero or more
/// [`Cells`] decompositions, each built for a given minimum bin length.
///
/// Invariants:
/// - `wrap` always returns the minimum-image displacement consistent with the
///   box shape.
/// - Cell lists, once built, must be rebuilt whenever the box size changes.
/// - Triclinic boxes and cell lists are mutually exclusive (documented
///   limitation carried over from the reference behavior).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    xy: f64,
    xz: f64,
    yz: f64,
    is_tilted: bool,
    periodic: Vec<bool>,
    side_lengths: Position,
    cells: Vec<Cells>,
}

impl Domain {
    /// Creates a cubic, fully periodic box.
    ///
    /// # Arguments
    ///
    /// * `box_length` - The side length shared by all three dimensions.
    pub fn cubic(box_length: f64) -> Self {
        Self::cuboid(vec![box_length; 3])
    }

    /// Creates a cuboid, fully periodic box.
    ///
    /// # Arguments
    ///
    /// * `side_lengths` - One side length per dimension.
    pub fn cuboid(side_lengths: Vec<f64>) -> Self {
        let periodic = vec![true; side_lengths.len()];
        Self {
            side_lengths: Position::new(side_lengths),
            periodic,
            ..Self::default()
        }
    }

    /// Creates a triclinic, fully periodic box from side lengths and the
    /// lower-triangular tilt factors.
    pub fn triclinic(side_lengths: Vec<f64>, xy: f64, xz: f64, yz: f64) -> Self {
        let mut domain = Self::cuboid(side_lengths);
        domain.xy = xy;
        domain.xz = xz;
        domain.yz = yz;
        domain.is_tilted = xy.abs() > 1e-15 || xz.abs() > 1e-15 || yz.abs() > 1e-15;
        domain
    }

    /// Returns the number of spatial dimensions.
    pub fn dimension(&self) -> usize {
        self.side_lengths.dimension()
    }

    /// Returns the side lengths per dimension.
    pub fn side_lengths(&self) -> &Position {
        &self.side_lengths
    }

    /// Returns the side length along one dimension.
    pub fn side_length(&self, dim: usize) -> f64 {
        self.side_lengths.get(dim)
    }

    /// Updates the side lengths, invalidating every cell list.
    ///
    /// The caller is responsible for rebuilding cell lists afterwards; the
    /// stale decompositions are dropped here so that no consumer can iterate
    /// outdated membership.
    pub fn set_side_lengths(&mut self, side_lengths: Vec<f64>) {
        self.side_lengths = Position::new(side_lengths);
        self.periodic.resize(self.side_lengths.dimension(), true);
        if !self.cells.is_empty() {
            debug!("box size changed, dropping stale cell lists");
            self.cells.clear();
        }
    }

    /// Returns whether a dimension is periodic.
    pub fn periodic(&self, dim: usize) -> bool {
        self.periodic[dim]
    }

    /// Sets the periodicity flag of one dimension.
    pub fn set_periodic(&mut self, dim: usize, periodic: bool) {
        self.periodic[dim] = periodic;
    }

    /// Returns whether the box is triclinic.
    pub fn is_tilted(&self) -> bool {
        self.is_tilted
    }

    /// Returns the tilt factor of the xy plane.
    pub fn xy(&self) -> f64 {
        self.xy
    }

    /// Returns the tilt factor of the xz plane.
    pub fn xz(&self) -> f64 {
        self.xz
    }

    /// Returns the tilt factor of the yz plane.
    pub fn yz(&self) -> f64 {
        self.yz
    }

    /// Returns the box volume.
    ///
    /// Shear preserves volume, so the triclinic case reduces to the same
    /// product of side lengths as the cuboid case.
    pub fn volume(&self) -> f64 {
        self.side_lengths.coord().iter().product()
    }

    /// Returns the smallest side length.
    pub fn min_side_length(&self) -> f64 {
        self.side_lengths
            .coord()
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min)
    }

    /// Wraps a relative position in place to its minimum image.
    ///
    /// The cuboid case is closed-form per axis. The triclinic case wraps the
    /// highest dimension first and shifts the lower coordinates by the
    /// lower-triangular tilt coupling, only along axes that actually wrap.
    ///
    /// # Arguments
    ///
    /// * `relative` - A displacement between two points; wrapped in place.
    pub fn wrap(&self, relative: &mut Position) {
        if self.is_tilted {
            self.wrap_triclinic(relative);
        } else {
            for dim in 0..self.dimension() {
                if self.periodic[dim] {
                    let side = self.side_lengths.get(dim);
                    let value = relative.get(dim);
                    relative.set(dim, value - side * (value / side).round());
                }
            }
        }
    }

    /// Returns the additive shift that `wrap` would apply to `relative`.
    pub fn shift(&self, relative: &Position) -> Position {
        let mut wrapped = relative.clone();
        self.wrap(&mut wrapped);
        wrapped.subtract(relative);
        wrapped
    }

    fn wrap_triclinic(&self, relative: &mut Position) {
        debug_assert_eq!(self.dimension(), 3);
        if self.periodic[2] {
            let side = self.side_lengths.get(2);
            let num_wrap = (relative.get(2) / side).round();
            if num_wrap != 0.0 {
                relative.add_to(2, -num_wrap * side);
                relative.add_to(1, -num_wrap * self.yz);
                relative.add_to(0, -num_wrap * self.xz);
            }
        }
        if self.periodic[1] {
            let side = self.side_lengths.get(1);
            let num_wrap = (relative.get(1) / side).round();
            if num_wrap != 0.0 {
                relative.add_to(1, -num_wrap * side);
                relative.add_to(0, -num_wrap * self.xy);
            }
        }
        if self.periodic[0] {
            let side = self.side_lengths.get(0);
            let value = relative.get(0);
            relative.set(0, value - side * (value / side).round());
        }
    }

    /// Returns the minimum-image squared separation between two points.
    pub fn squared_separation(&self, pos1: &Position, pos2: &Position) -> f64 {
        let mut relative = pos1.clone();
        relative.subtract(pos2);
        self.wrap(&mut relative);
        relative.squared_norm()
    }

    /// Samples a uniformly random position inside the box, for insertions.
    ///
    /// # Arguments
    ///
    /// * `rng` - Random number source.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        assert!(!self.is_tilted, "random positions in triclinic boxes are not implemented");
        let coord = self
            .side_lengths
            .coord()
            .iter()
            .map(|&side| rng.gen_range(-0.5 * side..0.5 * side))
            .collect();
        Position::new(coord)
    }

    /// Builds a cell-list decomposition with the given minimum bin length and
    /// returns its index.
    ///
    /// # Errors
    ///
    /// - [`DomainError::TriclinicCells`] for tilted boxes (unsupported).
    /// - [`DomainError::CellsRejected`] when the box is too small for the
    ///   requested bin length to produce a useful grid.
    pub fn init_cells(&mut self, min_length: f64) -> Result<usize, DomainError> {
        if self.is_tilted {
            return Err(DomainError::TriclinicCells);
        }
        if self.dimension() == 0 {
            return Err(DomainError::NoSideLengths);
        }
        let cells = Cells::create(min_length, self.side_lengths.coord());
        if !cells.is_enabled() {
            return Err(DomainError::CellsRejected {
                min_length,
                min_side_length: self.min_side_length(),
            });
        }
        self.cells.push(cells);
        Ok(self.cells.len() - 1)
    }

    /// Returns the number of active cell lists.
    pub fn num_cell_lists(&self) -> usize {
        self.cells.len()
    }

    /// Returns a cell list by index.
    pub fn cells(&self, index: usize) -> &Cells {
        &self.cells[index]
    }

    /// Returns a mutable cell list by index.
    pub fn cells_mut(&mut self, index: usize) -> &mut Cells {
        &mut self.cells[index]
    }

    /// Maps an absolute position to its bin in the given cell list.
    ///
    /// # Arguments
    ///
    /// * `index` - The cell-list index.
    /// * `position` - An absolute position; wrapped and box-scaled internally.
    pub fn cell_id(&self, index: usize, position: &Position) -> usize {
        let mut scaled = position.clone();
        self.wrap(&mut scaled);
        scaled.divide(self.side_lengths.coord());
        self.cells[index].id(scaled.coord())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn wrap_returns_minimum_image_for_cuboid() {
        let domain = Domain::cubic(10.0);
        let mut relative = Position::new(vec![6.0, 0.0, 0.0]);
        domain.wrap(&mut relative);
        assert!(f64_approx_equal(relative.get(0), -4.0));
        assert!(f64_approx_equal(relative.get(1), 0.0));
        assert!(f64_approx_equal(relative.get(2), 0.0));
    }

    #[test]
    fn wrap_leaves_interior_displacements_untouched() {
        let domain = Domain::cubic(10.0);
        let mut relative = Position::new(vec![4.9, -4.9, 0.0]);
        domain.wrap(&mut relative);
        assert!(f64_approx_equal(relative.get(0), 4.9));
        assert!(f64_approx_equal(relative.get(1), -4.9));
    }

    #[test]
    fn wrap_respects_non_periodic_dimensions() {
        let mut domain = Domain::cubic(10.0);
        domain.set_periodic(0, false);
        let mut relative = Position::new(vec![6.0, 6.0, 0.0]);
        domain.wrap(&mut relative);
        assert!(f64_approx_equal(relative.get(0), 6.0));
        assert!(f64_approx_equal(relative.get(1), -4.0));
    }

    #[test]
    fn triclinic_wrap_applies_tilt_coupling_on_z_wrap() {
        let domain = Domain::triclinic(vec![10.0, 10.0, 10.0], 0.0, 1.0, 2.0);
        let mut relative = Position::new(vec![0.0, 0.0, 6.0]);
        domain.wrap(&mut relative);
        assert!(f64_approx_equal(relative.get(2), -4.0));
        assert!(f64_approx_equal(relative.get(1), -2.0));
        assert!(f64_approx_equal(relative.get(0), -1.0));
    }

    #[test]
    fn triclinic_wrap_is_identity_inside_the_box() {
        let domain = Domain::triclinic(vec![10.0, 10.0, 10.0], 1.0, 1.0, 1.0);
        let mut relative = Position::new(vec![1.0, -2.0, 3.0]);
        domain.wrap(&mut relative);
        assert!(f64_approx_equal(relative.get(0), 1.0));
        assert!(f64_approx_equal(relative.get(1), -2.0));
        assert!(f64_approx_equal(relative.get(2), 3.0));
    }

    #[test]
    fn volume_is_product_of_side_lengths() {
        let domain = Domain::cuboid(vec![2.0, 3.0, 4.0]);
        assert!(f64_approx_equal(domain.volume(), 24.0));
    }

    #[test]
    fn random_position_is_inside_the_box() {
        let domain = Domain::cuboid(vec![4.0, 6.0, 8.0]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let pos = domain.random_position(&mut rng);
            for dim in 0..3 {
                assert!(pos.get(dim).abs() <= 0.5 * domain.side_length(dim));
            }
        }
    }

    #[test]
    fn init_cells_rejects_triclinic_domains() {
        let mut domain = Domain::triclinic(vec![10.0, 10.0, 10.0], 1.0, 0.0, 0.0);
        assert!(matches!(
            domain.init_cells(1.0),
            Err(DomainError::TriclinicCells)
        ));
    }

    #[test]
    fn init_cells_rejects_boxes_too_small_for_the_grid() {
        let mut domain = Domain::cubic(6.0);
        assert!(matches!(
            domain.init_cells(2.0),
            Err(DomainError::CellsRejected { .. })
        ));
        assert_eq!(domain.num_cell_lists(), 0);
    }

    #[test]
    fn init_cells_builds_and_indexes_decompositions() {
        let mut domain = Domain::cubic(12.0);
        let index = domain.init_cells(2.0).unwrap();
        assert_eq!(index, 0);
        assert_eq!(domain.num_cell_lists(), 1);
        assert_eq!(domain.cells(0).num_total(), 216);
    }

    #[test]
    fn changing_box_size_drops_stale_cell_lists() {
        let mut domain = Domain::cubic(12.0);
        domain.init_cells(2.0).unwrap();
        domain.set_side_lengths(vec![14.0, 14.0, 14.0]);
        assert_eq!(domain.num_cell_lists(), 0);
    }

    #[test]
    fn cell_id_wraps_positions_before_binning() {
        let mut domain = Domain::cubic(12.0);
        domain.init_cells(2.0).unwrap();
        let inside = Position::new(vec![5.0, 5.0, 5.0]);
        let image = Position::new(vec![5.0 + 12.0, 5.0 - 12.0, 5.0]);
        assert_eq!(domain.cell_id(0, &inside), domain.cell_id(0, &image));
    }
}
