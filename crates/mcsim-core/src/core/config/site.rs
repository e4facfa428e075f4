use super::properties::Properties;
use crate::core::spatial::position::Position;
use serde::{Deserialize, Serialize};

/// The atomic interaction-bearing sub-unit of a particle.
///
/// A site carries a type (shared interaction parameters for all sites of that
/// type), a mutable position, and an open-ended property bag for plugin
/// extensibility (per-site charge intermediates, orientation directors). Each
/// site is owned exclusively by its particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// The site type, indexing into the per-type parameter tables.
    type_id: usize,
    /// Whether the site currently participates in energy evaluation.
    ///
    /// Staged-growth trials mark not-yet-placed sites as unphysical so the
    /// visitors skip them.
    physical: bool,
    /// Current bin of this site in each active cell list, by list index.
    cell_ids: Vec<usize>,
    /// The current position of the site.
    position: Position,
    /// Named per-site numeric annotations.
    properties: Properties,
}

impl Site {
    /// Creates a physical site of the given type at a position.
    ///
    /// # Arguments
    ///
    /// * `type_id` - The site type.
    /// * `position` - The initial position.
    pub fn new(type_id: usize, position: Position) -> Self {
        Self {
            type_id,
            position,
            properties: Properties::new(),
            physical: true,
            cell_ids: Vec::new(),
        }
    }

    /// Returns the site type.
    pub fn type_id(&self) -> usize {
        self.type_id
    }

    /// Sets the site type.
    pub fn set_type_id(&mut self, type_id: usize) {
        self.type_id = type_id;
    }

    /// Returns the current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Replaces the current position.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Displaces the site by a vector.
    pub fn displace(&mut self, displacement: &Position) {
        self.position.add(displacement);
    }

    /// Returns the property bag.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the property bag mutably.
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Returns whether the site participates in energy evaluation.
    pub fn is_physical(&self) -> bool {
        self.physical
    }

    /// Sets whether the site participates in energy evaluation.
    pub fn set_physical(&mut self, physical: bool) {
        self.physical = physical;
    }

    /// Returns true when the site carries an orientation director.
    ///
    /// Orientation-dependent models treat sites with a `director` property as
    /// carrying an embedded axis.
    pub fn is_director(&self) -> bool {
        self.properties.has("director")
    }

    /// Returns the current cell bin for the given cell-list index.
    pub fn cell_id(&self, list_index: usize) -> usize {
        self.cell_ids[list_index]
    }

    /// Returns true when a cell bin has been recorded for the given list.
    pub fn has_cell_id(&self, list_index: usize) -> bool {
        list_index < self.cell_ids.len()
    }

    /// Records the current cell bin for the given cell-list index, growing
    /// the per-list table as needed.
    pub fn set_cell_id(&mut self, list_index: usize, cell: usize) {
        if self.cell_ids.len() <= list_index {
            self.cell_ids.resize(list_index + 1, 0);
        }
        self.cell_ids[list_index] = cell;
    }

    /// Drops all recorded cell bins (cell lists were rebuilt or removed).
    pub fn clear_cell_ids(&mut self) {
        self.cell_ids.clear();
    }
}
