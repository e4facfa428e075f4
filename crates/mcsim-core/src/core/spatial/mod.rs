//! # Spatial Primitives Module
//!
//! This module defines the geometric foundation of the simulation: value-type
//! positions, rigid rotations, periodic simulation domains, and the cell-list
//! decomposition used to accelerate short-ranged pairwise energy evaluation.
//!
//! ## Key Components
//!
//! - [`position`] - Dimension-generic coordinate vectors with value semantics
//! - [`rotation`] - Rigid rotations about a pivot, for 2-D and 3-D configurations
//! - [`domain`] - Periodic boxes (cuboid and triclinic) with minimum-image wrapping
//! - [`cells`] - Spatial binning with precomputed neighbor stencils

pub mod cells;
pub mod domain;
pub mod position;
pub mod rotation;
