//! # Interaction Models Module
//!
//! This module defines the pluggable interaction potentials and the visitors
//! that iterate a configuration to accumulate their energy.
//!
//! Models are polymorphic over body count: one-body potentials see a single
//! site (external fields), two-body potentials see a squared separation and
//! a pair of site types, and three-body potentials additionally see an
//! angle. Every model exposes a `precompute` hook to cache type-dependent
//! derived constants from the parameter tables.
//!
//! Visitors decouple *how the configuration is iterated* from *what is
//! computed per interaction*:
//!
//! - [`visit::VisitModel`] - brute-force double loop, the O(N²) correctness baseline
//! - [`visit_cell::VisitModelCell`] - neighbor-stencil iteration over cell lists
//! - [`visit_intra::VisitModelIntra`] - same-particle non-bonded pairs with an exclusion window
//!
//! Energy accumulation is always a plain running sum in double precision;
//! visitors are stateless between calls.

pub mod one_body;
pub mod two_body;
pub mod visit;
pub mod visit_cell;
pub mod visit_intra;

use crate::core::config::model_params::ModelParams;
use crate::core::config::site::Site;

/// The large finite sentinel energy standing in for "infinitely
/// unfavorable".
///
/// Near-singular separations clamp to this value rather than overflowing to
/// infinity or NaN, which keeps the acceptance test well defined:
/// `exp(-beta * HUGE_ENERGY)` is exactly zero in double precision.
pub const HUGE_ENERGY: f64 = 1e10;

/// A potential acting on a single site, such as an external field.
pub trait ModelOneBody {
    /// Returns the energy of one site.
    ///
    /// # Arguments
    ///
    /// * `site` - The site under evaluation.
    /// * `params` - The per-type parameter tables.
    fn energy(&self, site: &Site, params: &ModelParams) -> f64;

    /// Caches type-dependent derived constants before a simulation.
    fn precompute(&mut self, _params: &ModelParams) {}
}

/// A pairwise potential between two sites.
pub trait ModelTwoBody {
    /// Returns the energy of one site pair.
    ///
    /// # Arguments
    ///
    /// * `squared_distance` - The minimum-image squared separation.
    /// * `type1` - The type of the first site.
    /// * `type2` - The type of the second site.
    /// * `params` - The per-type parameter tables.
    fn energy(&self, squared_distance: f64, type1: usize, type2: usize, params: &ModelParams)
    -> f64;

    /// Caches type-dependent derived constants before a simulation.
    fn precompute(&mut self, _params: &ModelParams) {}
}

/// An angular potential between three sites.
///
/// The engine ships the interface contract only; concrete angular models are
/// contributed by downstream potentials the same way two-body models are.
pub trait ModelThreeBody {
    /// Returns the energy of one site triplet.
    ///
    /// # Arguments
    ///
    /// * `squared_distance12` - Squared separation of sites 1 and 2.
    /// * `squared_distance13` - Squared separation of sites 1 and 3.
    /// * `cos_angle` - Cosine of the angle at site 1.
    /// * `types` - The site types of the triplet.
    /// * `params` - The per-type parameter tables.
    fn energy(
        &self,
        squared_distance12: f64,
        squared_distance13: f64,
        cos_angle: f64,
        types: [usize; 3],
        params: &ModelParams,
    ) -> f64;

    /// Caches type-dependent derived constants before a simulation.
    fn precompute(&mut self, _params: &ModelParams) {}
}
