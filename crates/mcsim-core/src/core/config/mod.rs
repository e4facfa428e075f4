//! # Configuration Model Module
//!
//! This module contains the data structures that represent the live state of
//! a particle simulation: typed sites and particles with bonded topology,
//! named groups, per-type interaction parameters with mixing rules, and the
//! index-based selections used to stage proposed changes before committing
//! them.
//!
//! ## Key Components
//!
//! - [`properties`] - Small ordered name/value maps for plugin extensibility
//! - [`site`] - The atomic interaction-bearing sub-unit of a particle
//! - [`particle`] - Ordered sites plus bonded topology (bonds, angles, dihedrals, impropers)
//! - [`group`] - Predicates over particle and site types
//! - [`model_params`] - Per-type parameter tables with pairwise mixing
//! - [`select`] - Index-set views with optional cached positions and properties
//! - [`configuration`] - The single source of truth tying everything together
//!
//! ## Usage
//!
//! Most simulations start by registering particle types and instantiating
//! particles from them:
//!
//! ```ignore
//! use mcsim::core::config::configuration::Configuration;
//! use mcsim::core::config::particle::Particle;
//! use mcsim::core::spatial::domain::Domain;
//!
//! let mut config = Configuration::new(Domain::cubic(8.0));
//! let type_id = config.add_particle_type(Particle::single_site(0, 3));
//! config.add_particle_of_type(type_id);
//! ```

pub mod configuration;
pub mod group;
pub mod model_params;
pub mod particle;
pub mod properties;
pub mod select;
pub mod site;
