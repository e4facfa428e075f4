//! # Core Utilities Module
//!
//! Small numeric helpers shared across the library.
//!
//! - [`accumulator`] - Running statistics with block averaging

pub mod accumulator;
