//! # Engine Module
//!
//! This module implements the stateful simulation machinery: the `System`
//! energy facade over a configuration and its potentials, revertible
//! perturbation operators, the trial proposal pipeline with Rosenbluth
//! accounting, acceptance criteria, and the driver loop with its polled
//! steppers.
//!
//! ## Architecture
//!
//! - **System** ([`system`]) - A configuration plus full and reference potentials
//! - **Criteria** ([`criteria`]) - Acceptance policies and the running total energy
//! - **Perturbations** ([`perturb`]) - Atomic, revertible mutations with exact undo
//! - **Trials** ([`trial`]) - Staged proposals, energy differences, and dispatch
//! - **Driver** ([`monte_carlo`]) - The attempt loop, statistics, and stepper scheduling
//! - **Steppers** ([`steppers`]) - Polled analysis/modification callbacks
//! - **Checkpointing** ([`checkpoint`]) - Versioned serialization envelope
//!
//! Every trial attempt is strictly sequential: select, perturb, evaluate,
//! then accept or revert. Detailed balance depends on evaluating the energy
//! difference against a configuration that nothing else mutates
//! concurrently, so the engine is single-threaded by design; parallelism is
//! only offered across independent replicas.

pub mod checkpoint;
pub mod criteria;
pub mod error;
pub mod monte_carlo;
pub mod perturb;
pub mod steppers;
pub mod system;
pub mod trial;
pub mod tunable;

#[cfg(feature = "parallel")]
pub mod replicas;
