use crate::core::model::visit_cell::CellVisitError;
use crate::core::spatial::domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("beta (inverse temperature) must be set before use")]
    BetaNotInitialized,

    #[error("no chemical potential registered for particle type {particle_type}")]
    ChemicalPotentialMissing { particle_type: usize },

    #[error("domain error: {source}")]
    Domain {
        #[from]
        source: DomainError,
    },

    #[error("cell-list consistency check failed: {source}")]
    CellVisit {
        #[from]
        source: CellVisitError,
    },

    #[error("the {visitor} visitor supports two-body models only")]
    VisitorBodyCount { visitor: &'static str },

    #[error(
        "tracked energy diverged from recomputation: tracked {tracked}, \
         recomputed {recomputed}, tolerance {tolerance}"
    )]
    EnergyDivergence {
        tracked: f64,
        recomputed: f64,
        tolerance: f64,
    },

    #[error("wall-clock budget exceeded: {elapsed_secs:.1}s elapsed of {limit_secs:.1}s allowed")]
    WallClockExceeded { elapsed_secs: f64, limit_secs: f64 },

    #[error("checkpoint version mismatch: found {found}, expected {expected}")]
    CheckpointVersion { found: u32, expected: u32 },

    #[error("checkpoint serialization failed: {0}")]
    CheckpointSerialize(String),

    #[error("checkpoint deserialization failed: {0}")]
    CheckpointDeserialize(String),

    #[error("trial factory has no trials to dispatch")]
    NoTrials,

    #[error("internal logic error: {0}")]
    Internal(String),
}
