//! Experimenter transforms for benchmarking (spec.md §4.5): composable
//! wrappers over an inner `Experimenter`. A secondary concern relative to
//! the orchestration layer, included as specified.
//!
//! Grounded directly on `original_source/vizier/_src/benchmarks/
//! experimenters/{discretizing,shifting}_experimenter.py`.

pub mod discretizer;
pub mod shifter;

pub use discretizer::DiscretizingExperimenter;
pub use shifter::ShiftingExperimenter;

use thiserror::Error;

use crate::types::{StudySpec, Trial};

/// The problem statement an experimenter evaluates against. Reuses
/// `StudySpec` (search space + metrics + algorithm tag) since the two
/// shapes coincide for this crate's purposes.
pub type ProblemStatement = StudySpec;

/// Precondition/constraint violations from the transform wrappers
/// (spec.md §7: "precondition / constraint").
#[derive(Debug, Error, PartialEq)]
pub enum ExperimenterError {
    #[error("search space must not be conditional: {0}")]
    ConditionalSearchSpace(String),
    #[error("parameter {0} not found in search space")]
    UnknownParameter(String),
    #[error("parameter {0} is not a DOUBLE parameter")]
    NotDouble(String),
    #[error("parameter {0} is declared DOUBLE but carries no bounds")]
    MissingBounds(String),
    #[error("discretized value {value} for parameter {name} is out of bounds [{min}, {max}]")]
    ValueOutOfBounds {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{provided} shift value(s) not broadcastable to search-space dimension {dimension}")]
    NonBroadcastableShift { provided: usize, dimension: usize },
    #[error("shift {shift} is too large for bounds [{min}, {max}]")]
    ShiftTooLarge { shift: f64, min: f64, max: f64 },
    #[error("search space has invalid dimension: {0}")]
    InvalidDimension(usize),
    #[error("value {value} for parameter {name} is not one of the declared feasible values")]
    InfeasibleValue { name: String, value: f64 },
}

/// A benchmarking experimenter: describes its problem and can evaluate a
/// batch of suggested trials in place, writing measurements back onto
/// them.
pub trait Experimenter: Send + Sync {
    fn problem_statement(&self) -> ProblemStatement;
    fn evaluate(&self, suggestions: &mut [Trial]) -> Result<(), ExperimenterError>;
}
