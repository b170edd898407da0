//! Core data types shared across the datastore, policy client, and
//! orchestrator. Every type here is a plain data holder: no locking, no
//! I/O, following the teacher's `types::*` convention of deriving
//! `Debug, Clone, Serialize, Deserialize` uniformly.

pub mod metadata;
pub mod operation;
pub mod study;
pub mod trial;

pub use metadata::*;
pub use operation::*;
pub use study::*;
pub use trial::*;

use serde::{Deserialize, Serialize};

/// A single parameter assignment. Values are kept loosely typed (the
/// parameter-space configuration schema itself is out of scope per
/// spec.md §1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    Double(f64),
    Int(i64),
    Categorical(String),
    Discrete(f64),
}

impl ParameterValue {
    /// The value's float image, used by the Discretizer transform to
    /// rewrite a discrete/categorical value back to its underlying double.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Double(v) => Some(*v),
            ParameterValue::Discrete(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Categorical(s) => s.parse::<f64>().ok(),
        }
    }
}

/// An assignment of parameter name to value, as carried by a Trial or a
/// Policy suggestion.
pub type ParameterDict = std::collections::BTreeMap<String, ParameterValue>;
