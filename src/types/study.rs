//! Study entity and its problem specification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optimization goal for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    Maximize,
    Minimize,
}

/// Specification of one metric the study optimizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric_id: String,
    pub goal: Goal,
}

/// Identifies the type of one search-space parameter. The parameter-space
/// configuration schema itself is out of scope (spec.md §1); this is the
/// minimal shape the experimenter transforms and the Policy contract need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    Double,
    Integer,
    Categorical,
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub min_value: f64,
    pub max_value: f64,
}

/// One parameter's configuration within a study's search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    pub param_type: ParameterType,
    pub bounds: Option<ParameterBounds>,
    pub feasible_values: Vec<f64>,
}

impl ParameterConfig {
    pub fn double(name: impl Into<String>, min_value: f64, max_value: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Double,
            bounds: Some(ParameterBounds { min_value, max_value }),
            feasible_values: Vec::new(),
        }
    }
}

/// Search space: flat list of parameter configs plus a conditionality flag.
/// Conditional search spaces are rejected by the experimenter transforms
/// (spec.md §4.5); this crate never constructs one, but the flag is kept so
/// the rejection path is exercised honestly rather than assumed away.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterConfig>,
    pub is_conditional: bool,
}

/// The problem an experimenter evaluates; also the shape the Policy's
/// `StudyDescriptor` wraps (spec.md §4.2 step 5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudySpec {
    pub search_space: SearchSpace,
    pub metrics: Vec<MetricSpec>,
    pub algorithm: String,
}

/// A Study: `(owner_id, study_id)` identified, `study_id` equal to the
/// client-provided `display_name` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub name: String,
    pub owner_id: String,
    pub study_id: String,
    pub display_name: String,
    pub study_spec: StudySpec,
    pub create_time: DateTime<Utc>,
    pub metadata: Vec<crate::types::MetadataItem>,
}
