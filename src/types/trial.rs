//! Trial entity and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MetadataItem, ParameterDict};

/// Trial lifecycle state (spec.md §3). There is no DELETED state; deletion
/// removes the row instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    Requested,
    Active,
    Succeeded,
    Infeasible,
    Stopping,
}

impl TrialState {
    /// SUCCEEDED and INFEASIBLE are terminal and permanent (spec.md §3,
    /// §9 adopted recommendation): `AddTrialMeasurement`/`StopTrial` must
    /// not move a trial out of these states.
    pub fn is_terminal(self) -> bool {
        matches!(self, TrialState::Succeeded | TrialState::Infeasible)
    }
}

/// A single reported measurement of the study's metrics at some point
/// during a trial's execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub step: u64,
    pub elapsed: std::time::Duration,
    pub metrics: std::collections::BTreeMap<String, f64>,
}

/// A Trial: `(owner_id, study_id, trial_id)` identified, `trial_id`
/// monotonically increasing per study starting at 1 (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub name: String,
    pub owner_id: String,
    pub study_id: String,
    pub trial_id: u32,
    pub state: TrialState,
    /// Empty when REQUESTED; non-empty when ACTIVE (invariant 3, spec.md §8).
    pub client_id: String,
    pub start_time: DateTime<Utc>,
    pub parameters: ParameterDict,
    pub measurements: Vec<Measurement>,
    pub final_measurement: Option<Measurement>,
    pub infeasible_reason: String,
    pub metadata: Vec<MetadataItem>,
}

impl Trial {
    /// Constructs a freshly REQUESTED trial with no client assigned, as
    /// produced by `CreateTrial` before the caller's overrides are applied.
    pub fn new_requested(
        owner_id: impl Into<String>,
        study_id: impl Into<String>,
        trial_id: u32,
        name: String,
        parameters: ParameterDict,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            owner_id: owner_id.into(),
            study_id: study_id.into(),
            trial_id,
            state: TrialState::Requested,
            client_id: String::new(),
            start_time,
            parameters,
            measurements: Vec::new(),
            final_measurement: None,
            infeasible_reason: String::new(),
            metadata: Vec::new(),
        }
    }
}
