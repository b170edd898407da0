//! Long-running operation records: SuggestionOperation and
//! EarlyStoppingOperation.
//!
//! Modeled, per spec.md §9, as a persisted record with a `done` flag and a
//! one-of `response | error`. The handler completes synchronously in this
//! design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Trial;

/// Carried inside a failed `SuggestionOperation` (spec.md §7:
/// external-failure is recorded here, never raised to the RPC caller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub code: OperationErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationErrorCode {
    Internal,
}

/// Successful `SuggestTrials` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestTrialsResponse {
    pub trials: Vec<Trial>,
    pub start_time: Option<DateTime<Utc>>,
}

/// One of `response | error`, matching the long-running-operation pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationOutcome {
    Response(SuggestTrialsResponse),
    Error(OperationStatus),
}

/// A `SuggestTrials` long-running operation, identified by
/// `(owner_id, study_id, client_id, op_number)` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionOperation {
    pub name: String,
    pub owner_id: String,
    pub study_id: String,
    pub client_id: String,
    pub op_number: u32,
    pub done: bool,
    pub outcome: Option<OperationOutcome>,
    pub create_time: DateTime<Utc>,
}

impl SuggestionOperation {
    pub fn new_active(
        name: String,
        owner_id: impl Into<String>,
        study_id: impl Into<String>,
        client_id: impl Into<String>,
        op_number: u32,
        create_time: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            owner_id: owner_id.into(),
            study_id: study_id.into(),
            client_id: client_id.into(),
            op_number,
            done: false,
            outcome: None,
            create_time,
        }
    }

    pub fn finish_with_response(&mut self, response: SuggestTrialsResponse) {
        self.outcome = Some(OperationOutcome::Response(response));
        self.done = true;
    }

    pub fn finish_with_error(&mut self, message: impl Into<String>) {
        self.outcome = Some(OperationOutcome::Error(OperationStatus {
            code: OperationErrorCode::Internal,
            message: message.into(),
        }));
        self.done = true;
    }
}

/// Status of a per-trial early-stopping operation (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarlyStoppingStatus {
    Active,
    Done,
}

/// An `EarlyStoppingOperation`: exactly one per trial once first requested
/// (spec.md §3), recyclable DONE -> ACTIVE -> DONE after the configured
/// recycle period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingOperation {
    pub name: String,
    pub owner_id: String,
    pub study_id: String,
    pub trial_id: u32,
    pub status: EarlyStoppingStatus,
    pub should_stop: bool,
    pub create_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
}

impl EarlyStoppingOperation {
    pub fn new_active(
        name: String,
        owner_id: impl Into<String>,
        study_id: impl Into<String>,
        trial_id: u32,
        create_time: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            owner_id: owner_id.into(),
            study_id: study_id.into(),
            trial_id,
            status: EarlyStoppingStatus::Active,
            should_stop: false,
            create_time,
            completion_time: None,
        }
    }

    /// True once `now` is at least `recycle_period` past this op's
    /// completion; a DONE op younger than that is still served from cache
    /// (spec.md §4.3 state table).
    pub fn is_recyclable(&self, now: DateTime<Utc>, recycle_period: std::time::Duration) -> bool {
        match (self.status, self.completion_time) {
            (EarlyStoppingStatus::Done, Some(completed)) => {
                let age = now.signed_duration_since(completed);
                age >= chrono::Duration::from_std(recycle_period).unwrap_or(chrono::Duration::zero())
            }
            (EarlyStoppingStatus::Done, None) => true,
            (EarlyStoppingStatus::Active, _) => false,
        }
    }
}
