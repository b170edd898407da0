//! Orchestrator: the core service implementing `CreateStudy`,
//! `SuggestTrials`, `CheckTrialEarlyStoppingState`, `CreateTrial`,
//! `AddTrialMeasurement`, `CompleteTrial`, `StopTrial`, `ListOptimalTrials`,
//! `UpdateMetadata`, plus trivial get/list/delete (spec.md §2 component 5,
//! §4.4).
//!
//! Structured the way the teacher structures its central coordinators
//! (`scheduler::DefaultAgentScheduler`): a public trait for the RPC
//! surface, one `Default*` struct holding `Arc`'d collaborators
//! (datastore, policy client, lock manager), async methods that acquire
//! locks in the fixed owner -> study -> operation order (spec.md §4.1,
//! §5).

mod early_stopping;
mod suggest;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::config::TunerConfig;
use crate::datastore::{Datastore, DatastoreError};
use crate::locks::LockManager;
use crate::naming::{self, StudyResource, TrialResourceName};
use crate::policy::PolicyClient;
use crate::types::{
    MetadataDelta, Measurement, Study, StudySpec, SuggestionOperation, Trial, TrialState,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// A Policy RPC failed outside a long-running operation that could
    /// otherwise carry the failure (spec.md §7: "external-failure"),
    /// e.g. `CheckTrialEarlyStoppingState`, which has no operation record
    /// of its own to park the error in.
    #[error("policy request failed: {0}")]
    PolicyFailure(String),
    #[error("datastore error: {0}")]
    Datastore(DatastoreError),
}

impl From<naming::NamingError> for OrchestratorError {
    fn from(err: naming::NamingError) -> Self {
        OrchestratorError::InvalidArgument(err.to_string())
    }
}

impl From<DatastoreError> for OrchestratorError {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::NotFound(target) => OrchestratorError::NotFound(target),
            other => OrchestratorError::Datastore(other),
        }
    }
}

/// Input to `CreateStudy`: the incoming name must be empty (the service
/// assigns it) and `display_name` must be non-empty (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct CreateStudyRequest {
    pub incoming_name: String,
    pub display_name: String,
    pub study_spec: StudySpec,
}

/// Input to `CompleteTrial` (spec.md §4.4, §6.1).
#[derive(Debug, Clone, Default)]
pub struct CompleteTrialRequest {
    pub final_measurement: Option<Measurement>,
    pub trial_infeasible: bool,
    pub infeasible_reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMetadataResponse {
    pub error_details: Option<String>,
}

/// The RPC surface (spec.md §6.1), one method per row of that table.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn create_study(&self, parent: &str, request: CreateStudyRequest) -> Result<Study, OrchestratorError>;
    async fn get_study(&self, name: &str) -> Result<Study, OrchestratorError>;
    async fn list_studies(&self, parent: &str) -> Result<Vec<Study>, OrchestratorError>;
    async fn delete_study(&self, name: &str) -> Result<(), OrchestratorError>;

    async fn suggest_trials(
        &self,
        parent: &str,
        client_id: &str,
        suggestion_count: u32,
    ) -> Result<SuggestionOperation, OrchestratorError>;
    async fn get_operation(&self, name: &str) -> Result<SuggestionOperation, OrchestratorError>;

    async fn create_trial(&self, parent: &str, trial: Trial) -> Result<Trial, OrchestratorError>;
    async fn get_trial(&self, name: &str) -> Result<Trial, OrchestratorError>;
    async fn list_trials(&self, parent: &str) -> Result<Vec<Trial>, OrchestratorError>;
    async fn delete_trial(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn add_trial_measurement(
        &self,
        trial_name: &str,
        measurement: Measurement,
    ) -> Result<Trial, OrchestratorError>;
    async fn complete_trial(
        &self,
        name: &str,
        request: CompleteTrialRequest,
    ) -> Result<Trial, OrchestratorError>;
    async fn stop_trial(&self, name: &str) -> Result<Trial, OrchestratorError>;

    async fn check_trial_early_stopping_state(&self, trial_name: &str) -> Result<bool, OrchestratorError>;

    async fn list_optimal_trials(&self, parent: &str) -> Result<Vec<Trial>, OrchestratorError>;

    async fn update_metadata(
        &self,
        name: &str,
        delta: Vec<MetadataDelta>,
    ) -> Result<UpdateMetadataResponse, OrchestratorError>;
}

/// Default implementation: in-process locking over a pluggable datastore
/// and Policy client.
pub struct DefaultOrchestrator {
    pub(crate) datastore: Arc<dyn Datastore>,
    pub(crate) policy: Arc<dyn PolicyClient>,
    pub(crate) locks: Arc<LockManager>,
    pub(crate) config: TunerConfig,
}

impl DefaultOrchestrator {
    pub fn new(datastore: Arc<dyn Datastore>, policy: Arc<dyn PolicyClient>, config: TunerConfig) -> Self {
        Self {
            datastore,
            policy,
            locks: Arc::new(LockManager::new()),
            config,
        }
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}

#[async_trait]
impl Orchestrator for DefaultOrchestrator {
    async fn create_study(&self, parent: &str, request: CreateStudyRequest) -> Result<Study, OrchestratorError> {
        let owner = naming::OwnerResource::from_name(parent)?;

        if !request.incoming_name.is_empty() {
            return Err(OrchestratorError::InvalidArgument(
                "study should not have a resource name; names are assigned by the service".into(),
            ));
        }
        if request.display_name.is_empty() {
            return Err(OrchestratorError::InvalidArgument(
                "display_name must be specified".into(),
            ));
        }

        let _guard = self.locks.lock_owner(parent).await;

        let existing = match self.datastore.list_studies(parent).await {
            Ok(studies) => studies,
            Err(DatastoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if existing.len() as u64 >= self.config.max_studies_per_owner {
            return Err(OrchestratorError::ResourceExhausted(format!(
                "maximum number of studies reached for owner {}",
                owner.owner_id
            )));
        }

        for candidate in &existing {
            if candidate.display_name == request.display_name {
                tracing::info!(owner = %owner.owner_id, display_name = %candidate.display_name, "found existing study");
                return Ok(candidate.clone());
            }
        }

        let study_id = request.display_name.clone();
        let study = Study {
            name: naming::study_name(&owner.owner_id, &study_id),
            owner_id: owner.owner_id,
            study_id,
            display_name: request.display_name,
            study_spec: request.study_spec,
            create_time: now(),
            metadata: Vec::new(),
        };
        self.datastore.create_study(study.clone()).await?;
        Ok(study)
    }

    async fn get_study(&self, name: &str) -> Result<Study, OrchestratorError> {
        Ok(self.datastore.load_study(name).await?)
    }

    async fn list_studies(&self, parent: &str) -> Result<Vec<Study>, OrchestratorError> {
        Ok(self.datastore.list_studies(parent).await?)
    }

    async fn delete_study(&self, name: &str) -> Result<(), OrchestratorError> {
        Ok(self.datastore.delete_study(name).await?)
    }

    async fn suggest_trials(
        &self,
        parent: &str,
        client_id: &str,
        suggestion_count: u32,
    ) -> Result<SuggestionOperation, OrchestratorError> {
        suggest::suggest_trials(self, parent, client_id, suggestion_count).await
    }

    async fn get_operation(&self, name: &str) -> Result<SuggestionOperation, OrchestratorError> {
        Ok(self.datastore.get_suggestion_operation(name).await?)
    }

    async fn create_trial(&self, parent: &str, mut trial: Trial) -> Result<Trial, OrchestratorError> {
        let study = StudyResource::from_name(parent)?;
        let _guard = self.locks.lock_study(parent).await;

        let trial_id = self.datastore.reserve_next_trial_id(parent).await?;
        trial.owner_id = study.owner_id.clone();
        trial.study_id = study.study_id.clone();
        trial.trial_id = trial_id;
        trial.name = study.trial_resource(trial_id).name();

        if trial.state != TrialState::Succeeded {
            trial.state = TrialState::Requested;
        }
        trial.client_id.clear();
        trial.start_time = now();

        self.datastore.create_trial(trial.clone()).await?;
        Ok(trial)
    }

    async fn get_trial(&self, name: &str) -> Result<Trial, OrchestratorError> {
        Ok(self.datastore.get_trial(name).await?)
    }

    async fn list_trials(&self, parent: &str) -> Result<Vec<Trial>, OrchestratorError> {
        Ok(self.datastore.list_trials(parent).await?)
    }

    async fn delete_trial(&self, name: &str) -> Result<(), OrchestratorError> {
        Ok(self.datastore.delete_trial(name).await?)
    }

    async fn add_trial_measurement(
        &self,
        trial_name: &str,
        measurement: Measurement,
    ) -> Result<Trial, OrchestratorError> {
        let study_name = TrialResourceName::from_name(trial_name)?.study_resource().name();
        let _guard = self.locks.lock_study(&study_name).await;

        let mut trial = self.datastore.get_trial(trial_name).await?;
        // Terminal states are permanent (spec.md §3, §9): the measurement
        // is still recorded, but it has no lifecycle effect.
        trial.measurements.push(measurement);
        self.datastore.update_trial(trial.clone()).await?;
        Ok(trial)
    }

    async fn complete_trial(
        &self,
        name: &str,
        request: CompleteTrialRequest,
    ) -> Result<Trial, OrchestratorError> {
        let study_name = TrialResourceName::from_name(name)?.study_resource().name();
        let _guard = self.locks.lock_study(&study_name).await;

        let mut trial = self.datastore.get_trial(name).await?;

        let has_explicit_measurement = request
            .final_measurement
            .as_ref()
            .is_some_and(|m| !m.metrics.is_empty());

        if has_explicit_measurement {
            trial.final_measurement = request.final_measurement.clone();
            trial.state = TrialState::Succeeded;
        } else if !request.trial_infeasible {
            trial.state = TrialState::Succeeded;
            trial.final_measurement = Some(trial.measurements.last().cloned().ok_or_else(|| {
                OrchestratorError::InvalidArgument(
                    "both the request and trial intermediate measurements are missing".into(),
                )
            })?);
        }

        if request.trial_infeasible {
            trial.state = TrialState::Infeasible;
            trial.infeasible_reason = request.infeasible_reason;
        }

        self.datastore.update_trial(trial.clone()).await?;
        Ok(trial)
    }

    async fn stop_trial(&self, name: &str) -> Result<Trial, OrchestratorError> {
        let study_name = TrialResourceName::from_name(name)?.study_resource().name();
        let _guard = self.locks.lock_study(&study_name).await;

        let mut trial = self.datastore.get_trial(name).await?;
        // Terminal states are permanent (spec.md §3, §9 adopted): stopping
        // a SUCCEEDED/INFEASIBLE trial is a no-op on its state.
        if !trial.state.is_terminal() {
            trial.state = TrialState::Stopping;
            self.datastore.update_trial(trial.clone()).await?;
        }
        Ok(trial)
    }

    async fn check_trial_early_stopping_state(&self, trial_name: &str) -> Result<bool, OrchestratorError> {
        early_stopping::check_trial_early_stopping_state(self, trial_name).await
    }

    async fn list_optimal_trials(&self, parent: &str) -> Result<Vec<Trial>, OrchestratorError> {
        let trials = self.datastore.list_trials(parent).await?;
        if trials.is_empty() {
            return Ok(Vec::new());
        }
        let study = self.datastore.load_study(parent).await?;
        let required_metrics: Vec<&str> = study
            .study_spec
            .metrics
            .iter()
            .map(|m| m.metric_id.as_str())
            .collect();

        let mut considered = Vec::new();
        let mut objective_vectors: Vec<Vec<f64>> = Vec::new();

        for trial in trials {
            let Some(final_measurement) = &trial.final_measurement else {
                continue;
            };
            if trial.state != TrialState::Succeeded {
                continue;
            }
            if !required_metrics
                .iter()
                .all(|id| final_measurement.metrics.contains_key(*id))
            {
                continue;
            }
            let vector: Vec<f64> = study
                .study_spec
                .metrics
                .iter()
                .map(|m| {
                    let value = final_measurement.metrics[&m.metric_id];
                    match m.goal {
                        crate::types::Goal::Minimize => -value,
                        crate::types::Goal::Maximize => value,
                    }
                })
                .collect();
            objective_vectors.push(vector);
            considered.push(trial);
        }

        if considered.is_empty() {
            return Ok(Vec::new());
        }

        let n = considered.len();
        let mut optimal = Vec::new();
        for i in 0..n {
            let dominated = (0..n).any(|j| {
                j != i
                    && dominates(&objective_vectors[j], &objective_vectors[i])
            });
            if !dominated {
                optimal.push(considered[i].clone());
            }
        }
        Ok(optimal)
    }

    async fn update_metadata(
        &self,
        name: &str,
        delta: Vec<MetadataDelta>,
    ) -> Result<UpdateMetadataResponse, OrchestratorError> {
        let (on_study, on_trial): (Vec<_>, Vec<_>) =
            delta.into_iter().partition(|d| d.trial_id.is_none());
        let on_study = on_study.into_iter().map(|d| d.item).collect();

        match self.datastore.update_metadata(name, on_study, on_trial).await {
            Ok(()) => Ok(UpdateMetadataResponse { error_details: None }),
            Err(DatastoreError::MetadataTargetMissing(target)) => Ok(UpdateMetadataResponse {
                error_details: Some(format!("metadata target missing: {target}")),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// `other` dominates `point` iff `other_k >= point_k` on every axis and
/// `other_k > point_k` on at least one (spec.md §4.4; axes already flipped
/// so "larger is better" on all of them).
fn dominates(other: &[f64], point: &[f64]) -> bool {
    other.iter().zip(point).all(|(o, p)| o >= p) && other.iter().zip(point).any(|(o, p)| o > p)
}
