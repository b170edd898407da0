//! `SuggestTrials`: the three-source fill protocol of spec.md §4.2.
//!
//! Split out of `orchestrator::mod` the way the teacher splits
//! `scheduler::task_manager` out of `scheduler::mod` — one file per
//! non-trivial piece of orchestration logic, sharing the parent's fields.

use chrono::Utc;

use crate::datastore::DatastoreError;
use crate::naming::{self, StudyResource};
use crate::policy::{StudyDescriptor, SuggestRequest};
use crate::types::{SuggestTrialsResponse, SuggestionOperation, Trial, TrialState};

use super::{DefaultOrchestrator, OrchestratorError};

pub(super) async fn suggest_trials(
    orchestrator: &DefaultOrchestrator,
    parent: &str,
    client_id: &str,
    suggestion_count: u32,
) -> Result<SuggestionOperation, OrchestratorError> {
    if suggestion_count == 0 {
        return Err(OrchestratorError::InvalidArgument(
            "suggestion_count must be >= 1".into(),
        ));
    }
    let study_resource = StudyResource::from_name(parent)?;

    // Operation lock: SuggestTrials and CheckTrialEarlyStoppingState never
    // interleave for a fixed study (spec.md §4.1, §5). Held across the
    // Policy call below by design.
    let _op_guard = orchestrator.locks.lock_operation(parent).await;

    let study = orchestrator.datastore.load_study(parent).await?;

    // Step 1: idempotency check.
    let not_done = |op: &SuggestionOperation| !op.done;
    let active_ops = orchestrator
        .datastore
        .list_suggestion_operations(parent, client_id, &not_done)
        .await?;
    if let Some(existing) = active_ops.into_iter().next() {
        tracing::info!(%parent, %client_id, "suggest_trials idempotent retry, returning existing operation");
        return Ok(existing);
    }

    // Step 2: create a fresh operation.
    let op_number = orchestrator
        .datastore
        .max_suggestion_operation_number(parent, client_id)
        .await?
        + 1;
    let op_name =
        naming::suggestion_operation_name(&study_resource.owner_id, &study_resource.study_id, client_id, op_number);
    let start_time = Utc::now();
    let mut operation = SuggestionOperation::new_active(
        op_name,
        study_resource.owner_id.clone(),
        study_resource.study_id.clone(),
        client_id,
        op_number,
        start_time,
    );
    orchestrator.datastore.create_suggestion_operation(operation.clone()).await?;

    // Step 3: source A, active reassignment.
    let all_trials = orchestrator.datastore.list_trials(parent).await?;
    let mut output: Vec<Trial> = all_trials
        .iter()
        .filter(|t| t.state == TrialState::Active && t.client_id == client_id)
        .cloned()
        .collect();

    if output.len() as u32 >= suggestion_count {
        output.truncate(suggestion_count as usize);
        return finalize_success(orchestrator, operation, output, start_time).await;
    }

    // Step 4: source B, requested pool.
    let mut requested: Vec<Trial> = all_trials
        .into_iter()
        .filter(|t| t.state == TrialState::Requested)
        .collect();

    while let Some(mut trial) = requested.pop() {
        if output.len() as u32 >= suggestion_count {
            break;
        }
        trial.state = TrialState::Active;
        trial.client_id = client_id.to_string();
        trial.start_time = start_time;
        orchestrator.datastore.update_trial(trial.clone()).await?;
        output.push(trial);
    }

    if output.len() as u32 == suggestion_count {
        return finalize_success(orchestrator, operation, output, start_time).await;
    }

    // Step 5: source C, the Policy.
    let deficit = suggestion_count - output.len() as u32;
    let max_trial_id = orchestrator.datastore.max_trial_id(parent).await?;
    let study_descriptor = StudyDescriptor {
        study_spec: study.study_spec.clone(),
        guid: parent.to_string(),
        max_trial_id,
    };
    let decision = match orchestrator
        .policy
        .suggest(SuggestRequest {
            study_descriptor,
            count: deficit,
        })
        .await
    {
        Ok(decision) => decision,
        Err(e) => {
            operation.finish_with_error(e.to_string());
            orchestrator.datastore.update_suggestion_operation(operation.clone()).await?;
            tracing::error!(%parent, error = %e, "policy suggest() failed");
            return Ok(operation);
        }
    };

    let on_study = decision.metadata.on_study.clone();
    let on_trial = decision.metadata.on_trials.clone();
    if !on_study.is_empty() || !on_trial.is_empty() {
        if let Err(e) = orchestrator.datastore.update_metadata(parent, on_study, on_trial).await {
            if matches!(e, DatastoreError::MetadataTargetMissing(_)) {
                operation.finish_with_error(e.to_string());
                orchestrator.datastore.update_suggestion_operation(operation.clone()).await?;
                return Ok(operation);
            }
            return Err(e.into());
        }
    }

    if (decision.suggestions.len() as u32) < deficit {
        tracing::warn!(
            requested = deficit,
            produced = decision.suggestions.len(),
            "policy under-delivered suggestions"
        );
    }

    // Step 6: materialize Policy suggestions as trials, filling the deficit.
    let mut remaining = decision.suggestions.into_iter();
    while (output.len() as u32) < suggestion_count {
        let Some(suggestion) = remaining.next() else {
            break;
        };
        let trial_id = orchestrator.datastore.reserve_next_trial_id(parent).await?;
        let trial = Trial {
            name: study_resource.trial_resource(trial_id).name(),
            owner_id: study_resource.owner_id.clone(),
            study_id: study_resource.study_id.clone(),
            trial_id,
            state: TrialState::Active,
            client_id: client_id.to_string(),
            start_time,
            parameters: suggestion.parameters,
            measurements: Vec::new(),
            final_measurement: None,
            infeasible_reason: String::new(),
            metadata: Vec::new(),
        };
        orchestrator.datastore.create_trial(trial.clone()).await?;
        output.push(trial);
    }

    // Step 7: overflow policy. Each remaining suggestion is persisted as
    // its own distinct REQUESTED trial with a freshly allocated id (the
    // §9-documented source bug — reusing one trial object for every
    // leftover suggestion — is fixed here, not reproduced).
    for suggestion in remaining {
        let trial_id = orchestrator.datastore.reserve_next_trial_id(parent).await?;
        let overflow_trial = Trial::new_requested(
            study_resource.owner_id.clone(),
            study_resource.study_id.clone(),
            trial_id,
            study_resource.trial_resource(trial_id).name(),
            suggestion.parameters,
            start_time,
        );
        orchestrator.datastore.create_trial(overflow_trial).await?;
    }

    finalize_success(orchestrator, operation, output, start_time).await
}

async fn finalize_success(
    orchestrator: &DefaultOrchestrator,
    mut operation: SuggestionOperation,
    trials: Vec<Trial>,
    start_time: chrono::DateTime<Utc>,
) -> Result<SuggestionOperation, OrchestratorError> {
    operation.finish_with_response(SuggestTrialsResponse {
        trials,
        start_time: Some(start_time),
    });
    orchestrator.datastore.update_suggestion_operation(operation.clone()).await?;
    Ok(operation)
}
