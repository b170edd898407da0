//! `CheckTrialEarlyStoppingState`: the cached, recyclable early-stopping
//! protocol of spec.md §4.3.

use chrono::Utc;

use crate::naming::TrialResourceName;
use crate::policy::{EarlyStopRequest, StudyDescriptor};
use crate::types::EarlyStoppingOperation;

use super::{DefaultOrchestrator, OrchestratorError};

pub(super) async fn check_trial_early_stopping_state(
    orchestrator: &DefaultOrchestrator,
    trial_name: &str,
) -> Result<bool, OrchestratorError> {
    let trial_resource = TrialResourceName::from_name(trial_name)?;
    let study_name = trial_resource.study_resource().name();
    let outer_op_name = trial_resource.early_stopping_operation_resource().name();

    // Same operation lock as SuggestTrials: the two never interleave for a
    // fixed study (spec.md §4.1).
    let _op_guard = orchestrator.locks.lock_operation(&study_name).await;

    let existing = orchestrator.datastore.get_early_stopping_operation(&outer_op_name).await.ok();

    let needs_recompute = match &existing {
        None => true,
        Some(op) => op.is_recyclable(Utc::now(), orchestrator.config.early_stop_recycle_period),
    };

    if let Some(op) = &existing {
        if !needs_recompute {
            // ACTIVE (being computed elsewhere) or DONE and still fresh:
            // serve the cached decision.
            return Ok(op.should_stop);
        }
    }

    match existing {
        None => {
            let op = EarlyStoppingOperation::new_active(
                outer_op_name.clone(),
                trial_resource.owner_id.clone(),
                trial_resource.study_id.clone(),
                trial_resource.trial_id,
                Utc::now(),
            );
            orchestrator.datastore.create_early_stopping_operation(op).await?;
        }
        Some(mut op) => {
            op.status = crate::types::EarlyStoppingStatus::Active;
            op.should_stop = false;
            orchestrator.datastore.update_early_stopping_operation(op).await?;
        }
    }

    let study = orchestrator.datastore.load_study(&study_name).await?;
    let max_trial_id = orchestrator.datastore.max_trial_id(&study_name).await?;
    let study_descriptor = StudyDescriptor {
        study_spec: study.study_spec.clone(),
        guid: study_name.clone(),
        max_trial_id,
    };

    let decisions = orchestrator
        .policy
        .early_stop(EarlyStopRequest {
            study_descriptor,
            trial_ids: vec![trial_resource.trial_id],
        })
        .await
        .map_err(|e| OrchestratorError::PolicyFailure(e.to_string()))?;

    let on_study = decisions.metadata.on_study.clone();
    let on_trial = decisions.metadata.on_trials.clone();
    if !on_study.is_empty() || !on_trial.is_empty() {
        orchestrator.datastore.update_metadata(&study_name, on_study, on_trial).await?;
    }

    // The Policy does not guarantee the requested trial id appears in its
    // decision set (spec.md §4.3); each decision is applied independently.
    for decision in decisions.decisions {
        let inner_op_name = crate::naming::early_stopping_operation_name(
            &trial_resource.owner_id,
            &trial_resource.study_id,
            decision.trial_id,
        );
        let mut inner_op = match orchestrator.datastore.get_early_stopping_operation(&inner_op_name).await {
            Ok(op) => op,
            Err(_) => {
                let op = EarlyStoppingOperation::new_active(
                    inner_op_name.clone(),
                    trial_resource.owner_id.clone(),
                    trial_resource.study_id.clone(),
                    decision.trial_id,
                    Utc::now(),
                );
                orchestrator.datastore.create_early_stopping_operation(op.clone()).await?;
                op
            }
        };
        inner_op.should_stop = decision.should_stop;
        inner_op.status = crate::types::EarlyStoppingStatus::Done;
        inner_op.completion_time = Some(Utc::now());
        orchestrator.datastore.update_early_stopping_operation(inner_op).await?;
    }

    // The operation to return may have changed (if the Policy included it
    // in its decisions). If it did not, spec.md §9's adopted resolution
    // applies: leave it at should_stop=false, status=DONE rather than
    // stuck ACTIVE forever.
    let mut final_op = orchestrator.datastore.get_early_stopping_operation(&outer_op_name).await?;
    if final_op.status == crate::types::EarlyStoppingStatus::Active {
        final_op.should_stop = false;
        final_op.status = crate::types::EarlyStoppingStatus::Done;
        final_op.completion_time = Some(Utc::now());
        orchestrator.datastore.update_early_stopping_operation(final_op.clone()).await?;
    }
    Ok(final_op.should_stop)
}
