//! Integration tests for the literal boundary scenarios of spec.md §8,
//! against `DefaultOrchestrator` wired to the in-memory datastore and a
//! deterministic scripted Policy client.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tuner_core::config::TunerConfig;
use tuner_core::datastore::memory::InMemoryDatastore;
use tuner_core::datastore::Datastore;
use tuner_core::orchestrator::{CompleteTrialRequest, CreateStudyRequest, DefaultOrchestrator, Orchestrator};
use tuner_core::policy::{
    EarlyStopDecision, EarlyStopDecisions, EarlyStopRequest, PolicyClient, PolicyError, SuggestDecision,
    SuggestRequest, Suggestion,
};
use tuner_core::types::{
    Goal, MetricSpec, OperationOutcome, ParameterConfig, ParameterDict, ParameterValue, SearchSpace, StudySpec,
    TrialState,
};
use std::sync::Arc;

/// A Policy double whose `suggest`/`early_stop` responses are scripted in
/// advance and consumed in call order; panics if a test drives more calls
/// than were scripted, which doubles as an assertion that no unexpected
/// Policy call happened (Scenario D).
struct ScriptedPolicyClient {
    suggest_responses: Mutex<Vec<Vec<f64>>>,
    early_stop_responses: Mutex<Vec<bool>>,
}

impl ScriptedPolicyClient {
    fn new(suggest_responses: Vec<Vec<f64>>, early_stop_responses: Vec<bool>) -> Self {
        Self {
            suggest_responses: Mutex::new(suggest_responses),
            early_stop_responses: Mutex::new(early_stop_responses),
        }
    }
}

#[async_trait]
impl PolicyClient for ScriptedPolicyClient {
    async fn suggest(&self, request: SuggestRequest) -> Result<SuggestDecision, PolicyError> {
        let mut responses = self.suggest_responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedPolicyClient.suggest called with no responses left to serve");
        }
        let values = responses.remove(0);
        let _ = request;
        let suggestions = values
            .into_iter()
            .map(|x| {
                let mut parameters = ParameterDict::new();
                parameters.insert("x".to_string(), ParameterValue::Double(x));
                Suggestion { parameters }
            })
            .collect();
        Ok(SuggestDecision {
            suggestions,
            metadata: Default::default(),
        })
    }

    async fn early_stop(&self, request: EarlyStopRequest) -> Result<EarlyStopDecisions, PolicyError> {
        let mut responses = self.early_stop_responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedPolicyClient.early_stop called with no responses left to serve");
        }
        let should_stop = responses.remove(0);
        let decisions = request
            .trial_ids
            .into_iter()
            .map(|trial_id| EarlyStopDecision { trial_id, should_stop })
            .collect();
        Ok(EarlyStopDecisions {
            decisions,
            metadata: Default::default(),
        })
    }
}

fn study_spec() -> StudySpec {
    StudySpec {
        search_space: SearchSpace {
            parameters: vec![ParameterConfig::double("x", 0.0, 1.0)],
            is_conditional: false,
        },
        metrics: vec![MetricSpec {
            metric_id: "m".into(),
            goal: Goal::Maximize,
        }],
        algorithm: "default".into(),
    }
}

async fn new_study(
    policy: Arc<ScriptedPolicyClient>,
    config: TunerConfig,
) -> (DefaultOrchestrator, tuner_core::types::Study) {
    let datastore: Arc<dyn Datastore> = Arc::new(InMemoryDatastore::new());
    let orchestrator = DefaultOrchestrator::new(datastore, policy, config);
    let study = orchestrator
        .create_study(
            "owners/acme",
            CreateStudyRequest {
                incoming_name: String::new(),
                display_name: "s1".into(),
                study_spec: study_spec(),
            },
        )
        .await
        .unwrap();
    (orchestrator, study)
}

fn response_trials(outcome: &Option<OperationOutcome>) -> &[tuner_core::types::Trial] {
    match outcome {
        Some(OperationOutcome::Response(response)) => &response.trials,
        other => panic!("expected a successful response, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_a_suggest_from_policy() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![vec![0.3, 0.7]], vec![]));
    let (orchestrator, study) = new_study(policy, TunerConfig::default()).await;

    let op = orchestrator.suggest_trials(&study.name, "c1", 2).await.unwrap();
    assert!(op.done);
    let trials = response_trials(&op.outcome);
    assert_eq!(trials.len(), 2);
    let ids: Vec<u32> = trials.iter().map(|t| t.trial_id).collect();
    assert_eq!(ids, vec![1, 2]);
    for trial in trials {
        assert_eq!(trial.state, TrialState::Active);
        assert_eq!(trial.client_id, "c1");
    }
}

#[tokio::test]
async fn scenario_b_idempotent_retry() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![vec![0.3, 0.7]], vec![]));
    let (orchestrator, study) = new_study(policy, TunerConfig::default()).await;

    let first = orchestrator.suggest_trials(&study.name, "c1", 2).await.unwrap();
    let second = orchestrator.suggest_trials(&study.name, "c1", 2).await.unwrap();

    assert_eq!(first.name, second.name);
    assert_eq!(response_trials(&first.outcome), response_trials(&second.outcome));
}

#[tokio::test]
async fn scenario_c_policy_overflow_persists_extras_as_requested() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![vec![0.1, 0.2, 0.3]], vec![]));
    let (orchestrator, study) = new_study(policy, TunerConfig::default()).await;

    let op = orchestrator.suggest_trials(&study.name, "c2", 1).await.unwrap();
    let trials = response_trials(&op.outcome);
    assert_eq!(trials.len(), 1);

    let all_trials = orchestrator.list_trials(&study.name).await.unwrap();
    assert_eq!(all_trials.len(), 3);
    let requested: Vec<_> = all_trials
        .iter()
        .filter(|t| t.state == TrialState::Requested)
        .collect();
    assert_eq!(requested.len(), 2);
    for trial in requested {
        assert!(trial.client_id.is_empty());
    }
    // Each overflow trial got its own distinct id: the §9-documented bug
    // of aliasing one trial object across every leftover suggestion does
    // not reproduce here.
    let mut ids: Vec<u32> = all_trials.iter().map(|t| t.trial_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn scenario_d_source_b_reuse_without_a_policy_call() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![vec![0.1, 0.2, 0.3]], vec![]));
    let (orchestrator, study) = new_study(policy, TunerConfig::default()).await;

    orchestrator.suggest_trials(&study.name, "c2", 1).await.unwrap();
    let requested_before: Vec<_> = orchestrator
        .list_trials(&study.name)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.state == TrialState::Requested)
        .map(|t| t.trial_id)
        .collect();

    // Only one scripted suggest() response was provided above; a second
    // call here would panic, proving source B served the whole request.
    let op = orchestrator.suggest_trials(&study.name, "c3", 2).await.unwrap();
    let trials = response_trials(&op.outcome);
    assert_eq!(trials.len(), 2);
    let mut ids: Vec<u32> = trials.iter().map(|t| t.trial_id).collect();
    ids.sort_unstable();
    let mut expected = requested_before;
    expected.sort_unstable();
    assert_eq!(ids, expected);
    for trial in trials {
        assert_eq!(trial.state, TrialState::Active);
        assert_eq!(trial.client_id, "c3");
    }
}

#[tokio::test]
async fn scenario_e_early_stop_caching_then_recycle() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![vec![0.5]], vec![true, false]));
    let config = TunerConfig {
        early_stop_recycle_period: Duration::from_millis(20),
        ..TunerConfig::default()
    };
    let (orchestrator, study) = new_study(policy, config).await;

    let op = orchestrator.suggest_trials(&study.name, "c1", 1).await.unwrap();
    let trial = &response_trials(&op.outcome)[0];

    let first = orchestrator
        .check_trial_early_stopping_state(&trial.name)
        .await
        .unwrap();
    assert!(first);

    // Immediate recall is served from cache; no second Policy call occurs
    // (the script only had one early_stop response).
    let cached = orchestrator
        .check_trial_early_stopping_state(&trial.name)
        .await
        .unwrap();
    assert!(cached);

    tokio::time::sleep(Duration::from_millis(25)).await;

    let after_recycle = orchestrator
        .check_trial_early_stopping_state(&trial.name)
        .await
        .unwrap();
    assert!(!after_recycle);
}

#[tokio::test]
async fn scenario_f_complete_without_measurement_is_invalid_argument() {
    let policy = Arc::new(ScriptedPolicyClient::new(vec![], vec![]));
    let (orchestrator, study) = new_study(policy, TunerConfig::default()).await;

    let trial = orchestrator
        .create_trial(
            &study.name,
            tuner_core::types::Trial::new_requested(
                study.owner_id.clone(),
                study.study_id.clone(),
                0,
                String::new(),
                ParameterDict::new(),
                chrono::Utc::now(),
            ),
        )
        .await
        .unwrap();

    let result = orchestrator
        .complete_trial(
            &trial.name,
            CompleteTrialRequest {
                final_measurement: None,
                trial_infeasible: false,
                infeasible_reason: String::new(),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(tuner_core::orchestrator::OrchestratorError::InvalidArgument(_))
    ));
}
