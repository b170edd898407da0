//! Policy client: thin adapter to the external suggestion/early-stop
//! service (spec.md §1, §2 component 3; "the Policy" is a black-box RPC
//! producing suggestions and stop decisions — only its request/response
//! contract is specified here).
//!
//! Grounded in the teacher's `integrations::policy_engine`
//! (`PolicyEnforcementPoint` trait, one `Default*` implementation) and in
//! `pythia.SuggestRequest`/`EarlyStopRequest`/`StudyDescriptor` from the
//! original source this spec was distilled from.

pub mod mock;

pub use mock::RandomPolicyClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ParameterDict, PolicyMetadataUpdate, StudySpec};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy RPC failed: {0}")]
    Rpc(String),
}

/// The study context the Policy needs to produce suggestions or stop
/// decisions (spec.md §4.2 step 5, §4.3): the study's spec plus the
/// highest trial id assigned so far.
#[derive(Debug, Clone)]
pub struct StudyDescriptor {
    pub study_spec: StudySpec,
    pub guid: String,
    pub max_trial_id: u32,
}

#[derive(Debug, Clone)]
pub struct SuggestRequest {
    pub study_descriptor: StudyDescriptor,
    pub count: u32,
}

/// One suggested parameter assignment.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub parameters: ParameterDict,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestDecision {
    pub suggestions: Vec<Suggestion>,
    pub metadata: PolicyMetadataUpdate,
}

#[derive(Debug, Clone)]
pub struct EarlyStopRequest {
    pub study_descriptor: StudyDescriptor,
    pub trial_ids: Vec<u32>,
}

/// One early-stopping decision. The Policy may return decisions for
/// trials beyond the one asked about (spec.md §4.3: batched policies).
#[derive(Debug, Clone)]
pub struct EarlyStopDecision {
    pub trial_id: u32,
    pub should_stop: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EarlyStopDecisions {
    pub decisions: Vec<EarlyStopDecision>,
    pub metadata: PolicyMetadataUpdate,
}

/// The Policy backend's contract. The orchestrator treats it as a slow,
/// possibly-failing external dependency (spec.md §2): any error here is
/// recorded into the caller's long-running operation rather than
/// propagated as an RPC fault (spec.md §7).
#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn suggest(&self, request: SuggestRequest) -> Result<SuggestDecision, PolicyError>;
    async fn early_stop(&self, request: EarlyStopRequest) -> Result<EarlyStopDecisions, PolicyError>;
}
