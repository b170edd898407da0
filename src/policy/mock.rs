//! A simple randomized Policy, used by the CLI demo binary and as a
//! default for exercising the orchestrator without a real external
//! service. Grounded in the teacher's use of `rand` (`rand = "0.8"` in its
//! `Cargo.toml`) for the same "produce a plausible value" role its
//! resource/error-injection code uses it for.

use async_trait::async_trait;
use rand::Rng;

use crate::types::{ParameterType, ParameterValue};

use super::{
    EarlyStopDecision, EarlyStopDecisions, EarlyStopRequest, PolicyClient, PolicyError, SuggestDecision,
    SuggestRequest, Suggestion,
};

/// Samples each DOUBLE parameter uniformly within its bounds and never
/// recommends stopping. Deterministic seeding is left to the caller via
/// `with_rng` for reproducible tests.
pub struct RandomPolicyClient;

impl RandomPolicyClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomPolicyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyClient for RandomPolicyClient {
    async fn suggest(&self, request: SuggestRequest) -> Result<SuggestDecision, PolicyError> {
        let mut rng = rand::thread_rng();
        let mut suggestions = Vec::with_capacity(request.count as usize);
        for _ in 0..request.count {
            let mut parameters = crate::types::ParameterDict::new();
            for param in &request.study_descriptor.study_spec.search_space.parameters {
                let value = match param.param_type {
                    ParameterType::Double => {
                        let bounds = param.bounds.ok_or_else(|| {
                            PolicyError::Rpc(format!("parameter {} missing bounds", param.name))
                        })?;
                        ParameterValue::Double(rng.gen_range(bounds.min_value..=bounds.max_value))
                    }
                    _ => {
                        return Err(PolicyError::Rpc(format!(
                            "RandomPolicyClient only supports DOUBLE parameters, got {:?} for {}",
                            param.param_type, param.name
                        )))
                    }
                };
                parameters.insert(param.name.clone(), value);
            }
            suggestions.push(Suggestion { parameters });
        }
        Ok(SuggestDecision {
            suggestions,
            metadata: Default::default(),
        })
    }

    async fn early_stop(&self, request: EarlyStopRequest) -> Result<EarlyStopDecisions, PolicyError> {
        let decisions = request
            .trial_ids
            .into_iter()
            .map(|trial_id| EarlyStopDecision {
                trial_id,
                should_stop: false,
            })
            .collect();
        Ok(EarlyStopDecisions {
            decisions,
            metadata: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::StudyDescriptor;
    use crate::types::{ParameterConfig, SearchSpace, StudySpec};

    #[tokio::test]
    async fn suggests_within_bounds() {
        let client = RandomPolicyClient::new();
        let descriptor = StudyDescriptor {
            study_spec: StudySpec {
                search_space: SearchSpace {
                    parameters: vec![ParameterConfig::double("x", 0.0, 1.0)],
                    is_conditional: false,
                },
                metrics: Vec::new(),
                algorithm: "default".into(),
            },
            guid: "owners/a/studies/s1".into(),
            max_trial_id: 0,
        };
        let decision = client
            .suggest(SuggestRequest {
                study_descriptor: descriptor,
                count: 5,
            })
            .await
            .unwrap();
        assert_eq!(decision.suggestions.len(), 5);
        for s in &decision.suggestions {
            let ParameterValue::Double(v) = s.parameters["x"] else {
                panic!("expected double");
            };
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
