//! In-memory datastore backend, selected when `database_url` is absent
//! (spec.md §6.4). Grounded in the teacher's `resource::DefaultResourceManager`:
//! `DashMap`/`RwLock<HashMap<_, _>>` fields guarded independently, with a
//! small `parking_lot::Mutex` per counter where a read-then-write needs to
//! be atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{Datastore, DatastoreError, SuggestionOperationFilter};
use crate::types::{EarlyStoppingOperation, MetadataDelta, MetadataItem, Study, SuggestionOperation, Trial};

/// Counter for `(study, client)` suggestion-operation numbering.
type OpCounterKey = (String, String);

#[derive(Default)]
pub struct InMemoryDatastore {
    studies: DashMap<String, Study>,
    trials: DashMap<String, Trial>,
    trial_id_counters: DashMap<String, Arc<AtomicU32>>,
    suggestion_ops: DashMap<String, SuggestionOperation>,
    suggestion_op_counters: DashMap<OpCounterKey, Arc<AtomicU32>>,
    early_stopping_ops: DashMap<String, EarlyStoppingOperation>,
    metadata_mutex: Mutex<()>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn trial_counter(&self, study_name: &str) -> Arc<AtomicU32> {
        self.trial_id_counters
            .entry(study_name.to_string())
            .or_insert_with(|| Arc::new(AtomicU32::new(0)))
            .clone()
    }

    fn op_counter(&self, study_name: &str, client_id: &str) -> Arc<AtomicU32> {
        self.suggestion_op_counters
            .entry((study_name.to_string(), client_id.to_string()))
            .or_insert_with(|| Arc::new(AtomicU32::new(0)))
            .clone()
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn create_study(&self, study: Study) -> Result<(), DatastoreError> {
        self.studies.insert(study.name.clone(), study);
        Ok(())
    }

    async fn load_study(&self, name: &str) -> Result<Study, DatastoreError> {
        self.studies
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn list_studies(&self, owner_name: &str) -> Result<Vec<Study>, DatastoreError> {
        let owner_id = crate::naming::OwnerResource::from_name(owner_name)
            .map(|r| r.owner_id)
            .unwrap_or_else(|_| owner_name.to_string());
        Ok(self
            .studies
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_study(&self, name: &str) -> Result<(), DatastoreError> {
        self.studies
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn create_trial(&self, trial: Trial) -> Result<(), DatastoreError> {
        self.trials.insert(trial.name.clone(), trial);
        Ok(())
    }

    async fn get_trial(&self, name: &str) -> Result<Trial, DatastoreError> {
        self.trials
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn update_trial(&self, trial: Trial) -> Result<(), DatastoreError> {
        if !self.trials.contains_key(&trial.name) {
            return Err(DatastoreError::NotFound(trial.name));
        }
        self.trials.insert(trial.name.clone(), trial);
        Ok(())
    }

    async fn list_trials(&self, study_name: &str) -> Result<Vec<Trial>, DatastoreError> {
        let study = crate::naming::StudyResource::from_name(study_name)
            .map_err(|e| DatastoreError::Internal(e.to_string()))?;
        Ok(self
            .trials
            .iter()
            .filter(|entry| {
                entry.value().owner_id == study.owner_id && entry.value().study_id == study.study_id
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_trial(&self, name: &str) -> Result<(), DatastoreError> {
        self.trials
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn max_trial_id(&self, study_name: &str) -> Result<u32, DatastoreError> {
        Ok(self.trial_counter(study_name).load(Ordering::SeqCst))
    }

    async fn reserve_next_trial_id(&self, study_name: &str) -> Result<u32, DatastoreError> {
        let counter = self.trial_counter(study_name);
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn create_suggestion_operation(&self, op: SuggestionOperation) -> Result<(), DatastoreError> {
        self.suggestion_ops.insert(op.name.clone(), op);
        Ok(())
    }

    async fn get_suggestion_operation(&self, name: &str) -> Result<SuggestionOperation, DatastoreError> {
        self.suggestion_ops
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn update_suggestion_operation(&self, op: SuggestionOperation) -> Result<(), DatastoreError> {
        if !self.suggestion_ops.contains_key(&op.name) {
            return Err(DatastoreError::NotFound(op.name));
        }
        self.suggestion_ops.insert(op.name.clone(), op);
        Ok(())
    }

    async fn list_suggestion_operations(
        &self,
        study_name: &str,
        client_id: &str,
        filter: SuggestionOperationFilter<'_>,
    ) -> Result<Vec<SuggestionOperation>, DatastoreError> {
        let study = crate::naming::StudyResource::from_name(study_name)
            .map_err(|e| DatastoreError::Internal(e.to_string()))?;
        Ok(self
            .suggestion_ops
            .iter()
            .filter(|entry| {
                let op = entry.value();
                op.owner_id == study.owner_id && op.study_id == study.study_id && op.client_id == client_id
            })
            .map(|entry| entry.value().clone())
            .filter(|op| filter(op))
            .collect())
    }

    async fn max_suggestion_operation_number(
        &self,
        study_name: &str,
        client_id: &str,
    ) -> Result<u32, DatastoreError> {
        Ok(self.op_counter(study_name, client_id).load(Ordering::SeqCst))
    }

    async fn create_early_stopping_operation(
        &self,
        op: EarlyStoppingOperation,
    ) -> Result<(), DatastoreError> {
        self.early_stopping_ops.insert(op.name.clone(), op);
        Ok(())
    }

    async fn get_early_stopping_operation(
        &self,
        name: &str,
    ) -> Result<EarlyStoppingOperation, DatastoreError> {
        self.early_stopping_ops
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| DatastoreError::NotFound(name.to_string()))
    }

    async fn update_early_stopping_operation(
        &self,
        op: EarlyStoppingOperation,
    ) -> Result<(), DatastoreError> {
        self.early_stopping_ops.insert(op.name.clone(), op);
        Ok(())
    }

    async fn update_metadata(
        &self,
        study_name: &str,
        on_study: Vec<MetadataItem>,
        on_trial: Vec<MetadataDelta>,
    ) -> Result<(), DatastoreError> {
        let _guard = self.metadata_mutex.lock();

        // Validate every trial target exists before mutating anything, so
        // the update is all-or-nothing.
        let mut target_names = Vec::with_capacity(on_trial.len());
        for delta in &on_trial {
            let trial_id = delta
                .trial_id
                .ok_or_else(|| DatastoreError::Internal("on-trial delta missing trial_id".into()))?;
            let study = crate::naming::StudyResource::from_name(study_name)
                .map_err(|e| DatastoreError::Internal(e.to_string()))?;
            let trial_name = study.trial_resource(trial_id).name();
            if !self.trials.contains_key(&trial_name) {
                return Err(DatastoreError::MetadataTargetMissing(trial_name));
            }
            target_names.push(trial_name);
        }

        if !on_study.is_empty() {
            if let Some(mut study) = self.studies.get_mut(study_name) {
                apply_metadata(&mut study.metadata, on_study);
            } else {
                return Err(DatastoreError::MetadataTargetMissing(study_name.to_string()));
            }
        }

        for (trial_name, delta) in target_names.into_iter().zip(on_trial.into_iter()) {
            if let Some(mut trial) = self.trials.get_mut(&trial_name) {
                apply_metadata(&mut trial.metadata, vec![delta.item]);
            }
        }

        Ok(())
    }
}

fn apply_metadata(existing: &mut Vec<MetadataItem>, updates: Vec<MetadataItem>) {
    let mut by_key: HashMap<String, String> =
        existing.drain(..).map(|item| (item.key, item.value)).collect();
    for item in updates {
        by_key.insert(item.key, item.value);
    }
    *existing = by_key
        .into_iter()
        .map(|(key, value)| MetadataItem { key, value })
        .collect();
}
