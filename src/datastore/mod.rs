//! Datastore contract (spec.md §6.3): transactional CRUD over studies,
//! trials, suggestion operations, early-stopping operations, and metadata.
//!
//! Expressed as an `#[async_trait]` trait plus one `Default*`-style
//! implementation, mirroring the teacher's `ResourceManager`/
//! `CommunicationBus` shape (one trait, one concrete struct, swappable). A
//! concrete relational backend is structurally out of scope (spec.md §1)
//! but nothing here assumes in-memory storage.

pub mod memory;

pub use memory::InMemoryDatastore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{EarlyStoppingOperation, MetadataDelta, MetadataItem, Study, SuggestionOperation, Trial};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatastoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("metadata target missing: {0}")]
    MetadataTargetMissing(String),
    #[error("datastore internal error: {0}")]
    Internal(String),
}

/// A boxed predicate over suggestion operations, used by
/// `list_suggestion_operations` (spec.md §4.2 step 1's "non-done" filter).
pub type SuggestionOperationFilter<'a> = &'a (dyn Fn(&SuggestionOperation) -> bool + Send + Sync);

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn create_study(&self, study: Study) -> Result<(), DatastoreError>;
    async fn load_study(&self, name: &str) -> Result<Study, DatastoreError>;
    async fn list_studies(&self, owner_name: &str) -> Result<Vec<Study>, DatastoreError>;
    async fn delete_study(&self, name: &str) -> Result<(), DatastoreError>;

    async fn create_trial(&self, trial: Trial) -> Result<(), DatastoreError>;
    async fn get_trial(&self, name: &str) -> Result<Trial, DatastoreError>;
    async fn update_trial(&self, trial: Trial) -> Result<(), DatastoreError>;
    async fn list_trials(&self, study_name: &str) -> Result<Vec<Trial>, DatastoreError>;
    async fn delete_trial(&self, name: &str) -> Result<(), DatastoreError>;
    /// Current maximum assigned trial id for the study; 0 if none exist.
    async fn max_trial_id(&self, study_name: &str) -> Result<u32, DatastoreError>;
    /// Atomically reserves and returns `max_trial_id(study_name) + 1`,
    /// fencing allocation across the `CreateTrial` (study lock) and
    /// suggest-path (operation lock) callers per spec.md §5.
    async fn reserve_next_trial_id(&self, study_name: &str) -> Result<u32, DatastoreError>;

    async fn create_suggestion_operation(&self, op: SuggestionOperation) -> Result<(), DatastoreError>;
    async fn get_suggestion_operation(&self, name: &str) -> Result<SuggestionOperation, DatastoreError>;
    async fn update_suggestion_operation(&self, op: SuggestionOperation) -> Result<(), DatastoreError>;
    async fn list_suggestion_operations(
        &self,
        study_name: &str,
        client_id: &str,
        filter: SuggestionOperationFilter<'_>,
    ) -> Result<Vec<SuggestionOperation>, DatastoreError>;
    /// 0 if no operations exist yet for `(study, client)`.
    async fn max_suggestion_operation_number(
        &self,
        study_name: &str,
        client_id: &str,
    ) -> Result<u32, DatastoreError>;

    async fn create_early_stopping_operation(
        &self,
        op: EarlyStoppingOperation,
    ) -> Result<(), DatastoreError>;
    async fn get_early_stopping_operation(
        &self,
        name: &str,
    ) -> Result<EarlyStoppingOperation, DatastoreError>;
    async fn update_early_stopping_operation(
        &self,
        op: EarlyStoppingOperation,
    ) -> Result<(), DatastoreError>;

    /// Applies on-study and on-trial metadata deltas atomically. Returns
    /// `MetadataTargetMissing` if an on-trial entry names a trial that
    /// does not exist, without applying any part of the delta.
    async fn update_metadata(
        &self,
        study_name: &str,
        on_study: Vec<MetadataItem>,
        on_trial: Vec<MetadataDelta>,
    ) -> Result<(), DatastoreError>;
}
