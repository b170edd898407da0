//! Metadata: on-study and on-trial key-value lists, additive/overwriting
//! by key (spec.md §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

/// One entry of an `UpdateMetadata` delta. `trial_id` distinguishes
/// on-study (`None`) from on-trial (`Some`) entries (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDelta {
    pub trial_id: Option<u32>,
    pub item: MetadataItem,
}

/// Metadata returned by the Policy alongside suggestions or early-stop
/// decisions (spec.md §4.2 step 5, §4.3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadataUpdate {
    pub on_study: Vec<MetadataItem>,
    pub on_trials: Vec<MetadataDelta>,
}
