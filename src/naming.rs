//! Resource naming: pure functions mapping `(owner, study, trial, client,
//! op_number)` tuples to and from hierarchical slash-delimited names.
//!
//! Shapes (spec.md §6.2), parsers accept only these exact forms:
//!   owners/{owner}
//!   owners/{owner}/studies/{study}
//!   owners/{owner}/studies/{study}/trials/{trial}
//!   owners/{owner}/studies/{study}/operations/{client}/{n}
//!   owners/{owner}/studies/{study}/trials/{trial}/operations/earlyStopping

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("malformed resource name: {0}")]
    Malformed(String),
}

pub fn owner_name(owner_id: &str) -> String {
    format!("owners/{owner_id}")
}

pub fn study_name(owner_id: &str, study_id: &str) -> String {
    format!("owners/{owner_id}/studies/{study_id}")
}

pub fn trial_name(owner_id: &str, study_id: &str, trial_id: u32) -> String {
    format!("owners/{owner_id}/studies/{study_id}/trials/{trial_id}")
}

pub fn suggestion_operation_name(
    owner_id: &str,
    study_id: &str,
    client_id: &str,
    op_number: u32,
) -> String {
    format!("owners/{owner_id}/studies/{study_id}/operations/{client_id}/{op_number}")
}

pub fn early_stopping_operation_name(owner_id: &str, study_id: &str, trial_id: u32) -> String {
    format!("owners/{owner_id}/studies/{study_id}/trials/{trial_id}/operations/earlyStopping")
}

/// Parsed `owners/{owner}` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerResource {
    pub owner_id: String,
}

impl OwnerResource {
    pub fn from_name(name: &str) -> Result<Self, NamingError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["owners", owner_id] if !owner_id.is_empty() => Ok(Self {
                owner_id: owner_id.to_string(),
            }),
            _ => Err(NamingError::Malformed(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        owner_name(&self.owner_id)
    }
}

/// Parsed `owners/{owner}/studies/{study}` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyResource {
    pub owner_id: String,
    pub study_id: String,
}

impl StudyResource {
    pub fn new(owner_id: impl Into<String>, study_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            study_id: study_id.into(),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, NamingError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["owners", owner_id, "studies", study_id]
                if !owner_id.is_empty() && !study_id.is_empty() =>
            {
                Ok(Self {
                    owner_id: owner_id.to_string(),
                    study_id: study_id.to_string(),
                })
            }
            _ => Err(NamingError::Malformed(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        study_name(&self.owner_id, &self.study_id)
    }

    pub fn trial_resource(&self, trial_id: u32) -> TrialResourceName {
        TrialResourceName {
            owner_id: self.owner_id.clone(),
            study_id: self.study_id.clone(),
            trial_id,
        }
    }
}

/// Parsed `owners/{owner}/studies/{study}/trials/{trial}` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialResourceName {
    pub owner_id: String,
    pub study_id: String,
    pub trial_id: u32,
}

impl TrialResourceName {
    pub fn from_name(name: &str) -> Result<Self, NamingError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["owners", owner_id, "studies", study_id, "trials", trial_id]
                if !owner_id.is_empty() && !study_id.is_empty() =>
            {
                let trial_id = trial_id
                    .parse::<u32>()
                    .map_err(|_| NamingError::Malformed(name.to_string()))?;
                Ok(Self {
                    owner_id: owner_id.to_string(),
                    study_id: study_id.to_string(),
                    trial_id,
                })
            }
            _ => Err(NamingError::Malformed(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        trial_name(&self.owner_id, &self.study_id, self.trial_id)
    }

    pub fn study_resource(&self) -> StudyResource {
        StudyResource::new(self.owner_id.clone(), self.study_id.clone())
    }

    pub fn early_stopping_operation_resource(&self) -> EarlyStoppingOperationResourceName {
        EarlyStoppingOperationResourceName {
            owner_id: self.owner_id.clone(),
            study_id: self.study_id.clone(),
            trial_id: self.trial_id,
        }
    }
}

/// Parsed `owners/{owner}/studies/{study}/operations/{client}/{n}` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionOperationResourceName {
    pub owner_id: String,
    pub study_id: String,
    pub client_id: String,
    pub op_number: u32,
}

impl SuggestionOperationResourceName {
    pub fn from_name(name: &str) -> Result<Self, NamingError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["owners", owner_id, "studies", study_id, "operations", client_id, op_number]
                if !owner_id.is_empty() && !study_id.is_empty() && !client_id.is_empty() =>
            {
                let op_number = op_number
                    .parse::<u32>()
                    .map_err(|_| NamingError::Malformed(name.to_string()))?;
                Ok(Self {
                    owner_id: owner_id.to_string(),
                    study_id: study_id.to_string(),
                    client_id: client_id.to_string(),
                    op_number,
                })
            }
            _ => Err(NamingError::Malformed(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        suggestion_operation_name(&self.owner_id, &self.study_id, &self.client_id, self.op_number)
    }
}

/// Parsed `owners/{owner}/studies/{study}/trials/{trial}/operations/earlyStopping` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyStoppingOperationResourceName {
    pub owner_id: String,
    pub study_id: String,
    pub trial_id: u32,
}

impl EarlyStoppingOperationResourceName {
    pub fn from_name(name: &str) -> Result<Self, NamingError> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["owners", owner_id, "studies", study_id, "trials", trial_id, "operations", "earlyStopping"]
                if !owner_id.is_empty() && !study_id.is_empty() =>
            {
                let trial_id = trial_id
                    .parse::<u32>()
                    .map_err(|_| NamingError::Malformed(name.to_string()))?;
                Ok(Self {
                    owner_id: owner_id.to_string(),
                    study_id: study_id.to_string(),
                    trial_id,
                })
            }
            _ => Err(NamingError::Malformed(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        early_stopping_operation_name(&self.owner_id, &self.study_id, self.trial_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_study_name() {
        let resource = StudyResource::new("acme", "s1");
        assert_eq!(resource.name(), "owners/acme/studies/s1");
        assert_eq!(StudyResource::from_name(&resource.name()).unwrap(), resource);
    }

    #[test]
    fn round_trips_trial_name() {
        let name = trial_name("acme", "s1", 7);
        let parsed = TrialResourceName::from_name(&name).unwrap();
        assert_eq!(parsed.owner_id, "acme");
        assert_eq!(parsed.study_id, "s1");
        assert_eq!(parsed.trial_id, 7);
        assert_eq!(parsed.name(), name);
    }

    #[test]
    fn round_trips_suggestion_operation_name() {
        let name = suggestion_operation_name("acme", "s1", "client-a", 3);
        let parsed = SuggestionOperationResourceName::from_name(&name).unwrap();
        assert_eq!(parsed.client_id, "client-a");
        assert_eq!(parsed.op_number, 3);
        assert_eq!(parsed.name(), name);
    }

    #[test]
    fn round_trips_early_stopping_operation_name() {
        let name = early_stopping_operation_name("acme", "s1", 9);
        let parsed = EarlyStoppingOperationResourceName::from_name(&name).unwrap();
        assert_eq!(parsed.trial_id, 9);
        assert_eq!(parsed.name(), name);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(StudyResource::from_name("owners/acme").is_err());
        assert!(StudyResource::from_name("owners/acme/studies/").is_err());
        assert!(TrialResourceName::from_name("owners/acme/studies/s1/trials/not-a-number").is_err());
        assert!(EarlyStoppingOperationResourceName::from_name(
            "owners/acme/studies/s1/trials/1/operations/somethingElse"
        )
        .is_err());
    }

    #[test]
    fn trial_resource_derives_study_and_early_stop_names() {
        let trial = TrialResourceName::from_name("owners/acme/studies/s1/trials/4").unwrap();
        assert_eq!(trial.study_resource().name(), "owners/acme/studies/s1");
        assert_eq!(
            trial.early_stopping_operation_resource().name(),
            "owners/acme/studies/s1/trials/4/operations/earlyStopping"
        );
    }
}
