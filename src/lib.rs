//! tuner-core: coordination core for a black-box hyperparameter-optimization
//! service.
//!
//! Clients submit studies, repeatedly request trial suggestions, report
//! measurements, and request early-stopping decisions. This crate implements
//! the request orchestration layer: the `SuggestTrials` and
//! `CheckTrialEarlyStoppingState` protocols, their interaction with a
//! pluggable Policy backend, the owner/study/operation locking discipline,
//! the trial and operation state machines, and the datastore contract they
//! require.

pub mod config;
pub mod datastore;
pub mod experimenter;
pub mod locks;
pub mod naming;
pub mod orchestrator;
pub mod policy;
pub mod types;

pub use config::TunerConfig;
pub use orchestrator::{DefaultOrchestrator, Orchestrator, OrchestratorError};
pub use types::*;
