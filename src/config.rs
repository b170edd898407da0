//! Orchestrator configuration.
//!
//! Mirrors the teacher's `SchedulerConfig`/`RuntimeConfig` shape: a plain
//! struct with a `Default` impl, plus a `from_env` constructor layered on
//! top for deployment overrides.

use std::time::Duration;

/// Per-owner study cap from spec.md §4.4 (2^31 - 1, max positive i32).
pub const MAX_STUDIES_PER_OWNER_DEFAULT: u64 = 2_147_483_647;

/// Configuration for the orchestrator and its datastore backend.
#[derive(Debug, Clone)]
pub struct TunerConfig {
    /// Chooses the datastore backend. `None` selects the in-memory store.
    /// A concrete relational backend is out of scope for this crate (see
    /// SPEC_FULL.md §6.3) but the field is retained so callers can fail
    /// fast on an unsupported URL rather than silently falling back.
    pub database_url: Option<String>,
    /// Minimum age a DONE early-stopping operation must reach before it is
    /// eligible for recomputation.
    pub early_stop_recycle_period: Duration,
    /// Per-owner study cap enforced by `CreateStudy`.
    pub max_studies_per_owner: u64,
    /// `tracing_subscriber::EnvFilter` directive used by binaries that
    /// initialize logging against this config.
    pub log_filter: String,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            early_stop_recycle_period: Duration::from_secs(60),
            max_studies_per_owner: MAX_STUDIES_PER_OWNER_DEFAULT,
            log_filter: "info".to_string(),
        }
    }
}

impl TunerConfig {
    /// Builds configuration from defaults overridden by environment
    /// variables (`TUNER_DATABASE_URL`, `TUNER_EARLY_STOP_RECYCLE_SECS`,
    /// `TUNER_MAX_STUDIES_PER_OWNER`, `TUNER_LOG_FILTER`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TUNER_DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = Some(url);
            }
        }
        if let Ok(secs) = std::env::var("TUNER_EARLY_STOP_RECYCLE_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.early_stop_recycle_period = Duration::from_secs(secs);
            }
        }
        if let Ok(cap) = std::env::var("TUNER_MAX_STUDIES_PER_OWNER") {
            if let Ok(cap) = cap.parse::<u64>() {
                config.max_studies_per_owner = cap;
            }
        }
        if let Ok(filter) = std::env::var("TUNER_LOG_FILTER") {
            if !filter.is_empty() {
                config.log_filter = filter;
            }
        }

        config
    }
}
