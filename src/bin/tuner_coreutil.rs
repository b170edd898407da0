//! tuner-coreutil: a CLI that drives `DefaultOrchestrator` end to end
//! against the in-memory datastore and a random Policy client, for manual
//! exploration and smoke-testing.
//!
//! Grounded in the teacher's `symbiont-mcp` CLI
//! (`runtime/src/bin/symbiont_mcp.rs`): `clap::Parser` + `Subcommand`,
//! `tracing_subscriber::fmt` initialized from a verbosity flag, `anyhow`
//! reserved for this binary boundary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tuner_core::config::TunerConfig;
use tuner_core::datastore::memory::InMemoryDatastore;
use tuner_core::datastore::Datastore;
use tuner_core::orchestrator::{CreateStudyRequest, DefaultOrchestrator, Orchestrator};
use tuner_core::policy::mock::RandomPolicyClient;
use tuner_core::types::{Measurement, MetricSpec, ParameterConfig, SearchSpace, StudySpec};

#[derive(Parser)]
#[command(name = "tuner-coreutil")]
#[command(about = "Exercise the hyperparameter-tuning coordination core")]
#[command(version = "0.1.0")]
struct Cli {
    /// Verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full CreateStudy -> SuggestTrials -> CompleteTrial ->
    /// ListOptimalTrials loop against an in-memory datastore.
    Demo {
        /// Owner id to create the study under
        #[arg(long, default_value = "demo-owner")]
        owner: String,
        /// Display name of the study
        #[arg(long, default_value = "demo-study")]
        study: String,
        /// Number of SuggestTrials rounds to run
        #[arg(long, default_value_t = 3)]
        rounds: u32,
        /// Trials requested per round
        #[arg(long, default_value_t = 2)]
        suggestion_count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TunerConfig::from_env();
    let filter = if cli.verbose { "debug" } else { config.log_filter.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Demo {
            owner,
            study,
            rounds,
            suggestion_count,
        } => run_demo(owner, study, rounds, suggestion_count, config).await,
    }
}

async fn run_demo(
    owner: String,
    study_display_name: String,
    rounds: u32,
    suggestion_count: u32,
    config: TunerConfig,
) -> Result<()> {
    let datastore: Arc<dyn Datastore> = Arc::new(InMemoryDatastore::new());
    let policy = Arc::new(RandomPolicyClient::new());
    let orchestrator = DefaultOrchestrator::new(datastore, policy, config);

    let owner_name = tuner_core::naming::owner_name(&owner);
    let study = orchestrator
        .create_study(
            &owner_name,
            CreateStudyRequest {
                incoming_name: String::new(),
                display_name: study_display_name,
                study_spec: StudySpec {
                    search_space: SearchSpace {
                        parameters: vec![ParameterConfig::double("learning_rate", 1e-5, 1.0)],
                        is_conditional: false,
                    },
                    metrics: vec![MetricSpec {
                        metric_id: "accuracy".into(),
                        goal: tuner_core::types::Goal::Maximize,
                    }],
                    algorithm: "default".into(),
                },
            },
        )
        .await
        .context("create_study")?;
    info!(study = %study.name, "created study");

    for round in 0..rounds {
        let client_id = format!("worker-{round}");
        let op = orchestrator
            .suggest_trials(&study.name, &client_id, suggestion_count)
            .await
            .context("suggest_trials")?;
        let trials = match op.outcome {
            Some(tuner_core::types::OperationOutcome::Response(response)) => response.trials,
            Some(tuner_core::types::OperationOutcome::Error(status)) => {
                anyhow::bail!("policy error on round {round}: {}", status.message)
            }
            None => anyhow::bail!("suggest_trials returned an unfinished operation"),
        };
        info!(round, trials = trials.len(), "suggested trials");

        for trial in trials {
            let learning_rate = match trial.parameters.get("learning_rate") {
                Some(tuner_core::types::ParameterValue::Double(v)) => *v,
                _ => 0.0,
            };
            let accuracy = 1.0 - learning_rate;
            orchestrator
                .complete_trial(
                    &trial.name,
                    tuner_core::orchestrator::CompleteTrialRequest {
                        final_measurement: Some(Measurement {
                            step: 1,
                            elapsed: std::time::Duration::from_secs(1),
                            metrics: [("accuracy".to_string(), accuracy)].into_iter().collect(),
                        }),
                        trial_infeasible: false,
                        infeasible_reason: String::new(),
                    },
                )
                .await
                .context("complete_trial")?;
            info!(trial = %trial.name, learning_rate, accuracy, "completed trial");
        }
    }

    let optimal = orchestrator.list_optimal_trials(&study.name).await.context("list_optimal_trials")?;
    println!("Optimal trials for {}:", study.name);
    for trial in optimal {
        println!("  {} -> {:?}", trial.name, trial.final_measurement);
    }

    Ok(())
}
