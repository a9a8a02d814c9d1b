//! `gatectl`: run policy gate operations against a JSON state file.

mod wiring;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gate_config::GateConfig;
use gate_policy::{DeletionStatus, PolicyService, ValidationRequest};
use gate_primitives::{ComponentActivityId, ComponentId, PolicyId, TeamId};
use gate_telemetry::{TelemetryConfig, init_tracing};
use serde::Serialize;
use serde_json::json;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "gatectl", version, about = "Evaluate and inspect delivery pipeline policy gates")]
struct Cli {
    /// JSON configuration file; `GATE_*` environment variables are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON state snapshot seeding policies, pipelines, and components.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Activity journal, overriding the configured one.
    #[arg(long)]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List policy definitions in display order.
    Definitions,
    /// List rule comparison operators.
    Operators,
    /// List a team's policies and global policies with referencing stages.
    Policies {
        #[arg(long)]
        team: String,
    },
    /// Show one policy.
    Policy {
        #[arg(long)]
        id: String,
    },
    /// Validate a policy against a component version.
    Validate {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        component_activity: String,
        #[arg(long)]
        component: String,
        #[arg(long)]
        component_version: String,
    },
    /// Aggregate violation records for a team.
    Violations {
        #[arg(long)]
        team: String,
    },
    /// Summarise failing activities per policy for a team.
    Insights {
        #[arg(long)]
        team: String,
    },
    /// Delete a policy unless an enabled gate references it.
    Delete {
        #[arg(long)]
        policy: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => GateConfig::from_json_file(path)?,
        None => GateConfig::from_env()?,
    };
    init_tracing(&TelemetryConfig::with_filter(config.log_filter.clone()))?;

    let service =
        wiring::build_service(&config, cli.state.as_deref(), cli.journal.as_deref()).await?;
    execute(&service, cli.command).await
}

async fn execute(service: &PolicyService, command: Command) -> Result<ExitCode> {
    match command {
        Command::Definitions => print_json(&service.definitions().await?)?,
        Command::Operators => {
            let operators: Vec<_> = service
                .operators()
                .iter()
                .map(|operator| json!({"name": operator.name(), "symbol": operator.symbol()}))
                .collect();
            print_json(&operators)?;
        }
        Command::Policies { team } => {
            print_json(&service.policies_for_team(&TeamId::new(team)?).await?)?;
        }
        Command::Policy { id } => print_json(&service.policy(&PolicyId::new(id)?).await?)?,
        Command::Validate {
            policy,
            component_activity,
            component,
            component_version,
        } => {
            let request = ValidationRequest::new(
                PolicyId::new(policy)?,
                ComponentActivityId::new(component_activity)?,
                ComponentId::new(component)?,
                component_version,
            );
            print_json(&service.validate(request).await?)?;
        }
        Command::Violations { team } => {
            print_json(&service.violations(&TeamId::new(team)?).await?)?;
        }
        Command::Insights { team } => {
            print_json(&service.insights(&TeamId::new(team)?).await?)?;
        }
        Command::Delete { policy } => {
            let response = service.delete_policy(&PolicyId::new(policy)?).await?;
            print_json(&response)?;
            if response.status == DeletionStatus::Conflict {
                return Ok(ExitCode::from(3));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
