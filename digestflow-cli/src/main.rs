//! `digestflow` binary.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use digestflow::adapters::build_collaborators;
use digestflow::config::AppConfig;
use digestflow::core::RunState;
use digestflow::observability::{init_logging, LogFormat};
use digestflow::pipeline::Orchestrator;

/// Daily news digest pipeline.
#[derive(Debug, Parser)]
#[command(name = "digestflow", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute one daily run.
    Run {
        /// Run date (YYYY-MM-DD); the previous day's broadcast is processed.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the run report as JSON when finished.
        #[arg(long)]
        report: bool,
    },
    /// Report which required settings are present.
    CheckConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(format).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Run { date, report } => run(date, report).await,
        Commands::CheckConfig => check_config(),
    }
}

async fn run(date: Option<NaiveDate>, report: bool) -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    ensure_complete(&config)?;
    let (collaborators, dispatcher) =
        build_collaborators(&config).context("Failed to build collaborators")?;

    let run_date = date.unwrap_or_else(|| Local::now().date_naive());
    let run = Orchestrator::new(config, collaborators, dispatcher)
        .run(run_date)
        .await?;

    if report {
        println!("{}", serde_json::to_string_pretty(&run)?);
    }

    if run.state() == RunState::Aborted {
        bail!(
            "run aborted: {}",
            run.abort_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    tracing::info!(run_id = %run.run_id, title = %run.title, "Daily run complete");
    Ok(())
}

/// Logs every missing setting on one line and refuses to start the run.
fn ensure_complete(config: &AppConfig) -> Result<()> {
    if let Err(err) = config.validate() {
        tracing::error!(error = %err, "Run not started");
        bail!("run not started: {err}");
    }
    Ok(())
}

fn check_config() -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    println!("{}", config.presence_report());
    println!("{config:#?}");

    let missing = config.missing_required();
    if !missing.is_empty() {
        bail!("missing required configuration: {}", missing.join(", "));
    }
    Ok(())
}
