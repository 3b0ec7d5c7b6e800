//! `orchestrator`: plan with one CLI assistant, review with another, then
//! implement and review the diff, with an approval prompt after every review.

mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use orchestrator_core::{
    ApprovalGate, AutoApprove, GitWorkspace, Outcome, OutcomeStatus, PairWorkflow,
    WorkflowConfig, init_observability,
};

use crate::console::{ConsoleReporter, TerminalGate};

#[derive(Debug, Parser)]
#[command(name = "orchestrator", version, about)]
struct Cli {
    /// What to build, in plain language.
    #[arg(required_unless_present = "probe")]
    task: Option<String>,

    /// TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Repository to work in (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Print each response only once it is complete.
    #[arg(long)]
    no_stream: bool,

    /// Approve every plan and diff without asking.
    #[arg(long, short = 'y')]
    yes: bool,

    #[arg(long, value_name = "N")]
    max_plan_rounds: Option<u32>,

    #[arg(long, value_name = "N")]
    max_code_rounds: Option<u32>,

    /// Model passed to the generation backend.
    #[arg(long, value_name = "MODEL")]
    generation_model: Option<String>,

    /// Model passed to the review backend.
    #[arg(long, value_name = "MODEL")]
    review_model: Option<String>,

    /// Check that both backend binaries can be launched, then exit.
    #[arg(long)]
    probe: bool,
}

impl Cli {
    fn apply(&self, config: &mut WorkflowConfig) {
        if let Some(dir) = &self.cwd {
            config.working_dir = Some(dir.clone());
        }
        if self.no_stream {
            config.stream = false;
        }
        if let Some(n) = self.max_plan_rounds {
            config.max_plan_rounds = n;
        }
        if let Some(n) = self.max_code_rounds {
            config.max_code_rounds = n;
        }
        if let Some(model) = &self.generation_model {
            config.generation.model = Some(model.clone());
        }
        if let Some(model) = &self.review_model {
            config.review.model = Some(model.clone());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    config.apply_env()?;
    cli.apply(&mut config);
    let harness = config.harness_builder()?.build()?;

    if cli.probe {
        let mut all_available = true;
        for capability in harness.probe_all().await {
            all_available &= capability.available;
            match (&capability.version, &capability.detail) {
                (Some(version), _) => println!("{}: {} ({})", capability.backend, version, capability.program),
                (None, Some(detail)) => println!("{}: unavailable: {detail}", capability.backend),
                (None, None) => println!("{}: available ({})", capability.backend, capability.program),
            }
        }
        return Ok(if all_available {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    let task = cli.task.clone().context("a task is required")?;
    let root = match &config.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let gate: Arc<dyn ApprovalGate> = if cli.yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalGate::new())
    };
    let mut workflow = PairWorkflow::new(
        &harness,
        &config,
        gate,
        Arc::new(GitWorkspace::new(root)),
        Box::new(ConsoleReporter),
    )?;

    let outcome = match workflow.run(&task).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(stderr) = err.backend_stderr().filter(|s| !s.trim().is_empty()) {
                eprintln!("backend stderr:\n{}", stderr.trim_end());
            }
            return Err(err.into());
        }
    };
    report(&outcome);
    Ok(if outcome.is_approved() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn report(outcome: &Outcome) {
    let status = match &outcome.status {
        OutcomeStatus::Approved => "approved".to_string(),
        OutcomeStatus::Aborted { stage } => format!("aborted during {stage} review"),
        OutcomeStatus::RoundsExhausted { stage } => {
            format!("{stage} rounds exhausted without approval")
        }
    };
    println!(
        "\nrun {}: {status} after {} plan round(s) and {} code round(s)",
        outcome.run_id, outcome.plan_rounds, outcome.code_rounds
    );
    tracing::debug!(sessions = ?outcome.sessions, "final session slots");
}
