use clap::{Parser, Subcommand};
use rootcause::prelude::{Report, ResultExt};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use taskweave_cli::commands::{self, RunOptions};
use taskweave_cli::config::CliConfig;
use taskweave_cli::error::CliError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// taskweave - run typed task workflows
#[derive(Parser)]
#[command(name = "taskweave")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (default: ./taskweave.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a workflow against every graph invariant
    Validate {
        /// Path to the workflow document
        workflow_file: PathBuf,
    },

    /// Print the order nodes would run in
    Order {
        /// Path to the workflow document
        workflow_file: PathBuf,
    },

    /// List nodes whose dependencies have all run
    Runnable {
        /// Path to the workflow document
        workflow_file: PathBuf,

        /// Node (ID or name) that has already run; repeatable
        #[arg(long = "executed")]
        executed: Vec<String>,
    },

    /// Connect two nodes, if the connection rules allow it
    Connect {
        /// Path to the workflow document
        workflow_file: PathBuf,

        /// Source node ID or name
        source: String,

        /// Target node ID or name
        target: String,

        /// Write the result here instead of updating the document in place
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print a workflow's summary
    Show {
        /// Path to the workflow document
        workflow_file: PathBuf,
    },

    /// Run a workflow
    Run {
        /// Path to the workflow document
        workflow_file: PathBuf,

        /// Echo each task's configuration instead of calling the task API
        #[arg(long)]
        dry_run: bool,

        /// Save the run outcome into the document's status
        #[arg(long)]
        record: bool,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Cancels the token on the first Ctrl-C. The run stops before its next node.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling run");
            token.cancel();
        }
    });
    cancel
}

async fn dispatch(cli: Cli) -> Result<ExitCode, Report<CliError>> {
    let config = CliConfig::load(cli.config.as_deref()).context(CliError::Config)?;
    init_tracing(&config.log_filter);

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Validate { workflow_file } => commands::validate(&workflow_file, &mut out)?,
        Command::Order { workflow_file } => commands::order(&workflow_file, &mut out)?,
        Command::Runnable {
            workflow_file,
            executed,
        } => commands::runnable(&workflow_file, &executed, &mut out)?,
        Command::Connect {
            workflow_file,
            source,
            target,
            output,
        } => commands::connect(
            &workflow_file,
            &source,
            &target,
            output.as_deref(),
            &mut out,
        )?,
        Command::Show { workflow_file } => commands::show(&workflow_file, &mut out)?,
        Command::Run {
            workflow_file,
            dry_run,
            record,
        } => {
            let options = RunOptions { dry_run, record };
            let summary = commands::run(
                &workflow_file,
                options,
                &config.runner,
                cancel_on_interrupt(),
                &mut out,
            )
            .await?;
            if !summary.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(report) => {
            eprintln!("error: {report}");
            ExitCode::FAILURE
        }
    }
}
