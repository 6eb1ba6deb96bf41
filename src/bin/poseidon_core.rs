use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use poseidon_core::config::ConfigLoader;
use poseidon_core::error::PoseidonError;
use poseidon_core::executor::{SystemExecutor, ToolStatus};
use poseidon_core::output::TextOutput;
use poseidon_core::workflow::Workflow;

#[derive(Parser)]
#[command(name = "poseidon-core")]
#[command(about = "POSEIDON FASTQ: inventory, plan and apply prefetch/fasterq-dump per sample directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Print the action plan")]
    Plan(DirArgs),
    #[command(about = "Execute the plan (prefetch downloads, bsub conversions)")]
    Apply(DirArgs),
    #[command(about = "Write sample_list.with_status.txt")]
    Status(DirArgs),
    #[command(about = "Delete .sra files whose FASTQs are complete")]
    Clean(DirArgs),
    #[command(about = "Print the version")]
    Version,
}

#[derive(Args)]
struct DirArgs {
    /// Directory containing sample_list.txt
    cancer_dir: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PoseidonError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PoseidonError) -> u8 {
    match error {
        PoseidonError::ManifestNotFound(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Version => {
            println!("poseidon-core {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Plan(args) => {
            let workflow = open_workflow(&args.cancer_dir, false)?;
            TextOutput::print_plan(&workflow.plan()).into_diagnostic()
        }
        Commands::Apply(args) => {
            let workflow = open_workflow(&args.cancer_dir, true)?;
            workflow.apply(&TextOutput)?;
            Ok(())
        }
        Commands::Status(args) => {
            let workflow = open_workflow(&args.cancer_dir, false)?;
            let path = workflow.status()?;
            TextOutput::print_snapshot(&path).into_diagnostic()
        }
        Commands::Clean(args) => {
            let workflow = open_workflow(&args.cancer_dir, false)?;
            TextOutput::print_clean(&workflow.clean()).into_diagnostic()
        }
    }
}

fn open_workflow(
    dir: &Path,
    check_tools: bool,
) -> Result<Workflow<SystemExecutor>, PoseidonError> {
    let dir = dir
        .canonicalize()
        .map_err(|err| PoseidonError::Filesystem(format!("{}: {err}", dir.display())))?;
    let config = ConfigLoader::resolve(&dir, |key| std::env::var(key).ok())?;
    let executor = SystemExecutor::new(config);
    if check_tools {
        if let ToolStatus::Missing { tools } = executor.tool_status() {
            tracing::warn!("tools not found in PATH: {}", tools.join(", "));
        }
    }
    Workflow::open(&dir, executor)
}
