// One-shot migration of manager details into the managers table
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use manager_intake::config::IntakeConfig;
use manager_intake::logging::init_tracing;
use manager_intake::storage::CommitMode;
use manager_intake::{MigrationError, MigrationTool};

#[derive(Parser, Debug)]
#[command(name = "manager-migrate", version, about = "Copy manager details from scanned documents into the managers table")]
struct Args {
    /// Config file (defaults to ./intake.toml or $INTAKE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the extracted records without opening the destination
    #[arg(long)]
    dry_run: bool,
    /// Only insert documents whose text matched
    #[arg(long)]
    skip_unmatched: bool,
    #[arg(long, value_enum)]
    commit_mode: Option<CommitMode>,
}

fn main() -> ExitCode {
    init_tracing("info");
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), MigrationError> {
    let mut config = IntakeConfig::load(args.config.as_deref())?;
    if args.skip_unmatched {
        config.destination.skip_unmatched = true;
    }
    if let Some(mode) = args.commit_mode {
        config.destination.commit_mode = mode;
    }

    let tool = MigrationTool::new(config.source, config.destination);

    if args.dry_run {
        let documents = tool.load_documents()?;
        println!("Loaded {} documents", documents.len());
        for (doc, record) in documents.iter().zip(MigrationTool::plan(&documents)) {
            println!("{}: {}", doc.id, record);
        }
        return Ok(());
    }

    let stats = tool.run()?;
    println!("Data migrated successfully!");
    println!("{}", stats);
    Ok(())
}

fn report(err: &MigrationError) {
    match err {
        MigrationError::EmptySource { .. } => {
            println!("No data found in source collection!");
        }
        MigrationError::MissingField { field, document } => {
            println!("Error: '{}' field not found in source data! (document {})", field, document);
        }
        other => {
            eprintln!("Migration failed: {}", other);
            let mut source = other.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
        }
    }
}
