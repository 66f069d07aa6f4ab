use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use liftmetrics::client::HttpDatasetClient;
use liftmetrics::config::{ConfigLoader, PipelineConfig};
use liftmetrics::error::LiftError;
use liftmetrics::output::{JsonOutput, NamesResult};
use liftmetrics::store::Store;
use liftmetrics::sync::{SyncOptions, Syncer};

#[derive(Parser)]
#[command(name = "liftmetrics")]
#[command(about = "Keeps a local powerlifting results database in sync and derives lifter metrics")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./liftmetrics.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Overrides the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Refresh the dataset if the remote revision changed")]
    Sync(SyncArgs),
    #[command(about = "Compare local and remote revisions")]
    Check,
    #[command(about = "Recompute derived tables from stored records")]
    Recompute,
    #[command(about = "Show details, performance and stats for one lifter")]
    Lifter(LifterArgs),
    #[command(about = "Rewrite lifters.json from the store")]
    Names,
}

#[derive(Args)]
struct SyncArgs {
    /// Refresh even when the revisions match
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct LifterArgs {
    name: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<LiftError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LiftError) -> u8 {
    match error {
        LiftError::RevisionNotFound(_) => 2,
        LiftError::LifterNotFound(_) => 2,
        LiftError::ConfigRead(_) => 2,
        LiftError::ConfigParse(_) => 2,
        LiftError::InvalidConfig(_) => 2,
        LiftError::Network(_) => 3,
        LiftError::HttpStatus { .. } => 3,
        LiftError::Timeout(_) => 4,
        LiftError::Cancelled(_) => 4,
        LiftError::Archive(_) => 5,
        LiftError::CsvNotFound(_) => 5,
        LiftError::Parse { .. } => 5,
        LiftError::Storage(_) => 6,
        LiftError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Sync(args) => {
            let syncer = Syncer::new(HttpDatasetClient::from_config(&config)?, config);
            let result = syncer.sync(SyncOptions { force: args.force }, &JsonOutput)?;
            JsonOutput::print_sync(&result).into_diagnostic()
        }
        Commands::Check => {
            let syncer = Syncer::new(HttpDatasetClient::from_config(&config)?, config);
            let status = syncer.check()?;
            JsonOutput::print_status(&status).into_diagnostic()
        }
        Commands::Recompute => {
            let syncer = Syncer::new(HttpDatasetClient::from_config(&config)?, config);
            let result = syncer.recompute(&JsonOutput)?;
            JsonOutput::print_recompute(&result).into_diagnostic()
        }
        Commands::Lifter(args) => {
            let store = Store::open_read_only(config.database_path().as_std_path())?;
            let report = store.lifter_report(&args.name)?;
            JsonOutput::print_lifter(&report).into_diagnostic()
        }
        Commands::Names => {
            let syncer = Syncer::new(HttpDatasetClient::from_config(&config)?, config);
            let count = syncer.export_names()?;
            JsonOutput::print_names(&NamesResult {
                path: syncer.config().lifters_json_path().to_string(),
                count,
            })
            .into_diagnostic()
        }
    }
}

fn resolve_config(
    path: Option<&str>,
    data_dir: Option<Utf8PathBuf>,
) -> Result<PipelineConfig, LiftError> {
    let mut config = ConfigLoader::resolve(path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(data_dir = %config.data_dir, "configuration resolved");
    Ok(config)
}
