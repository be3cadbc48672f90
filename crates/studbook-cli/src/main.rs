//! Studbook CLI - Command line interface for the horse registry

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, horse, owner};
use config::Config;
use output::OutputFormat;
use studbook_core::Error;
use studbook_server::{ErrorDto, Studbook};
use studbook_storage::{MemoryStorage, StorageBackend};

#[derive(Parser)]
#[command(name = "studbook")]
#[command(author, version, about = "Horse registry with pedigree tracking")]
pub struct Cli {
    /// Data directory (defaults to the config file's data_dir)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum, default_value_t = BackendKind::Redb, global = true)]
    pub backend: BackendKind,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Embedded redb file
    Redb,
    /// In-process only, lost on exit
    Memory,
    /// SQLite file (needs the `sqlite` feature)
    Sqlite,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage horses
    Horse(horse::HorseArgs),
    /// Manage owners
    Owner(owner::OwnerArgs),
    /// Start the REST server
    Serve {
        /// Listen address (defaults to the config file's bind_addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Inspect or edit the config file
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the registry service
pub struct AppContext {
    pub service: Arc<Studbook<dyn StorageBackend>>,
    pub config: Config,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: Config) -> anyhow::Result<Self> {
        let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());

        let storage: Arc<dyn StorageBackend> = match cli.backend {
            BackendKind::Memory => Arc::new(MemoryStorage::new()),
            BackendKind::Redb => open_redb(&data_dir)?,
            BackendKind::Sqlite => open_sqlite(&data_dir)?,
        };
        storage.initialize().await?;

        Ok(Self {
            service: Arc::new(Studbook::new(storage)),
            config,
        })
    }
}

#[cfg(feature = "redb")]
fn open_redb(data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn StorageBackend>> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("studbook.redb");
    tracing::debug!("Using database at: {:?}", db_path);
    Ok(Arc::new(studbook_storage::RedbStorage::open(&db_path)?))
}

#[cfg(not(feature = "redb"))]
fn open_redb(_data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn StorageBackend>> {
    anyhow::bail!("studbook was built without redb support")
}

#[cfg(feature = "sqlite")]
fn open_sqlite(data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn StorageBackend>> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("studbook.sqlite");
    tracing::debug!("Using database at: {:?}", db_path);
    Ok(Arc::new(studbook_storage::SqliteStorage::open(&db_path)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn StorageBackend>> {
    anyhow::bail!("studbook was built without sqlite support, rebuild with --features sqlite")
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    // These never touch storage
    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, cli),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(cli, Config::load()).await?;

    match &cli.command {
        Commands::Horse(args) => horse::run(args, cli, &ctx).await?,
        Commands::Owner(args) => owner::run(args, cli, &ctx).await?,
        Commands::Serve { addr } => {
            let addr = addr.clone().unwrap_or_else(|| ctx.config.bind_addr.clone());
            studbook_server::run_server(ctx.service.clone(), &addr).await?;
        }
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}

/// Print an error, listing every field error or conflict on its own line
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(e @ (Error::Validation(_) | Error::Conflict(_))) => {
            let dto = ErrorDto::from_error(e);
            eprintln!("Error: {}", dto.message);
            for message in dto.errors {
                eprintln!("  - {}", message);
            }
        }
        _ => eprintln!("Error: {:#}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting studbook CLI");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
