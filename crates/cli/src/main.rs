mod commands;
mod logging;
mod settings;

use clap::{Parser, Subcommand};
use elif_migrator::MigratorError;
use std::path::PathBuf;
use std::process::ExitCode;

use logging::{init_logging, LoggingConfig};
use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "migrator")]
#[command(about = "File based database migrations")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./migrator.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Migration directory
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log level filter, e.g. "debug" or "elif_migrator=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List migrations and whether they are applied
    List,

    /// Write the migration creating the history table
    Init,

    /// Create an empty migration
    New {
        /// Migration name
        name: String,
    },

    /// Apply migrations, all pending ones when no range is given
    Migrate {
        /// Name or `start..end` range
        range: Option<String>,
    },

    /// Roll back a range of migrations, most recent boundary first
    Rollback {
        /// Name or `start..end` range
        range: String,
    },

    /// Roll back every applied migration
    Reset,

    /// Roll back a range of migrations and delete their files
    Remove {
        /// Name or `start..end` range
        range: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(completed) = e.downcast_ref::<MigratorError>().map(MigratorError::completed) {
                if !completed.is_empty() {
                    eprintln!("Completed before the failure: {}", completed.join(", "));
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        directory: cli.dir,
        database_url: cli.database_url,
        log_level: cli.log_level,
        json_logs: cli.json_logs,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    init_logging(&LoggingConfig::new(
        settings.log_level.clone(),
        settings.log_format,
    ))?;

    match cli.command {
        Commands::List => commands::list(&settings).await,
        Commands::Init => commands::init(&settings).await,
        Commands::New { name } => commands::create(&settings, &name).await,
        Commands::Migrate { range } => commands::migrate(&settings, range.as_deref()).await,
        Commands::Rollback { range } => commands::rollback(&settings, &range).await,
        Commands::Reset => commands::reset(&settings).await,
        Commands::Remove { range } => commands::remove(&settings, &range).await,
    }
}
