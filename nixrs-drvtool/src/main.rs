use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nixrs_drv::store_path::StoreDir;
use nixrs_drv::{DerivationStore, Settings};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

mod commands;
mod error;
mod render;

use error::CliError;

/// Inspect, diff and preview Nix derivations.
#[derive(Parser)]
#[command(name = "derivtool", version, about)]
struct App {
    /// Store directory that relative derivation paths are resolved against.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// How many derivations to load or cache paths to probe at once.
    #[arg(short = 'j', long, global = true)]
    max_concurrency: Option<usize>,

    /// Log level, overrides RUST_LOG when given.
    #[arg(long, short, global = true)]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Command,
}

impl App {
    pub fn init_logger(&self) {
        let filter = match self.log_level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    /// Environment settings with command line overrides applied.
    pub fn settings(&self) -> Result<Settings, CliError> {
        let mut settings = Settings::from_env()?;
        if let Some(store_dir) = &self.store_dir {
            settings.store_dir = StoreDir::new(store_dir)?;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            settings.max_concurrency = max_concurrency;
        }
        Ok(settings)
    }

    pub fn store(&self, settings: &Settings) -> DerivationStore {
        DerivationStore::from_settings(settings)
    }
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Show a derivation or one of its attributes.
    Show(commands::show::Args),
    /// Report the first difference between two derivations.
    Diff(commands::diff::Args),
    /// List the store paths needed to build a derivation.
    Closure(commands::closure::Args),
    /// Show which outputs need to be built, can be fetched or already exist.
    Preview(commands::preview::Args),
}

async fn run(app: App) -> Result<(), CliError> {
    match app.command.clone() {
        Command::Show(args) => commands::show::run_command(app, args).await,
        Command::Diff(args) => commands::diff::run_command(app, args).await,
        Command::Closure(args) => commands::closure::run_command(app, args).await,
        Command::Preview(args) => commands::preview::run_command(app, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    app.init_logger();
    match run(app).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
