use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod clock;
mod commands;
mod config;
mod controllers;
mod escape;
mod fingerprint;
mod highlight;
mod ids;
mod models;
mod storage;
#[cfg(test)]
mod test_support;
pub(crate) mod types;

mod error;
pub(crate) use error::{ApiError, ApiResult};

use config::{Config, StorageKind};
use controllers::paste::PasteService;
use highlight::AnyHighlighter;
use storage::{AnyStorage, Database, MemoryStore};

pub type Pastes = PasteService<AnyStorage, AnyHighlighter>;

#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub pastes: Pastes,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage: AnyStorage = match config.storage.kind {
            StorageKind::Database => Database::connect(&config.database.url)
                .await
                .context("failed to connect to database")?
                .into(),
            StorageKind::Memory => MemoryStore::new().into(),
        };
        let highlighter = AnyHighlighter::from_config(&config.highlighter)
            .await
            .context("failed to set up highlighter")?;
        let pastes = PasteService::new(storage, highlighter, config.limits.clone());

        Ok(App { config, pastes })
    }
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Delete all expired pastes and exit.
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).await?;
    info!(
        "storage: {:?}, highlighter: {:?}",
        config.storage.kind, config.highlighter.kind
    );

    let app = App::new(config).await?;

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}
