mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use pelagos_core::config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Cli;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(config::resolve_db_path);
    commands::run_from_db(&db_path, cli.command)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pelagos_core=info,pelagos_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}
