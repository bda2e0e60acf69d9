use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[cfg(test)]
mod tests;

#[derive(Debug, Parser)]
#[command(name = "pelagos")]
#[command(about = "Greek ferry search over a local route database", version)]
pub struct Cli {
    /// SQLite database file; `PELAGOS_DB_PATH` applies when the flag is absent.
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Init,
    Import(ImportArgs),
    Ask(AskArgs),
    Status,
    Ports,
    UpdateNow,
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub file: PathBuf,
    /// Load the file as historical availability ranges instead of a full dataset.
    #[arg(long, default_value_t = false)]
    pub historical: bool,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(allow_hyphen_values = true)]
    pub question: String,
    /// Pin one specialist: route, price, schedule, or travel.
    #[arg(long, value_name = "KIND")]
    pub agent_type: Option<String>,
    /// Continue a chat session instead of starting a new one.
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address; `PELAGOS_WEB_BIND` applies when the flag is absent.
    #[arg(long)]
    pub bind: Option<String>,
}
