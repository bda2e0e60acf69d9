use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use pelagos_core::models::AgentKind;
use pelagos_core::{AppConfig, FerryAgent, FerryStore, UpdateScheduler, importer};
use serde_json::json;

use crate::cli::{AskArgs, Commands};

#[cfg(test)]
mod tests;

pub(crate) fn run_from_db(db_path: &Path, command: Commands) -> Result<()> {
    validate_command_preflight(&command)?;

    let config = AppConfig::from_env();
    let store = FerryStore::open(db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    match command {
        Commands::Init => {
            let created = config.auth.bootstrap_admin && store.ensure_bootstrap_admin()?;
            print_json(&json!({
                "status": "ok",
                "database": db_path.display().to_string(),
                "bootstrap_admin_created": created,
            }))?;
        }
        Commands::Import(args) => {
            if args.historical {
                let ranges = importer::import_historical_file(&store, &args.file)?;
                print_json(&json!({
                    "status": "ok",
                    "file": args.file.display().to_string(),
                    "historical_ranges": ranges,
                }))?;
            } else {
                let stats = importer::import_dataset_file(&store, &args.file)?;
                print_json(&stats)?;
            }
        }
        Commands::Ask(args) => {
            let hint = parse_agent_hint(&args)?;
            let agent = FerryAgent::new(store, &config)?;
            let answer = agent.answer(&args.question, args.session.as_deref(), hint)?;
            println!("{}", answer.text);
        }
        Commands::Status => {
            let counts = store.counts()?;
            let last_import = store.last_import_run()?;
            print_json(&json!({
                "counts": counts,
                "last_import": last_import,
            }))?;
        }
        Commands::Ports => {
            let ports = store.list_ports()?;
            print_json(&ports)?;
        }
        Commands::UpdateNow => {
            let scheduler = UpdateScheduler::new(store, config.update.clone());
            let outcome = scheduler.run_now()?;
            print_json(&outcome)?;
        }
        Commands::Serve(args) => {
            let bind = args
                .bind
                .unwrap_or_else(pelagos_core::config::resolve_web_bind);
            pelagos_web::serve_web(store, &config, &bind)?;
        }
    }

    Ok(())
}

fn validate_command_preflight(command: &Commands) -> Result<()> {
    if let Commands::Ask(args) = command {
        parse_agent_hint(args)?;
    }
    Ok(())
}

fn parse_agent_hint(args: &AskArgs) -> Result<Option<AgentKind>> {
    let Some(raw) = args.agent_type.as_deref() else {
        return Ok(None);
    };
    match AgentKind::parse(raw) {
        Some(kind) => Ok(Some(kind)),
        None => anyhow::bail!(
            "unknown --agent-type '{raw}' (expected route, price, schedule, or travel)"
        ),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
