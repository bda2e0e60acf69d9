use clap::Parser;

use super::{AskArgs, Cli, Commands, ImportArgs, ServeArgs};

#[test]
fn db_flag_overrides_the_default_database() {
    let cli = Cli::try_parse_from(["pelagos", "--db", "/tmp/ferries.db", "status"])
        .expect("parse");
    assert_eq!(
        cli.db.as_deref().and_then(|p| p.to_str()),
        Some("/tmp/ferries.db")
    );
    assert!(matches!(cli.command, Commands::Status));
}

#[test]
fn import_parses_the_historical_flag() {
    let cli = Cli::try_parse_from(["pelagos", "import", "feed.json", "--historical"])
        .expect("parse");
    match cli.command {
        Commands::Import(ImportArgs { file, historical }) => {
            assert_eq!(file.to_string_lossy(), "feed.json");
            assert!(historical);
        }
        _ => panic!("expected import command"),
    }
}

#[test]
fn ask_parses_agent_type_and_session() {
    let cli = Cli::try_parse_from([
        "pelagos",
        "ask",
        "How much is Piraeus to Paros?",
        "--agent-type",
        "price",
        "--session",
        "trip-1",
    ])
    .expect("parse");
    match cli.command {
        Commands::Ask(AskArgs {
            question,
            agent_type,
            session,
        }) => {
            assert_eq!(question, "How much is Piraeus to Paros?");
            assert_eq!(agent_type.as_deref(), Some("price"));
            assert_eq!(session.as_deref(), Some("trip-1"));
        }
        _ => panic!("expected ask command"),
    }
}

#[test]
fn ask_requires_a_question() {
    let parsed = Cli::try_parse_from(["pelagos", "ask"]);
    assert!(parsed.is_err(), "ask without a question must be rejected");
}

#[test]
fn serve_parses_the_bind_override() {
    let cli = Cli::try_parse_from(["pelagos", "serve", "--bind", "0.0.0.0:8080"])
        .expect("parse");
    match cli.command {
        Commands::Serve(ServeArgs { bind }) => {
            assert_eq!(bind.as_deref(), Some("0.0.0.0:8080"));
        }
        _ => panic!("expected serve command"),
    }
}

#[test]
fn update_now_parses_as_a_bare_command() {
    let cli = Cli::try_parse_from(["pelagos", "update-now"]).expect("parse");
    assert!(matches!(cli.command, Commands::UpdateNow));
}
