use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use super::run_from_db;
use crate::cli::{AskArgs, Commands, ImportArgs};
use pelagos_core::FerryStore;

const DATASET_FEED: &str = r#"[{
    "route_id": "R200",
    "company": "Blue Star Ferries",
    "company_code": "BSF",
    "origin_port": "Piraeus",
    "origin_port_code": "PIR",
    "destination_port": "Paros",
    "destination_port_code": "PAS",
    "departure_time": "07:30",
    "arrival_time": "11:45",
    "origin_port_stop": 1,
    "destination_port_stop": 2,
    "departure_offset": 0,
    "arrival_offset": 0,
    "duration": 255,
    "dates_and_vessels": {"2026-07-01": "BSD___Blue Star Delos"},
    "vessels_and_indicative_prices": {"BSD___Blue Star Delos": 3950},
    "vessels_and_accommodation_prices": {"BSD___Blue Star Delos": {"DECK___Deck": 3950}}
}, {
    "route_id": "R310",
    "company": "SeaJets",
    "company_code": "SJT",
    "origin_port": "Paros",
    "origin_port_code": "PAS",
    "destination_port": "Naxos",
    "destination_port_code": "NAX",
    "departure_time": "13:15",
    "arrival_time": "14:00",
    "origin_port_stop": 1,
    "destination_port_stop": 2,
    "departure_offset": 0,
    "arrival_offset": 0,
    "duration": 45,
    "dates_and_vessels": {"2026-07-01": "WJ2___WorldChampion Jet 2"},
    "vessels_and_indicative_prices": {"WJ2___WorldChampion Jet 2": 2400},
    "vessels_and_accommodation_prices": {}
}]"#;

const HISTORICAL_FEED: &str = r#"[{
    "origin_name": "PIR___Piraeus",
    "destination_name": "PAS___Paros",
    "dateRanges": [
        {"startDate": "2026-06-01", "endDate": "2026-09-30", "appearDate": "2026-01-15"}
    ]
}]"#;

fn seeded_db(dir: &Path) -> PathBuf {
    let db = dir.join("gtfs.db");
    let feed = dir.join("feed.json");
    fs::write(&feed, DATASET_FEED).expect("write feed");
    run_from_db(
        &db,
        Commands::Import(ImportArgs {
            file: feed,
            historical: false,
        }),
    )
    .expect("import");
    db
}

#[test]
fn init_creates_the_schema_and_bootstrap_admin() {
    let temp = tempdir().expect("tempdir");
    let db = temp.path().join("gtfs.db");

    run_from_db(&db, Commands::Init).expect("init");
    let store = FerryStore::open(&db).expect("open");
    assert_eq!(store.counts().expect("counts").users, 1);

    // A second init must not duplicate the account.
    run_from_db(&db, Commands::Init).expect("second init");
    assert_eq!(store.counts().expect("counts").users, 1);
}

#[test]
fn import_loads_a_dataset_and_records_the_run() {
    let temp = tempdir().expect("tempdir");
    let db = seeded_db(temp.path());

    let store = FerryStore::open(&db).expect("open");
    let counts = store.counts().expect("counts");
    assert_eq!(counts.routes, 2);
    assert_eq!(counts.ports, 3);

    let run = store
        .last_import_run()
        .expect("last import")
        .expect("run recorded");
    assert_eq!(run.status, "ok");
    assert_eq!(run.routes, 2);
}

#[test]
fn import_historical_flag_replaces_availability_ranges() {
    let temp = tempdir().expect("tempdir");
    let db = temp.path().join("gtfs.db");
    let feed = temp.path().join("historical.json");
    fs::write(&feed, HISTORICAL_FEED).expect("write feed");

    run_from_db(
        &db,
        Commands::Import(ImportArgs {
            file: feed,
            historical: true,
        }),
    )
    .expect("historical import");

    let store = FerryStore::open(&db).expect("open");
    assert_eq!(store.counts().expect("counts").historical_ranges, 1);
}

#[test]
fn ask_rejects_an_unknown_agent_type() {
    let temp = tempdir().expect("tempdir");
    let db = temp.path().join("gtfs.db");

    let err = run_from_db(
        &db,
        Commands::Ask(AskArgs {
            question: "What ferries go from Piraeus to Paros?".to_string(),
            agent_type: Some("weather".to_string()),
            session: None,
        }),
    )
    .expect_err("unknown agent type must fail");
    assert!(err.to_string().contains("unknown --agent-type"));
}

#[test]
fn ask_answers_a_route_question_from_the_database() {
    let temp = tempdir().expect("tempdir");
    let db = seeded_db(temp.path());

    run_from_db(
        &db,
        Commands::Ask(AskArgs {
            question: "What ferries go from Piraeus to Paros?".to_string(),
            agent_type: Some("route".to_string()),
            session: None,
        }),
    )
    .expect("ask");
}

#[test]
fn status_and_ports_run_against_a_seeded_database() {
    let temp = tempdir().expect("tempdir");
    let db = seeded_db(temp.path());

    run_from_db(&db, Commands::Status).expect("status");
    run_from_db(&db, Commands::Ports).expect("ports");
}
