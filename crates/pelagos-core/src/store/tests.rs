use tempfile::{TempDir, tempdir};

use crate::importer::{self, RawRouteRecord};
use crate::models::{HistoricalRange, SchedulePreference};

use super::*;

pub(crate) fn open_store() -> (TempDir, FerryStore) {
    let temp = tempdir().expect("tempdir");
    let store = FerryStore::open(temp.path().join("ferries.db")).expect("open failed");
    (temp, store)
}

pub(crate) fn sample_records() -> Vec<RawRouteRecord> {
    let feed = serde_json::json!([
        {
            "route_id": "R100",
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
            "duration": 255,
            "dates_and_vessels": {
                "2026-07-01": "BSD___Blue Star Delos",
                "2026-07-02": "BSD___Blue Star Delos"
            },
            "vessels_and_indicative_prices": {"BSD___Blue Star Delos": 3950},
            "vessels_and_accommodation_prices": {
                "BSD___Blue Star Delos": {
                    "DECK___Deck": 3950,
                    "VIP___Vip Lounge": 5900,
                    "INF___Infant": 0
                }
            }
        },
        {
            "route_id": "R101",
            "company": "Blue Star Ferries",
            "company_code": "BSF",
            "origin_port": "Paros",
            "origin_port_code": "PAS",
            "destination_port": "Naxos",
            "destination_port_code": "NAX",
            "departure_time": "12:45",
            "arrival_time": "13:30",
            "duration": 45,
            "dates_and_vessels": {"2026-07-01": "BSD___Blue Star Delos"},
            "vessels_and_indicative_prices": {"BSD___Blue Star Delos": 1200}
        },
        {
            "route_id": "R102",
            "company": "Golden Star Ferries",
            "company_code": "GSF",
            "origin_port": "Rafina",
            "origin_port_code": "RAF",
            "destination_port": "Mykonos",
            "destination_port_code": "MYK",
            "departure_time": "07:10",
            "arrival_time": "09:40",
            "duration": 150,
            "dates_and_vessels": {"2026-07-01": "SC1___Supercat One"},
            "vessels_and_indicative_prices": {"SC1___Supercat One": 2850}
        },
        {
            "route_id": "R103",
            "company": "Blue Star Ferries",
            "company_code": "BSF",
            "origin_port": "Piraeus",
            "origin_port_code": "PIR",
            "destination_port": "Naxos",
            "destination_port_code": "NAX",
            "departure_time": "07:00",
            "arrival_time": "12:30",
            "duration": 330,
            "dates_and_vessels": {"2026-07-02": "WJ2___Worldchampion Jet"},
            "vessels_and_indicative_prices": {"WJ2___Worldchampion Jet": 5990}
        },
        {
            "route_id": "R104",
            "company": "Blue Star Ferries",
            "company_code": "BSF",
            "origin_port": "Piraeus",
            "origin_port_code": "PIR",
            "destination_port": "Paros",
            "destination_port_code": "PAS",
            "departure_time": "15:30",
            "arrival_time": "19:45",
            "duration": 255,
            "dates_and_vessels": {"2026-07-01": "BSD___Blue Star Delos"},
            "vessels_and_indicative_prices": {"BSD___Blue Star Delos": 4100}
        }
    ]);
    serde_json::from_value(feed).expect("fixture records")
}

pub(crate) fn seeded_store() -> (TempDir, FerryStore) {
    let (temp, store) = open_store();
    importer::replace_dataset(&store, &sample_records()).expect("seed dataset");
    (temp, store)
}

#[test]
fn import_normalizes_and_counts_entities() {
    let (_temp, store) = seeded_store();
    let counts = store.counts().expect("counts");
    assert_eq!(counts.companies, 2);
    assert_eq!(counts.ports, 5);
    assert_eq!(counts.vessels, 3);
    assert_eq!(counts.routes, 5);
    assert_eq!(counts.schedules, 6);
    assert_eq!(counts.accommodations, 2);
}

#[test]
fn reimport_replaces_instead_of_appending() {
    let (_temp, store) = seeded_store();
    importer::replace_dataset(&store, &sample_records()).expect("second import");
    let counts = store.counts().expect("counts");
    assert_eq!(counts.routes, 5);
    assert_eq!(counts.schedules, 6);
}

#[test]
fn import_skips_schedules_with_unparseable_dates() {
    let (_temp, store) = open_store();
    let feed = serde_json::json!([{
        "route_id": "R1",
        "company": "Blue Star Ferries",
        "company_code": "BSF",
        "origin_port": "Piraeus",
        "origin_port_code": "PIR",
        "destination_port": "Paros",
        "destination_port_code": "PAS",
        "departure_time": "07:30",
        "arrival_time": "11:45",
        "duration": 255,
        "dates_and_vessels": {
            "2026-07-01": "BSD___Blue Star Delos",
            "07/15/2026": "BSD___Blue Star Delos"
        }
    }]);
    let records: Vec<RawRouteRecord> = serde_json::from_value(feed).expect("records");
    let stats = importer::replace_dataset(&store, &records).expect("import");
    assert_eq!(stats.schedules, 1);
    assert_eq!(stats.skipped_schedules, 1);
}

#[test]
fn import_run_is_recorded() {
    let (temp, store) = open_store();
    let feed_path = temp.path().join("feed.json");
    let feed = serde_json::to_string(&serde_json::json!({
        "routes": [{
            "route_id": "R1",
            "company": "Blue Star Ferries",
            "company_code": "BSF",
            "origin_port": "Piraeus",
            "origin_port_code": "PIR",
            "destination_port": "Paros",
            "destination_port_code": "PAS",
            "departure_time": "07:30",
            "arrival_time": "11:45",
            "duration": 255,
            "dates_and_vessels": {"2026-07-01": "BSD___Blue Star Delos"}
        }]
    }))
    .expect("serialize feed");
    std::fs::write(&feed_path, feed).expect("write feed");

    let stats = importer::import_dataset_file(&store, &feed_path).expect("import");
    assert_eq!(stats.routes, 1);

    let run = store
        .last_import_run()
        .expect("last run")
        .expect("run recorded");
    assert_eq!(run.status, "ok");
    assert_eq!(run.routes, 1);
    assert_eq!(run.schedules, 1);
    assert!(run.finished_at.is_some());
}

#[test]
fn failed_import_keeps_previous_dataset_and_records_failure() {
    let (temp, store) = seeded_store();
    let feed_path = temp.path().join("broken.json");
    std::fs::write(&feed_path, "{\"data\": []}").expect("write feed");

    let err = importer::import_dataset_file(&store, &feed_path).expect_err("must fail");
    assert!(matches!(err, PelagosError::InvalidDataset(_)));

    let counts = store.counts().expect("counts");
    assert_eq!(counts.routes, 5);
    let run = store
        .last_import_run()
        .expect("last run")
        .expect("run recorded");
    assert_eq!(run.status, "failed");
    assert!(run.detail.is_some());
}

#[test]
fn list_ports_is_sorted_and_uppercased() {
    let (_temp, store) = seeded_store();
    let ports = store.list_ports().expect("ports");
    let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["MYKONOS", "NAXOS", "PAROS", "PIRAEUS", "RAFINA"]);
}

#[test]
fn find_ports_matches_code_or_name_fragment() {
    let (_temp, store) = seeded_store();
    let by_code = store.find_ports("pir").expect("by code");
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].code, "PIR");

    let by_name = store.find_ports("nax").expect("by name");
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "NAXOS");
}

#[test]
fn direct_departures_honor_preference_and_date() {
    let (_temp, store) = seeded_store();
    let earliest = store
        .direct_departures(
            "piraeus",
            "paros",
            None,
            SchedulePreference::Earliest,
            5,
        )
        .expect("earliest");
    assert_eq!(earliest.len(), 2);
    assert_eq!(earliest[0].departure_time, "07:30");

    let latest = store
        .direct_departures("piraeus", "paros", None, SchedulePreference::Latest, 5)
        .expect("latest");
    assert_eq!(latest[0].departure_time, "15:30");

    let on_first = store
        .direct_departures(
            "piraeus",
            "paros",
            Some("2026-07-01"),
            SchedulePreference::Earliest,
            5,
        )
        .expect("dated");
    assert_eq!(on_first.len(), 2);

    let off_season = store
        .direct_departures(
            "piraeus",
            "paros",
            Some("2026-07-09"),
            SchedulePreference::Earliest,
            5,
        )
        .expect("off season");
    assert!(off_season.is_empty());
}

#[test]
fn connection_legs_expose_transfer_candidates() {
    let (_temp, store) = seeded_store();
    let first_legs = store
        .departures_from("piraeus", Some("2026-07-01"))
        .expect("first legs");
    assert_eq!(first_legs.len(), 2);

    let second_legs = store
        .departures_to("naxos", Some("2026-07-01"))
        .expect("second legs");
    assert_eq!(second_legs.len(), 1);
    assert_eq!(second_legs[0].origin_port, "PAROS");
}

#[test]
fn cheapest_from_athens_spans_all_attica_ports() {
    let (_temp, store) = seeded_store();
    let options = store.cheapest_from_athens(10).expect("cheapest");
    assert_eq!(options.len(), 4);
    assert_eq!(options[0].price_cents, 2850);
    assert_eq!(options[0].origin_port, "RAFINA");
    assert_eq!(options[1].price_cents, 3950);
}

#[test]
fn cheapest_from_port_filters_origin() {
    let (_temp, store) = seeded_store();
    let options = store.cheapest_from_port("paros", 10).expect("cheapest");
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].destination_port, "NAXOS");
    assert_eq!(options[0].price_cents, 1200);
}

#[test]
fn fare_breakdowns_order_by_price_with_accommodations() {
    let (_temp, store) = seeded_store();
    let fares = store.fare_breakdowns("piraeus", "paros").expect("fares");
    assert_eq!(fares.len(), 2);
    assert_eq!(fares[0].base_price_cents, 3950);
    assert_eq!(fares[0].accommodations.len(), 2);
    assert_eq!(fares[0].accommodations[0].code, "DECK");
    assert_eq!(fares[0].accommodations[1].price_cents, 5900);
    assert_eq!(fares[1].base_price_cents, 4100);
    assert!(fares[1].accommodations.is_empty());
}

#[test]
fn connection_count_spans_route_ids() {
    let (_temp, store) = seeded_store();
    let count = store.connection_count("piraeus", "paros").expect("count");
    assert_eq!(count, 2);
    let none = store.connection_count("paros", "rafina").expect("none");
    assert_eq!(none, 0);
}

#[test]
fn run_select_caps_rows_and_serializes_values() {
    let (_temp, store) = seeded_store();
    let rows = store
        .run_select("SELECT * FROM route_details ORDER BY route_id", 3)
        .expect("select");
    assert_eq!(rows.len(), 3);
    assert!(rows[0].contains_key("origin_port_name"));
    assert!(rows[0].contains_key("duration"));

    let err = store
        .run_select("SELECT nonsense FROM nowhere", 3)
        .expect_err("bad sql");
    assert!(matches!(err, PelagosError::Sqlite(_)));
}

#[test]
fn bootstrap_admin_is_created_once() {
    let (_temp, store) = open_store();
    assert!(store.ensure_bootstrap_admin().expect("first bootstrap"));
    assert!(!store.ensure_bootstrap_admin().expect("second bootstrap"));

    let user = store
        .verify_login("admin", "admin123")
        .expect("verify")
        .expect("admin present");
    assert!(user.is_admin);
    assert!(
        store
            .verify_login("admin", "wrong")
            .expect("verify wrong")
            .is_none()
    );
}

#[test]
fn duplicate_usernames_are_rejected() {
    let (_temp, store) = open_store();
    store
        .create_user("nikos", "nikos@example.com", "s3cr3t-pass", false)
        .expect("create");
    let err = store
        .create_user("nikos", "other@example.com", "another-pass", false)
        .expect_err("duplicate");
    assert!(matches!(err, PelagosError::Conflict(_)));
}

#[test]
fn auth_sessions_expire_and_purge() {
    let (_temp, store) = open_store();
    let user = store
        .create_user("maria", "maria@example.com", "s3cr3t-pass", true)
        .expect("create");
    let session = store
        .create_auth_session(user.id, 3600)
        .expect("create session");

    let resolved = store
        .lookup_auth_session(&session.token)
        .expect("lookup")
        .expect("session resolves");
    assert_eq!(resolved.username, "maria");

    store
        .with_conn(|conn| {
            conn.execute(
                "UPDATE auth_sessions SET expires_at = '2000-01-01T00:00:00+00:00' WHERE token = ?1",
                rusqlite::params![session.token],
            )?;
            Ok(())
        })
        .expect("backdate");

    assert!(
        store
            .lookup_auth_session(&session.token)
            .expect("expired lookup")
            .is_none()
    );
    assert_eq!(store.purge_expired_sessions().expect("purge"), 1);
}

#[test]
fn deleted_sessions_stop_resolving() {
    let (_temp, store) = open_store();
    let user = store
        .create_user("eleni", "eleni@example.com", "s3cr3t-pass", false)
        .expect("create");
    let session = store.create_auth_session(user.id, 3600).expect("session");
    assert!(store.delete_auth_session(&session.token).expect("delete"));
    assert!(
        store
            .lookup_auth_session(&session.token)
            .expect("lookup")
            .is_none()
    );
}

#[test]
fn historical_lookup_falls_back_to_fuzzy_then_reverse() {
    let (_temp, store) = open_store();
    let ranges = vec![HistoricalRange {
        origin_code: "PIR".to_string(),
        origin_name: "Piraeus".to_string(),
        destination_code: "HYD".to_string(),
        destination_name: "Ydra".to_string(),
        start_date: Some("2024-04-01".to_string()),
        end_date: Some("2024-10-31".to_string()),
        appear_date: Some("2024-01-15".to_string()),
    }];
    assert_eq!(store.replace_historical(&ranges).expect("replace"), 1);

    let exact = store
        .find_historical_routes("piraeus", "ydra")
        .expect("exact");
    assert_eq!(exact.len(), 1);

    let fuzzy = store.find_historical_routes("pirae", "ydr").expect("fuzzy");
    assert_eq!(fuzzy.len(), 1);

    let reverse = store
        .find_historical_routes("ydra", "piraeus")
        .expect("reverse");
    assert_eq!(reverse.len(), 1);
    assert_eq!(reverse[0].origin_name, "Piraeus");
}

#[cfg(unix)]
#[test]
fn open_hardens_database_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("ferries.db");
    let store = FerryStore::open(&db_path).expect("open failed");
    importer::replace_dataset(&store, &sample_records()).expect("seed");

    let mode = std::fs::metadata(&db_path)
        .expect("metadata")
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(mode, 0o600);
}
