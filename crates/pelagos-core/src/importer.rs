use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use rusqlite::{Transaction, params};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PelagosError, Result};
use crate::models::{HistoricalRange, ImportStats};
use crate::store::FerryStore;

/// One route leg as it appears in the dataset feed. A multi-stop itinerary
/// shares one `route_id` across several legs, distinguished by the port pair
/// and stop sequence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRouteRecord {
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub company_code: String,
    #[serde(default)]
    pub origin_port: String,
    #[serde(default)]
    pub origin_port_code: String,
    #[serde(default)]
    pub destination_port: String,
    #[serde(default)]
    pub destination_port_code: String,
    #[serde(default)]
    pub departure_time: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub origin_port_stop: i64,
    #[serde(default)]
    pub destination_port_stop: i64,
    #[serde(default)]
    pub departure_offset: i64,
    #[serde(default)]
    pub arrival_offset: i64,
    #[serde(default)]
    pub duration: i64,
    /// `schedule date -> vessel key`; the key encodes `CODE___NAME`.
    #[serde(default)]
    pub dates_and_vessels: BTreeMap<String, String>,
    /// `vessel key -> indicative fare in euro cents`.
    #[serde(default)]
    pub vessels_and_indicative_prices: BTreeMap<String, i64>,
    /// `vessel key -> accommodation key -> fare in euro cents`.
    #[serde(default)]
    pub vessels_and_accommodation_prices: BTreeMap<String, BTreeMap<String, i64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawHistoricalEntry {
    #[serde(default)]
    origin_name: String,
    #[serde(default)]
    destination_name: String,
    #[serde(default, rename = "dateRanges")]
    date_ranges: Vec<RawHistoricalDateRange>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawHistoricalDateRange {
    #[serde(default, rename = "startDate")]
    start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    end_date: Option<String>,
    #[serde(default, rename = "appearDate")]
    appear_date: Option<String>,
}

/// Replaces the whole dataset from a feed file and records the run in
/// `import_runs`. The swap is atomic: a malformed feed leaves the previous
/// dataset untouched.
pub fn import_dataset_file(store: &FerryStore, path: &Path) -> Result<ImportStats> {
    let source = path.display().to_string();
    let run_id = store.record_import_start(&source)?;
    let outcome = fs::read_to_string(path)
        .map_err(PelagosError::from)
        .and_then(|text| parse_route_records(&text))
        .and_then(|records| replace_dataset(store, &records));
    match outcome {
        Ok(stats) => {
            store.record_import_finish(run_id, "ok", None, stats.routes, stats.schedules)?;
            info!(
                source = %source,
                routes = stats.routes,
                schedules = stats.schedules,
                skipped = stats.skipped_schedules,
                "dataset import finished"
            );
            Ok(stats)
        }
        Err(err) => {
            let detail = err.to_string();
            store.record_import_finish(run_id, "failed", Some(&detail), 0, 0)?;
            warn!(source = %source, error = %detail, "dataset import failed");
            Err(err)
        }
    }
}

/// Replaces the historical availability ranges from a feed file.
pub fn import_historical_file(store: &FerryStore, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let ranges = parse_historical_records(&text)?;
    let inserted = store.replace_historical(&ranges)?;
    info!(source = %path.display(), ranges = inserted, "historical import finished");
    Ok(inserted)
}

/// Accepts either a bare JSON array of route records or an object with a
/// `routes` array, which is how the feed has shipped in both generations.
pub fn parse_route_records(text: &str) -> Result<Vec<RawRouteRecord>> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("routes") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid_feed_shape()),
        },
        _ => return Err(invalid_feed_shape()),
    };
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        records.push(serde_json::from_value(item)?);
    }
    Ok(records)
}

pub fn parse_historical_records(text: &str) -> Result<Vec<HistoricalRange>> {
    let entries: Vec<RawHistoricalEntry> = serde_json::from_str(text)?;
    let mut out = Vec::new();
    for entry in entries {
        let (origin_code, origin_name) = split_coded_key(&entry.origin_name);
        let (destination_code, destination_name) = split_coded_key(&entry.destination_name);
        for range in entry.date_ranges {
            out.push(HistoricalRange {
                origin_code: origin_code.clone(),
                origin_name: origin_name.clone(),
                destination_code: destination_code.clone(),
                destination_name: destination_name.clone(),
                start_date: range.start_date.clone(),
                end_date: range.end_date.clone(),
                appear_date: range.appear_date.clone(),
            });
        }
    }
    Ok(out)
}

pub fn replace_dataset(store: &FerryStore, records: &[RawRouteRecord]) -> Result<ImportStats> {
    let started = Instant::now();
    let mut stats = store.with_tx(|tx| {
        clear_dataset(tx)?;
        insert_records(tx, records)
    })?;
    stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(stats)
}

fn clear_dataset(tx: &Transaction<'_>) -> Result<()> {
    // Reverse dependency order so foreign keys stay satisfied.
    tx.execute("DELETE FROM accommodations", [])?;
    tx.execute("DELETE FROM schedules", [])?;
    tx.execute("DELETE FROM ferry_routes", [])?;
    tx.execute("DELETE FROM vessels", [])?;
    tx.execute("DELETE FROM ports", [])?;
    tx.execute("DELETE FROM ferry_companies", [])?;
    Ok(())
}

fn insert_records(tx: &Transaction<'_>, records: &[RawRouteRecord]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut companies: BTreeMap<String, i64> = BTreeMap::new();
    let mut ports: BTreeMap<String, i64> = BTreeMap::new();
    let mut vessels: BTreeMap<String, i64> = BTreeMap::new();
    let mut routes: BTreeMap<String, i64> = BTreeMap::new();

    for record in records {
        let company_code = clean_upper(&record.company_code);
        let company_id = match companies.get(&company_code) {
            Some(id) => *id,
            None => {
                let id = insert_company(tx, &company_code, &clean_upper(&record.company))?;
                companies.insert(company_code.clone(), id);
                stats.companies += 1;
                id
            }
        };

        let origin_code = clean_upper(&record.origin_port_code);
        let origin_id = upsert_port(tx, &mut ports, &origin_code, &record.origin_port, &mut stats)?;
        let destination_code = clean_upper(&record.destination_port_code);
        let destination_id = upsert_port(
            tx,
            &mut ports,
            &destination_code,
            &record.destination_port,
            &mut stats,
        )?;

        let route_number = record.route_id.trim().to_string();
        let route_key = format!("{route_number}_{origin_code}_{destination_code}");
        let ferry_route_id = match routes.get(&route_key) {
            Some(id) => *id,
            None => {
                tx.execute(
                    r"
                    INSERT INTO ferry_routes(
                        route_id, company_id, origin_port_id, destination_port_id,
                        origin_port_stop, destination_port_stop,
                        departure_time, arrival_time,
                        departure_offset, arrival_offset, duration
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ",
                    params![
                        route_number,
                        company_id,
                        origin_id,
                        destination_id,
                        record.origin_port_stop,
                        record.destination_port_stop,
                        record.departure_time.trim(),
                        record.arrival_time.trim(),
                        record.departure_offset,
                        record.arrival_offset,
                        record.duration,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                routes.insert(route_key, id);
                stats.routes += 1;
                id
            }
        };

        for (date_raw, vessel_key_raw) in &record.dates_and_vessels {
            let date = date_raw.trim();
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                warn!(route = %route_number, date = %date, "skipping schedule with unparseable date");
                stats.skipped_schedules += 1;
                continue;
            }
            let vessel_key = clean_upper(vessel_key_raw);
            let vessel_id = match vessels.get(&vessel_key) {
                Some(id) => *id,
                None => {
                    let (code, name) = split_coded_key(&vessel_key);
                    tx.execute(
                        "INSERT INTO vessels(code, name, vessel_key) VALUES (?1, ?2, ?3)",
                        params![code, name, vessel_key],
                    )?;
                    let id = tx.last_insert_rowid();
                    vessels.insert(vessel_key.clone(), id);
                    stats.vessels += 1;
                    id
                }
            };

            let indicative_price = record
                .vessels_and_indicative_prices
                .get(vessel_key_raw)
                .copied()
                .unwrap_or(0);
            let inserted = tx.execute(
                r"
                INSERT OR IGNORE INTO schedules(
                    ferry_route_id, route_id, schedule_date, vessel_id, indicative_price
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![ferry_route_id, route_number, date, vessel_id, indicative_price],
            )?;
            stats.schedules += inserted;

            if let Some(accommodations) = record.vessels_and_accommodation_prices.get(vessel_key_raw)
            {
                for (accommodation_key, price) in accommodations {
                    if *price <= 0 {
                        continue;
                    }
                    let (code, name) = split_coded_key(&clean_upper(accommodation_key));
                    let inserted = tx.execute(
                        r"
                        INSERT OR IGNORE INTO accommodations(
                            vessel_id, ferry_route_id, route_id, code, name, price
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        ",
                        params![vessel_id, ferry_route_id, route_number, code, name, price],
                    )?;
                    stats.accommodations += inserted;
                }
            }
        }
    }

    Ok(stats)
}

fn insert_company(tx: &Transaction<'_>, code: &str, name: &str) -> Result<i64> {
    tx.execute(
        "INSERT INTO ferry_companies(code, name) VALUES (?1, ?2)",
        params![code, name],
    )?;
    Ok(tx.last_insert_rowid())
}

fn upsert_port(
    tx: &Transaction<'_>,
    ports: &mut BTreeMap<String, i64>,
    code: &str,
    name: &str,
    stats: &mut ImportStats,
) -> Result<i64> {
    if let Some(id) = ports.get(code) {
        return Ok(*id);
    }
    tx.execute(
        "INSERT INTO ports(code, name) VALUES (?1, ?2)",
        params![code, clean_upper(name)],
    )?;
    let id = tx.last_insert_rowid();
    ports.insert(code.to_string(), id);
    stats.ports += 1;
    Ok(id)
}

/// Port names, company names, and vessel keys are stored uppercased; times
/// and dates pass through untouched.
fn clean_upper(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Splits a `CODE___NAME` feed key; keys without the separator stand in for
/// both halves.
fn split_coded_key(key: &str) -> (String, String) {
    match key.split_once("___") {
        Some((code, name)) => (code.to_string(), name.to_string()),
        None => (key.to_string(), key.to_string()),
    }
}

fn invalid_feed_shape() -> PelagosError {
    PelagosError::InvalidDataset(
        "expected a JSON array of routes or an object with a 'routes' array".to_string(),
    )
}
