use rusqlite::Connection;

use crate::error::{PelagosError, Result};

use super::FerryStore;

const MIGRATION_SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS ferry_companies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vessels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        vessel_key TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS ferry_routes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        route_id TEXT NOT NULL,
        company_id INTEGER NOT NULL,
        origin_port_id INTEGER NOT NULL,
        destination_port_id INTEGER NOT NULL,
        origin_port_stop INTEGER NOT NULL DEFAULT 0,
        destination_port_stop INTEGER NOT NULL DEFAULT 0,
        departure_time TEXT NOT NULL,
        arrival_time TEXT NOT NULL,
        departure_offset INTEGER NOT NULL DEFAULT 0,
        arrival_offset INTEGER NOT NULL DEFAULT 0,
        duration INTEGER NOT NULL DEFAULT 0,
        UNIQUE (route_id, origin_port_id, destination_port_id),
        FOREIGN KEY (company_id) REFERENCES ferry_companies(id),
        FOREIGN KEY (origin_port_id) REFERENCES ports(id),
        FOREIGN KEY (destination_port_id) REFERENCES ports(id)
    );

    CREATE TABLE IF NOT EXISTS schedules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ferry_route_id INTEGER NOT NULL,
        route_id TEXT NOT NULL,
        schedule_date TEXT NOT NULL,
        vessel_id INTEGER NOT NULL,
        indicative_price INTEGER,
        UNIQUE (ferry_route_id, schedule_date, vessel_id),
        FOREIGN KEY (ferry_route_id) REFERENCES ferry_routes(id) ON DELETE CASCADE,
        FOREIGN KEY (vessel_id) REFERENCES vessels(id)
    );

    CREATE TABLE IF NOT EXISTS accommodations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vessel_id INTEGER NOT NULL,
        ferry_route_id INTEGER NOT NULL,
        route_id TEXT NOT NULL,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        price INTEGER NOT NULL,
        UNIQUE (ferry_route_id, vessel_id, code),
        FOREIGN KEY (ferry_route_id) REFERENCES ferry_routes(id) ON DELETE CASCADE,
        FOREIGN KEY (vessel_id) REFERENCES vessels(id)
    );

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS auth_sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS historical_date_ranges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        origin_code TEXT NOT NULL,
        origin_name TEXT NOT NULL,
        destination_code TEXT NOT NULL,
        destination_name TEXT NOT NULL,
        start_date TEXT,
        end_date TEXT,
        appear_date TEXT
    );

    CREATE TABLE IF NOT EXISTS import_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        status TEXT NOT NULL,
        detail TEXT,
        routes INTEGER NOT NULL DEFAULT 0,
        schedules INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_ferry_routes_origin ON ferry_routes(origin_port_id);
    CREATE INDEX IF NOT EXISTS idx_ferry_routes_destination ON ferry_routes(destination_port_id);
    CREATE INDEX IF NOT EXISTS idx_schedules_date ON schedules(schedule_date);
    CREATE INDEX IF NOT EXISTS idx_schedules_route ON schedules(ferry_route_id);
    CREATE INDEX IF NOT EXISTS idx_accommodations_route_vessel
    ON accommodations(ferry_route_id, vessel_id);
    CREATE INDEX IF NOT EXISTS idx_historical_ports
    ON historical_date_ranges(origin_name, destination_name);
    CREATE INDEX IF NOT EXISTS idx_auth_sessions_expires ON auth_sessions(expires_at);
    CREATE INDEX IF NOT EXISTS idx_import_runs_started_at ON import_runs(started_at DESC);

    CREATE VIEW IF NOT EXISTS route_details AS
    SELECT
        r.id AS ferry_route_id,
        r.route_id AS route_id,
        c.code AS company_code,
        c.name AS company,
        po.code AS origin_port_code,
        po.name AS origin_port_name,
        pd.code AS destination_port_code,
        pd.name AS destination_port_name,
        r.departure_time AS departure_time,
        r.arrival_time AS arrival_time,
        r.departure_offset AS departure_offset,
        r.arrival_offset AS arrival_offset,
        r.duration AS duration
    FROM ferry_routes r
    JOIN ferry_companies c ON c.id = r.company_id
    JOIN ports po ON po.id = r.origin_port_id
    JOIN ports pd ON pd.id = r.destination_port_id;
";

impl FerryStore {
    pub fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("sqlite"))?;
        conn.execute_batch(MIGRATION_SCHEMA_SQL)?;
        ensure_required_column(
            &conn,
            "ferry_routes",
            "duration",
            "unsupported ferry_routes schema: duration is missing; reset the database file",
        )?;
        ensure_required_column(
            &conn,
            "schedules",
            "indicative_price",
            "unsupported schedules schema: indicative_price is missing; reset the database file",
        )?;
        drop(conn);
        Ok(())
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_required_column(
    conn: &Connection,
    table: &str,
    column: &str,
    error_message: &'static str,
) -> Result<()> {
    if has_column(conn, table, column)? {
        Ok(())
    } else {
        Err(PelagosError::Validation(error_message.to_string()))
    }
}
