use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::error::{PelagosError, Result};
use crate::models::{DatasetCounts, ImportRunRecord};

mod dataset;
mod historical;
mod migration;
mod users;

pub use dataset::ATHENS_PORT_NAMES;
pub use users::{BOOTSTRAP_ADMIN_PASSWORD, BOOTSTRAP_ADMIN_USERNAME};

/// Upper bound on rows handed to the formatting pass for an agent query.
pub const MAX_RESULT_ROWS: usize = 50;

#[derive(Clone)]
pub struct FerryStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for FerryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FerryStore").finish_non_exhaustive()
    }
}

impl FerryStore {
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("sqlite"))?;
        f(&conn)
    }

    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("sqlite"))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        #[cfg(unix)]
        harden_sqlite_permissions(path)?;
        Ok(store)
    }

    pub fn counts(&self) -> Result<DatasetCounts> {
        self.with_conn(|conn| {
            Ok(DatasetCounts {
                companies: count_table(conn, "ferry_companies")?,
                ports: count_table(conn, "ports")?,
                vessels: count_table(conn, "vessels")?,
                routes: count_table(conn, "ferry_routes")?,
                schedules: count_table(conn, "schedules")?,
                accommodations: count_table(conn, "accommodations")?,
                historical_ranges: count_table(conn, "historical_date_ranges")?,
                users: count_table(conn, "users")?,
            })
        })
    }

    /// Runs an already-guarded SELECT and shapes the rows as JSON objects,
    /// capped at `max_rows`.
    pub fn run_select(&self, sql: &str, max_rows: usize) -> Result<Vec<Map<String, Value>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let column_names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(ToString::to_string)
                .collect();
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                if out.len() >= max_rows {
                    break;
                }
                let mut object = Map::new();
                for (idx, name) in column_names.iter().enumerate() {
                    object.insert(name.clone(), sql_value_to_json(row.get_ref(idx)?));
                }
                out.push(object);
            }
            Ok(out)
        })
    }

    pub fn record_import_start(&self, source: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO import_runs(source, started_at, status) VALUES (?1, ?2, 'running')",
                params![source, Utc::now().to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn record_import_finish(
        &self,
        run_id: i64,
        status: &str,
        detail: Option<&str>,
        routes: usize,
        schedules: usize,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r"
                UPDATE import_runs
                SET finished_at = ?2, status = ?3, detail = ?4, routes = ?5, schedules = ?6
                WHERE id = ?1
                ",
                params![
                    run_id,
                    Utc::now().to_rfc3339(),
                    status,
                    detail,
                    usize_to_i64_saturating(routes),
                    usize_to_i64_saturating(schedules),
                ],
            )?;
            Ok(())
        })
    }

    pub fn last_import_run(&self) -> Result<Option<ImportRunRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    r"
                    SELECT id, source, started_at, finished_at, status, detail, routes, schedules
                    FROM import_runs
                    ORDER BY id DESC
                    LIMIT 1
                    ",
                    [],
                    |row| {
                        Ok(ImportRunRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            started_at: row.get(2)?,
                            finished_at: row.get(3)?,
                            status: row.get(4)?,
                            detail: row.get(5)?,
                            routes: usize::try_from(row.get::<_, i64>(6)?).unwrap_or(0),
                            schedules: usize::try_from(row.get::<_, i64>(7)?).unwrap_or(0),
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }
}

fn count_table(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn sql_value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(raw) => Value::from(raw),
        ValueRef::Real(raw) => serde_json::Number::from_f64(raw)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(raw) => Value::String(String::from_utf8_lossy(raw).into_owned()),
        ValueRef::Blob(raw) => Value::String(format!("<blob {} bytes>", raw.len())),
    }
}

fn usize_to_i64_saturating(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(unix)]
fn harden_sqlite_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for suffix in ["", "-wal", "-shm"] {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        let candidate = PathBuf::from(os);
        if candidate.exists() {
            std::fs::set_permissions(candidate, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests;
