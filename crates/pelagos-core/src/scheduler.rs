//! Scheduled dataset refresh.
//!
//! A background worker polls the local clock once a minute and, on the
//! configured days at the configured HH:MM, imports the newest feed file from
//! the update directory. The same import can be triggered immediately through
//! [`UpdateScheduler::run_now`], which the admin surface uses.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{UpdateConfig, parse_update_day, parse_update_time};
use crate::error::{PelagosError, Result};
use crate::importer;
use crate::models::ImportStats;
use crate::store::FerryStore;

const POLL_INTERVAL: Duration = Duration::from_secs(60);
const LAST_RUN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NEXT_RUN_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Result of one import pass over the update directory.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub dataset: PathBuf,
    pub stats: ImportStats,
    pub historical_ranges: Option<usize>,
}

impl ImportOutcome {
    fn summary(&self) -> String {
        let mut summary = format!(
            "ok: {} routes, {} schedules from {}",
            self.stats.routes,
            self.stats.schedules,
            self.dataset.display()
        );
        if let Some(ranges) = self.historical_ranges {
            summary.push_str(&format!(", {ranges} historical ranges"));
        }
        summary
    }
}

/// Snapshot served on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub enabled: bool,
    pub update_time: String,
    pub update_days: Vec<String>,
    pub update_dir: String,
    pub historical_enabled: bool,
    pub last_run: Option<String>,
    pub last_outcome: Option<String>,
    pub next_run: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct RunState {
    last_run: Option<String>,
    last_outcome: Option<String>,
    /// Per-day guard: a date recorded here is not scheduled again.
    last_run_date: Option<NaiveDate>,
}

#[derive(Default)]
struct SchedulerShared {
    running: AtomicBool,
    wake: Condvar,
    wake_guard: Mutex<()>,
    state: Mutex<RunState>,
}

pub struct UpdateScheduler {
    store: FerryStore,
    config: UpdateConfig,
    shared: Arc<SchedulerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateScheduler {
    #[must_use]
    pub fn new(store: FerryStore, config: UpdateConfig) -> Self {
        Self {
            store,
            config,
            shared: Arc::new(SchedulerShared::default()),
            worker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Spawns the polling worker. Returns `Ok(false)` when updates are
    /// disabled or a worker is already running.
    pub fn start(&self) -> Result<bool> {
        if !self.config.enabled {
            info!("scheduled updates disabled; worker not started");
            return Ok(false);
        }
        if parse_update_time(&self.config.update_time).is_none() {
            return Err(PelagosError::InvalidConfig(format!(
                "update time '{}' is not HH:MM",
                self.config.update_time
            )));
        }
        if !self
            .config
            .update_days
            .iter()
            .any(|day| parse_update_day(day).is_some())
        {
            return Err(PelagosError::InvalidConfig(
                "no recognizable update days configured".to_string(),
            ));
        }

        let mut worker = self
            .worker
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("scheduler worker"))?;
        if worker.is_some() {
            warn!("update scheduler already running");
            return Ok(false);
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let store = self.store.clone();
        let config = self.config.clone();
        let shared = Arc::clone(&self.shared);
        *worker = Some(
            std::thread::Builder::new()
                .name("pelagos-update".to_string())
                .spawn(move || worker_loop(&store, &config, &shared))?,
        );
        info!(
            time = %self.config.update_time,
            days = ?self.config.update_days,
            dir = %self.config.update_dir.display(),
            "update scheduler started"
        );
        Ok(true)
    }

    /// Stops the worker and joins it. Returns `Ok(false)` when no worker was
    /// running.
    pub fn stop(&self) -> Result<bool> {
        let handle = {
            let mut worker = self
                .worker
                .lock()
                .map_err(|_| PelagosError::mutex_poisoned("scheduler worker"))?;
            worker.take()
        };
        let Some(handle) = handle else {
            return Ok(false);
        };
        self.shared.running.store(false, Ordering::SeqCst);
        {
            // Taking the wake guard makes sure the worker is either before its
            // running check or parked in the wait, so the notify cannot be lost.
            let _guard = self
                .shared
                .wake_guard
                .lock()
                .map_err(|_| PelagosError::mutex_poisoned("scheduler wake"))?;
            self.shared.wake.notify_all();
        }
        if handle.join().is_err() {
            warn!("update scheduler worker panicked");
        }
        info!("update scheduler stopped");
        Ok(true)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Runs the import immediately, outside the schedule. The run still counts
    /// against the per-day guard so the next scheduled slot is skipped.
    pub fn run_now(&self) -> Result<ImportOutcome> {
        run_import(&self.store, &self.config, &self.shared.state)
    }

    pub fn status(&self) -> Result<SchedulerStatus> {
        let state = self
            .shared
            .state
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("scheduler state"))?;
        let next_run = if self.config.enabled {
            next_run_after(&self.config, Local::now().naive_local(), state.last_run_date)
                .map(|when| when.format(NEXT_RUN_FORMAT).to_string())
        } else {
            None
        };
        Ok(SchedulerStatus {
            running: self.is_running(),
            enabled: self.config.enabled,
            update_time: self.config.update_time.clone(),
            update_days: self.config.update_days.clone(),
            update_dir: self.config.update_dir.display().to_string(),
            historical_enabled: self.config.historical_enabled,
            last_run: state.last_run.clone(),
            last_outcome: state.last_outcome.clone(),
            next_run,
        })
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            let _unused = self.stop();
        }
    }
}

fn worker_loop(store: &FerryStore, config: &UpdateConfig, shared: &SchedulerShared) {
    while shared.running.load(Ordering::SeqCst) {
        worker_tick(store, config, &shared.state);
        let Ok(guard) = shared.wake_guard.lock() else {
            warn!("scheduler wake lock poisoned; stopping worker");
            break;
        };
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        if shared.wake.wait_timeout(guard, POLL_INTERVAL).is_err() {
            warn!("scheduler wake lock poisoned; stopping worker");
            break;
        }
    }
}

fn worker_tick(store: &FerryStore, config: &UpdateConfig, state: &Mutex<RunState>) {
    let last_run_date = match state.lock() {
        Ok(state) => state.last_run_date,
        Err(_) => {
            warn!("scheduler state lock poisoned; skipping tick");
            return;
        }
    };
    if !due_now(config, Local::now().naive_local(), last_run_date) {
        return;
    }
    info!(time = %config.update_time, "scheduled update due");
    match run_import(store, config, state) {
        Ok(outcome) => info!(
            dataset = %outcome.dataset.display(),
            routes = outcome.stats.routes,
            schedules = outcome.stats.schedules,
            "scheduled update finished"
        ),
        Err(err) => warn!(error = %err, "scheduled update failed"),
    }
}

/// Due on a configured day, in the configured minute, at most once per day.
fn due_now(config: &UpdateConfig, now: NaiveDateTime, last_run_date: Option<NaiveDate>) -> bool {
    if !config.enabled || last_run_date == Some(now.date()) {
        return false;
    }
    let Some(scheduled) = parse_update_time(&config.update_time) else {
        return false;
    };
    let day_matches = config
        .update_days
        .iter()
        .filter_map(|day| parse_update_day(day))
        .any(|day| day == now.weekday());
    day_matches
        && now.time().hour() == scheduled.hour()
        && now.time().minute() == scheduled.minute()
}

/// First scheduled slot strictly after `after`, skipping the day the guard
/// already covers.
fn next_run_after(
    config: &UpdateConfig,
    after: NaiveDateTime,
    already_ran: Option<NaiveDate>,
) -> Option<NaiveDateTime> {
    let scheduled = parse_update_time(&config.update_time)?;
    for offset in 0..=7u64 {
        let Some(date) = after.date().checked_add_days(Days::new(offset)) else {
            continue;
        };
        if already_ran == Some(date) {
            continue;
        }
        let day_matches = config
            .update_days
            .iter()
            .filter_map(|day| parse_update_day(day))
            .any(|day| day == date.weekday());
        if !day_matches {
            continue;
        }
        let candidate = date.and_time(scheduled);
        if candidate > after {
            return Some(candidate);
        }
    }
    None
}

fn run_import(
    store: &FerryStore,
    config: &UpdateConfig,
    state: &Mutex<RunState>,
) -> Result<ImportOutcome> {
    let result = perform_import(store, config);
    let now = Local::now();
    let mut state = state
        .lock()
        .map_err(|_| PelagosError::mutex_poisoned("scheduler state"))?;
    state.last_run = Some(now.format(LAST_RUN_FORMAT).to_string());
    state.last_run_date = Some(now.date_naive());
    state.last_outcome = Some(match &result {
        Ok(outcome) => outcome.summary(),
        Err(err) => format!("failed: {err}"),
    });
    drop(state);
    result
}

fn perform_import(store: &FerryStore, config: &UpdateConfig) -> Result<ImportOutcome> {
    let dataset = newest_json(&config.update_dir, false)?.ok_or_else(|| {
        PelagosError::NotFound(format!(
            "no dataset file in {}",
            config.update_dir.display()
        ))
    })?;
    let stats = importer::import_dataset_file(store, &dataset)?;

    let mut historical_ranges = None;
    if config.historical_enabled {
        match newest_json(&config.update_dir, true)? {
            Some(path) => {
                historical_ranges = Some(importer::import_historical_file(store, &path)?);
            }
            None => info!(
                dir = %config.update_dir.display(),
                "no historical file found; skipping"
            ),
        }
    }
    Ok(ImportOutcome {
        dataset,
        stats,
        historical_ranges,
    })
}

/// Newest `.json` file in `dir` by modification time, file name as tie break.
/// Historical files carry "historical" in their name and form a separate
/// family so a fresh `historical_data.json` is never imported as the dataset.
/// A directory that does not exist yet simply has no files.
fn newest_json(dir: &Path, historical: bool) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if !metadata.is_file() || !is_json_file(&path) || is_historical_name(&path) != historical {
            continue;
        }
        let modified = metadata.modified()?;
        let newer = match &newest {
            None => true,
            Some((best_time, best_path)) => {
                modified > *best_time || (modified == *best_time && path > *best_path)
            }
        };
        if newer {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_historical_name(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|name| name.contains("historical"))
}
