use std::path::PathBuf;

use chrono::{NaiveTime, Weekday};
use serde::Serialize;

use super::env::{parse_enabled_default_true, read_non_empty_env};
use crate::llm_io::parse_env_bool;

const ENV_UPDATE_ENABLED: &str = "PELAGOS_UPDATE_ENABLED";
const ENV_UPDATE_TIME: &str = "PELAGOS_UPDATE_TIME";
const ENV_UPDATE_DAYS: &str = "PELAGOS_UPDATE_DAYS";
const ENV_UPDATE_DIR: &str = "PELAGOS_UPDATE_DIR";
const ENV_HISTORICAL_ENABLED: &str = "PELAGOS_HISTORICAL_ENABLED";

pub const DEFAULT_UPDATE_TIME: &str = "03:00";
pub const DEFAULT_UPDATE_DAYS: &[&str] = &["mon", "wed", "fri"];
pub const DEFAULT_UPDATE_DIR: &str = "gtfs_updates";

/// Scheduled-import knobs. `update_time` is "HH:MM" on the host clock and
/// `update_days` holds short weekday names; both are kept in their wire form
/// and parsed at the due check so the admin surface can echo them unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateConfig {
    pub enabled: bool,
    pub update_time: String,
    pub update_days: Vec<String>,
    pub update_dir: PathBuf,
    pub historical_enabled: bool,
}

impl UpdateConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let update_time = read_non_empty_env(ENV_UPDATE_TIME)
            .filter(|raw| parse_update_time(raw).is_some())
            .unwrap_or_else(|| DEFAULT_UPDATE_TIME.to_string());
        let update_days = read_non_empty_env(ENV_UPDATE_DAYS)
            .map(|raw| normalize_update_days(&raw))
            .filter(|days| !days.is_empty())
            .unwrap_or_else(default_update_days);
        Self {
            enabled: parse_enabled_default_true(
                std::env::var(ENV_UPDATE_ENABLED).ok().as_deref(),
            ),
            update_time,
            update_days,
            update_dir: read_non_empty_env(ENV_UPDATE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPDATE_DIR)),
            historical_enabled: parse_env_bool(
                std::env::var(ENV_HISTORICAL_ENABLED).ok().as_deref(),
            ),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_time: DEFAULT_UPDATE_TIME.to_string(),
            update_days: default_update_days(),
            update_dir: PathBuf::from(DEFAULT_UPDATE_DIR),
            historical_enabled: false,
        }
    }
}

fn default_update_days() -> Vec<String> {
    DEFAULT_UPDATE_DAYS.iter().map(|day| (*day).to_string()).collect()
}

#[must_use]
pub fn parse_update_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

#[must_use]
pub fn parse_update_day(raw: &str) -> Option<Weekday> {
    raw.trim().parse::<Weekday>().ok()
}

/// Keeps recognized weekday tokens in canonical short form, dropping the rest.
#[must_use]
pub fn normalize_update_days(raw: &str) -> Vec<String> {
    let mut days = Vec::new();
    for token in raw.split(',') {
        let Some(day) = parse_update_day(token) else {
            continue;
        };
        let short = short_day_name(day);
        if !days.iter().any(|existing| existing == short) {
            days.push(short.to_string());
        }
    }
    days
}

#[must_use]
pub fn short_day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_time_parses_padded_clock_values() {
        assert!(parse_update_time("03:00").is_some());
        assert!(parse_update_time(" 23:59 ").is_some());
        assert!(parse_update_time("24:00").is_none());
        assert!(parse_update_time("3am").is_none());
    }

    #[test]
    fn update_days_normalize_and_dedupe() {
        let days = normalize_update_days("Monday, wed,MON,fri,nonsense");
        assert_eq!(days, vec!["mon", "wed", "fri"]);
    }

    #[test]
    fn default_config_matches_documented_cadence() {
        let config = UpdateConfig::default();
        assert_eq!(config.update_time, "03:00");
        assert_eq!(config.update_days, vec!["mon", "wed", "fri"]);
        assert!(config.enabled);
        assert!(!config.historical_enabled);
    }
}
