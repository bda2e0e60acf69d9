use crate::llm_io::parse_env_bool;

mod env;
mod llm;
mod update;

pub use llm::{
    DEFAULT_LLM_MAX_OUTPUT_TOKENS, DEFAULT_LLM_TEMPERATURE_MILLI, DEFAULT_LLM_TIMEOUT_SECS,
    LlmConfig,
};
pub use update::{
    DEFAULT_UPDATE_DAYS, DEFAULT_UPDATE_DIR, DEFAULT_UPDATE_TIME, UpdateConfig,
    normalize_update_days, parse_update_day, parse_update_time, short_day_name,
};

const ENV_SESSION_TTL_SECS: &str = "PELAGOS_SESSION_TTL_SECS";
const ENV_BOOTSTRAP_ADMIN: &str = "PELAGOS_BOOTSTRAP_ADMIN";
const ENV_HISTORY_MAX_MESSAGES: &str = "PELAGOS_HISTORY_MAX_MESSAGES";
const ENV_DB_PATH: &str = "PELAGOS_DB_PATH";
const ENV_WEB_BIND: &str = "PELAGOS_WEB_BIND";

pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_HISTORY_MAX_MESSAGES: usize = 20;
pub const DEFAULT_DB_PATH: &str = "gtfs.db";
pub const DEFAULT_WEB_BIND: &str = "127.0.0.1:5000";

/// Database location, overridable through `PELAGOS_DB_PATH`.
#[must_use]
pub fn resolve_db_path() -> std::path::PathBuf {
    std::env::var(ENV_DB_PATH)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map_or_else(
            || std::path::PathBuf::from(DEFAULT_DB_PATH),
            std::path::PathBuf::from,
        )
}

/// Web listen address, overridable through `PELAGOS_WEB_BIND`.
#[must_use]
pub fn resolve_web_bind() -> String {
    std::env::var(ENV_WEB_BIND)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| DEFAULT_WEB_BIND.to_string())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub update: UpdateConfig,
    pub auth: AuthConfig,
    pub history_max_messages: usize,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            llm: LlmConfig::from_env(),
            update: UpdateConfig::from_env(),
            auth: AuthConfig::from_env(),
            history_max_messages: env::read_env_usize(
                ENV_HISTORY_MAX_MESSAGES,
                DEFAULT_HISTORY_MAX_MESSAGES,
                2,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    pub bootstrap_admin: bool,
}

impl AuthConfig {
    #[must_use]
    fn from_env() -> Self {
        Self {
            session_ttl_secs: std::env::var(ENV_SESSION_TTL_SECS)
                .ok()
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .filter(|value| *value >= 60)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            bootstrap_admin: std::env::var(ENV_BOOTSTRAP_ADMIN)
                .ok()
                .map(|raw| parse_env_bool(Some(raw.as_str())))
                .unwrap_or(true),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            bootstrap_admin: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            update: UpdateConfig::default(),
            auth: AuthConfig::default(),
            history_max_messages: DEFAULT_HISTORY_MAX_MESSAGES,
        }
    }
}
