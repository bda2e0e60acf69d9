use super::env::{parse_enabled_default_true, read_env_u16, read_env_u32, read_env_u64, read_non_empty_env};

const ENV_LLM_ENABLED: &str = "PELAGOS_LLM_ENABLED";
const ENV_LLM_ENDPOINT: &str = "PELAGOS_LLM_ENDPOINT";
const ENV_LLM_MODEL: &str = "PELAGOS_LLM_MODEL";
const ENV_LLM_TIMEOUT_SECS: &str = "PELAGOS_LLM_TIMEOUT_SECS";
const ENV_LLM_MAX_OUTPUT_TOKENS: &str = "PELAGOS_LLM_MAX_OUTPUT_TOKENS";
const ENV_LLM_TEMPERATURE_MILLI: &str = "PELAGOS_LLM_TEMPERATURE_MILLI";

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_MAX_OUTPUT_TOKENS: u32 = 2_048;
pub const DEFAULT_LLM_TEMPERATURE_MILLI: u16 = 200;

/// Snapshot of the language-model knobs. The endpoint speaks the Ollama /
/// OpenAI-compatible chat shape; when endpoint or model is missing the agent
/// runs on its deterministic tools only.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature_milli: u16,
}

impl LlmConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            enabled: parse_enabled_default_true(std::env::var(ENV_LLM_ENABLED).ok().as_deref()),
            endpoint: read_non_empty_env(ENV_LLM_ENDPOINT),
            model: read_non_empty_env(ENV_LLM_MODEL),
            timeout_secs: read_env_u64(ENV_LLM_TIMEOUT_SECS)
                .filter(|value| *value >= 1)
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            max_output_tokens: read_env_u32(ENV_LLM_MAX_OUTPUT_TOKENS)
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_LLM_MAX_OUTPUT_TOKENS),
            temperature_milli: read_env_u16(ENV_LLM_TEMPERATURE_MILLI)
                .unwrap_or(DEFAULT_LLM_TEMPERATURE_MILLI),
        }
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.enabled && self.endpoint.is_some() && self.model.is_some()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            model: None,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            max_output_tokens: DEFAULT_LLM_MAX_OUTPUT_TOKENS,
            temperature_milli: DEFAULT_LLM_TEMPERATURE_MILLI,
        }
    }
}
