//! Blocking chat client for the agent. The endpoint speaks the Ollama /
//! OpenAI-compatible chat shape; transport failures surface as
//! `LlmUnavailable`, bodies we cannot read as `LlmProtocol`.

use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{PelagosError, Result};
use crate::llm_io::{extract_llm_content, parse_chat_endpoint};
use crate::models::ChatMessage;

#[derive(Debug)]
pub struct LlmClient {
    client: Client,
    endpoint: Url,
    model: String,
    max_output_tokens: u32,
    temperature_milli: u16,
}

impl LlmClient {
    /// Returns `None` when the model is disabled or not configured, which
    /// leaves the agent running on its deterministic tools.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        if !config.active() {
            return Ok(None);
        }
        let raw_endpoint = config.endpoint.as_deref().unwrap_or_default();
        let endpoint =
            parse_chat_endpoint(raw_endpoint, "llm endpoint").map_err(PelagosError::InvalidConfig)?;
        let model = config.model.clone().unwrap_or_default();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PelagosError::LlmUnavailable(format!("client build failed: {err}")))?;
        Ok(Some(Self {
            client,
            endpoint,
            model,
            max_output_tokens: config.max_output_tokens,
            temperature_milli: config.temperature_milli,
        }))
    }

    /// One chat turn: system prompt, prior session history, then the user
    /// message. Returns the assistant text.
    pub fn chat(&self, system: &str, history: &[ChatMessage], user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(json!({"role": "system", "content": system}));
        for message in history {
            messages.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }
        messages.push(json!({"role": "user", "content": user}));

        let payload = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": (f64::from(self.temperature_milli) / 1000.0),
                "num_predict": self.max_output_tokens
            }
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .map_err(|err| PelagosError::LlmUnavailable(format!("request failed: {err}")))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PelagosError::LlmUnavailable(format!(
                "non-success status: {status}"
            )));
        }
        let value = response
            .json::<Value>()
            .map_err(|err| PelagosError::LlmProtocol(format!("invalid json response: {err}")))?;
        extract_llm_content(&value)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| PelagosError::LlmProtocol("empty model reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(endpoint: &str, model: &str) -> LlmConfig {
        LlmConfig {
            enabled: true,
            endpoint: Some(endpoint.to_string()),
            model: Some(model.to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn missing_endpoint_disables_the_client() {
        let client = LlmClient::from_config(&LlmConfig::default()).expect("ok");
        assert!(client.is_none());
    }

    #[test]
    fn disabled_flag_wins_over_configuration() {
        let config = LlmConfig {
            enabled: false,
            ..configured("http://127.0.0.1:11434/api/chat", "test-model")
        };
        assert!(LlmClient::from_config(&config).expect("ok").is_none());
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let err = LlmClient::from_config(&configured("ftp://models.example/x", "m"))
            .expect_err("must fail");
        assert!(matches!(err, PelagosError::InvalidConfig(_)));
    }

    #[test]
    fn valid_configuration_builds_a_client() {
        let client = LlmClient::from_config(&configured("http://127.0.0.1:11434/api/chat", "m"))
            .expect("ok");
        assert!(client.is_some());
    }
}
