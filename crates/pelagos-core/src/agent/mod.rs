//! The question-answering agent: intent triage, optional model-driven SQL
//! generation with a read-only guard, deterministic tool fallbacks, and
//! per-session chat history.

mod guard;
mod intent;
mod llm;
mod parse;
mod prompt;

pub use intent::classify;
pub use llm::LlmClient;
pub use parse::LlmReply;

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{PelagosError, Result};
use crate::formatter;
use crate::models::{AgentAnswer, AgentKind, ChatMessage};
use crate::store::{FerryStore, MAX_RESULT_ROWS};
use crate::tools;

/// Columns never shown to the traveller, even in the deterministic row
/// rendering.
const HIDDEN_COLUMNS: [&str; 3] = ["id", "route_id", "ferry_route_id"];

pub struct FerryAgent {
    store: FerryStore,
    llm: Option<LlmClient>,
    history: Mutex<HashMap<String, Vec<ChatMessage>>>,
    history_limit: usize,
}

impl FerryAgent {
    pub fn new(store: FerryStore, config: &AppConfig) -> Result<Self> {
        let llm = LlmClient::from_config(&config.llm)?;
        if llm.is_none() {
            info!("language model not configured; running deterministic tools only");
        }
        Ok(Self {
            store,
            llm,
            history: Mutex::new(HashMap::new()),
            history_limit: config.history_max_messages,
        })
    }

    /// Answers one question. A missing session id starts a new session; a
    /// hint pins the specialist, otherwise the question is classified.
    pub fn answer(
        &self,
        query: &str,
        session_id: Option<&str>,
        hint: Option<AgentKind>,
    ) -> Result<AgentAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PelagosError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let kind = hint.unwrap_or_else(|| intent::classify(query));
        info!(session = %session_id, agent = kind.as_str(), "answering question");

        let text = self.answer_text(kind, query, &session_id)?;
        let html = formatter::render_answer_html(&text);
        self.remember(&session_id, query, &text)?;
        Ok(AgentAnswer {
            session_id,
            agent_kind: kind,
            text,
            html,
        })
    }

    /// Number of sessions with in-memory history.
    pub fn active_sessions(&self) -> Result<usize> {
        let history = self
            .history
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("agent history"))?;
        Ok(history.len())
    }

    fn answer_text(&self, kind: AgentKind, query: &str, session_id: &str) -> Result<String> {
        if let Some(answer) = tools::try_fast_path(&self.store, kind, query)? {
            return Ok(answer);
        }
        if let Some(llm) = &self.llm {
            match self.model_answer(llm, kind, query, session_id) {
                Ok(answer) => return Ok(answer),
                Err(err) => {
                    warn!(error = %err, agent = kind.as_str(), "model pipeline failed, using tools");
                }
            }
        }
        tools::deterministic_answer(&self.store, kind, query)
    }

    fn model_answer(
        &self,
        llm: &LlmClient,
        kind: AgentKind,
        query: &str,
        session_id: &str,
    ) -> Result<String> {
        let history = self.history_snapshot(session_id)?;
        let reply = llm.chat(&prompt::sql_system_prompt(kind), &history, query)?;
        let sql = match parse::parse_reply(&reply)
            .ok_or_else(|| PelagosError::LlmProtocol("empty model reply".to_string()))?
        {
            LlmReply::Answer(answer) => return Ok(answer),
            LlmReply::Sql(sql) => guard::ensure_read_only(&sql)?,
        };

        info!(agent = kind.as_str(), "running generated query");
        let rows = self.store.run_select(&sql, MAX_RESULT_ROWS)?;
        if rows.is_empty() {
            if let (Some(origin), Some(destination)) = parse::extract_like_ports(&sql) {
                return tools::no_current_routes_answer(&self.store, &origin, &destination);
            }
            return Ok(
                "I couldn't find anything matching that in the current ferry schedules."
                    .to_string(),
            );
        }

        let rows_json = serde_json::to_string_pretty(&rows)?;
        let format_user = prompt::format_user_prompt(query, &rows_json);
        match llm.chat(&prompt::format_system_prompt(kind), &[], &format_user) {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!(error = %err, "formatting pass failed, rendering rows directly");
                Ok(render_rows_plain(&rows))
            }
        }
    }

    fn history_snapshot(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let history = self
            .history
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("agent history"))?;
        Ok(history.get(session_id).cloned().unwrap_or_default())
    }

    fn remember(&self, session_id: &str, query: &str, answer: &str) -> Result<()> {
        let mut history = self
            .history
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("agent history"))?;
        let entry = history.entry(session_id.to_string()).or_default();
        entry.push(ChatMessage::user(query));
        entry.push(ChatMessage::assistant(answer));
        let excess = entry.len().saturating_sub(self.history_limit);
        if excess > 0 {
            entry.drain(..excess);
        }
        Ok(())
    }
}

/// Renders result rows as numbered entries when the formatting pass is not
/// available. Internal identifier columns stay hidden.
fn render_rows_plain(rows: &[Map<String, Value>]) -> String {
    let mut out = String::from("Here is what I found:\n\n");
    for (i, row) in rows.iter().enumerate() {
        let origin = row.get("origin_port_name").and_then(Value::as_str);
        let destination = row.get("destination_port_name").and_then(Value::as_str);
        match (origin, destination) {
            (Some(origin), Some(destination)) => {
                out.push_str(&format!("{}. {origin} to {destination}\n", i + 1));
            }
            _ => out.push_str(&format!("{}. Result\n", i + 1)),
        }
        for (key, value) in row {
            if HIDDEN_COLUMNS.contains(&key.as_str())
                || key.ends_with("_id")
                || key == "origin_port_name"
                || key == "destination_port_name"
            {
                continue;
            }
            let rendered = render_value(key, value);
            if rendered.is_empty() {
                continue;
            }
            out.push_str(&format!("   {}: {rendered}\n", column_label(key)));
        }
        out.push('\n');
    }
    out
}

fn column_label(key: &str) -> String {
    match key {
        "company" => "Company".to_string(),
        "departure_time" => "Departure".to_string(),
        "arrival_time" => "Arrival".to_string(),
        "duration" => "Duration".to_string(),
        "indicative_price" | "price" => "Price".to_string(),
        "schedule_date" => "Date".to_string(),
        other => {
            let mut label = other.replace('_', " ");
            if let Some(first) = label.get_mut(..1) {
                first.make_ascii_uppercase();
            }
            label
        }
    }
}

fn render_value(key: &str, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                if key.contains("price") {
                    return formatter::format_euros(n);
                }
                if key == "duration" {
                    return formatter::format_duration(n);
                }
            }
            number.to_string()
        }
        other => other.to_string(),
    }
}
