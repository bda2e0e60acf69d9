use serde::{Deserialize, Serialize};

use pelagos_core::models::{AgentKind, DatasetCounts, ImportRunRecord, UserAccount};
use pelagos_core::scheduler::{ImportOutcome, SchedulerStatus};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
}

impl ChatRequest {
    /// Unrecognized hints fall back to automatic intent classification.
    pub fn agent_hint(&self) -> Option<AgentKind> {
        self.agent_type.as_deref().and_then(AgentKind::parse)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub response_html: String,
    pub session_id: String,
    pub agent_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account summary returned on login; never carries credentials.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<UserAccount> for SessionUser {
    fn from(user: UserAccount) -> Self {
        Self {
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatusResponse {
    pub counts: DatasetCounts,
    pub last_import: Option<ImportRunRecord>,
    pub active_chat_sessions: usize,
    pub scheduler_running: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateFileEntry {
    pub name: String,
    pub size_bytes: u64,
    pub modified: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored_as: String,
    pub size_bytes: u64,
    /// Route count when the upload looks like a dataset feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SchedulerActionRequest {
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct SchedulerActionResponse {
    pub action: String,
    /// `false` when the action was a no-op, e.g. starting a running worker.
    pub changed: bool,
    pub status: SchedulerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ImportOutcome>,
}

/// Partial update; omitted fields keep their current values.
#[derive(Debug, Deserialize)]
pub struct SchedulerConfigRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub update_days: Option<Vec<String>>,
    #[serde(default)]
    pub historical_enabled: Option<bool>,
}
