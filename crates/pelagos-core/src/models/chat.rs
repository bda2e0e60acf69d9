use serde::{Deserialize, Serialize};

/// UI-selected hint (or classified intent) that biases which prompt template
/// drives SQL generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Route,
    Price,
    Schedule,
    Travel,
}

impl AgentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Price => "price",
            Self::Schedule => "schedule",
            Self::Travel => "travel",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "route" => Some(Self::Route),
            "price" => Some(Self::Price),
            "schedule" => Some(Self::Schedule),
            "travel" => Some(Self::Travel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Final product of the agent pipeline for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub session_id: String,
    pub agent_kind: AgentKind,
    pub text: String,
    pub html: String,
}
