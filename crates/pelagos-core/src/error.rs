use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PelagosError>;

#[derive(Debug, Error)]
pub enum PelagosError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("path traversal is not allowed: {0}")]
    PathTraversal(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("language model unavailable: {0}")]
    LlmUnavailable(String),

    #[error("language model protocol error: {0}")]
    LlmProtocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PelagosError {
    #[must_use]
    pub fn mutex_poisoned(label: &str) -> Self {
        Self::Internal(format!("{label} lock poisoned"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::PathTraversal(_) => "PATH_TRAVERSAL",
            Self::Conflict(_) => "CONFLICT",
            Self::QueryRejected(_) => "QUERY_REJECTED",
            Self::InvalidDataset(_) => "INVALID_DATASET",
            Self::LlmUnavailable(_) => "LLM_UNAVAILABLE",
            Self::LlmProtocol(_) => "LLM_PROTOCOL",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_payload(&self, operation: impl Into<String>, uri: Option<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            uri,
            details: None,
        }
    }
}
