use crate::error_explain::SqlErrorKind;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Unsafe SQL rejected by guard")]
    UnsafeQuery,

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Empty identifier")]
    InvalidIdentifier,

    #[error("{message}")]
    Query { kind: SqlErrorKind, message: String },

    #[error("Delegate unavailable: {0}")]
    DelegateUnavailable(String),

    #[error("Delegate returned an invalid response: {0}")]
    DelegateInvalidResponse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;

/// Structured error surfaced to callers instead of a raw trace.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub category: String,
    pub message: String,
}

impl InsightError {
    pub fn payload(&self) -> ErrorPayload {
        let category = match self {
            InsightError::UnsafeQuery => "unsafe_query".to_string(),
            InsightError::InvalidPlan(_) => "invalid_plan".to_string(),
            InsightError::InvalidIdentifier => "invalid_identifier".to_string(),
            InsightError::Query { kind, .. } => kind.as_str().to_string(),
            InsightError::DelegateUnavailable(_) => "delegate_unavailable".to_string(),
            InsightError::DelegateInvalidResponse(_) => "delegate_invalid_response".to_string(),
            InsightError::Store(_) => "store".to_string(),
            InsightError::Io(_) => "io".to_string(),
            InsightError::Json(_) => "json".to_string(),
        };
        ErrorPayload {
            category,
            message: self.to_string(),
        }
    }
}
