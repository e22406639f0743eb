use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EstateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query failed ({status}): {reason}")]
    QueryFailed { status: u16, reason: String },

    #[error("Aggregation `{0}` missing from search response")]
    MissingAggregation(String),

    #[error("Unexpected shape at {path}: expected {expected}")]
    UnexpectedShape { path: String, expected: &'static str },

    #[error("Missing pipeline value at {path}")]
    MissingPipelineValue { path: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task join error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, EstateError>;
