use crate::types::variable::Variable;
use polars::error::PolarsError;
use thiserror::Error;

/// How the retry loop treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad status or connection trouble; retried for the full budget.
    Transient,
    /// The server answered but the payload had an unexpected shape; retried once.
    Malformed,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to read response body from {0}")]
    BodyRead(String, #[source] reqwest::Error),

    #[error("Malformed {variable} payload: {reason}")]
    MalformedPayload { variable: Variable, reason: String },

    #[error("Failed to parse JSON payload")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse reported timestamp '{0}'")]
    TimestampParse(String, #[source] chrono::ParseError),

    #[error("Failed to build readings table: {0}")]
    Polars(#[from] PolarsError),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::ClientBuild(_)
            | FetchError::NetworkRequest(..)
            | FetchError::HttpStatus { .. }
            | FetchError::BodyRead(..) => FailureKind::Transient,
            FetchError::MalformedPayload { .. }
            | FetchError::JsonParse(_)
            | FetchError::TimestampParse(..)
            | FetchError::Polars(_) => FailureKind::Malformed,
        }
    }
}
