//! Error types for the analysis-service client.

use thiserror::Error;

/// Result type alias using the pipette error type.
pub type Result<T> = std::result::Result<T, PipetteError>;

/// Main error type for the analysis-service client.
#[derive(Error, Debug)]
pub enum PipetteError {
    /// Local validation failure (e.g., upload attempted before both files
    /// were selected). No request is sent when this is raised.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The service accepted the request but reported a failure (e.g., `/run`
    /// answered with `success: false`, or a poll observed a failed job).
    #[error("Service reported failure: {0}")]
    Service(String),

    /// The service answered with something the client cannot interpret
    /// (non-success status, unknown job status, unparseable body).
    #[error("Unexpected service response: {0}")]
    MalformedResponse(String),

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipetteError {
    /// True when the failure was raised locally, before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, PipetteError::Validation(_))
    }
}
