//! Cloud sync error types.

use thiserror::Error;

/// Result type for cloud sync operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur while pushing local rows to the cloud.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("bearer token missing or empty")]
    AuthRequired,

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push deadline exceeded")]
    Timeout,

    #[error("local read failed: {0}")]
    Read(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CloudError {
    /// Whether re-running the push can plausibly succeed without operator
    /// action. 4xx rejections and configuration drift cannot; transient
    /// network and server failures can.
    pub fn is_retryable(&self) -> bool {
        match self {
            CloudError::ServerError { .. } | CloudError::Http(_) | CloudError::Timeout => true,
            CloudError::Read(_) => true,
            CloudError::AuthRequired
            | CloudError::Rejected { .. }
            | CloudError::Serialization(_)
            | CloudError::Config(_) => false,
        }
    }
}
