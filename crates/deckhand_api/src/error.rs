//! Error types for the provider API.

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the hosting provider.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("API error {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Rate limited by the provider{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid service id: {0}")]
    InvalidServiceId(String),

    #[error("Invalid environment variable name: {0}")]
    InvalidEnvKey(String),

    #[error("Invalid cron job id: {0}")]
    InvalidCronJobId(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl ApiError {
    /// HTTP status of an upstream rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the provider answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
