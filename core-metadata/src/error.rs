use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Unsupported format {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Write denied for {path}: {reason}")]
    WriteDenied { path: PathBuf, reason: String },

    #[error("Missing artist or title: {0}")]
    MissingIdentity(PathBuf),

    #[error("{provider} error: {message}")]
    ProviderError { provider: String, message: String },

    /// The provider's `rate_limited` answer. Triggers backoff inside a
    /// lookup; once retries run out it surfaces as [`LookupStatus::Error`].
    ///
    /// [`LookupStatus::Error`]: crate::models::LookupStatus::Error
    #[error("Rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("{provider} rejected the credentials: {message}")]
    AuthFailure { provider: String, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Whether another attempt at the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            MetadataError::NetworkError(_)
            | MetadataError::RateLimited { .. }
            | MetadataError::JsonParse(_) => true,
            MetadataError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure means a provider's credentials are unusable
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, MetadataError::AuthFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
