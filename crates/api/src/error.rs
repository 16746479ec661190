use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Resource not found: {resource} ({message})")]
    NotFound { resource: String, message: String },

    /// A single 429 response. Only seen by the retry loop.
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("Rate limited after {retries} retries")]
    RateLimitExhausted { retries: usize },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
