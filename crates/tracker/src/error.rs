use thiserror::Error;
use ticket_info_api::error::ApiError;

#[derive(Error, Debug)]
pub enum TicketError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Ticket source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid ticket ID: {0:?}")]
    InvalidTicketId(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Ticket not found: {0}")]
    NotFound(String),

    #[error("Rate limited after {retries} retries")]
    RateLimitExhausted { retries: usize },

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Tracker command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Failed to parse ticket details: {0}")]
    Parse(String),
}

impl TicketError {
    /// Whether the same request may succeed if tried again later.
    pub fn is_transient(&self) -> bool {
        match self {
            TicketError::RateLimitExhausted { .. } => true,
            TicketError::Server { status, .. } => *status == 0 || *status >= 500,
            _ => false,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            TicketError::Configuration(_) => {
                Some("Review the tracker section of ~/.ticket-info/config.yaml")
            }
            TicketError::Unavailable(_) => {
                Some("Install the tracker CLI or switch to mode: api")
            }
            TicketError::Authentication(_) => {
                Some("Verify the configured email and API token (or JIRA_API_TOKEN)")
            }
            TicketError::Permission(_) => {
                Some("Ask a project administrator for browse permission on the ticket")
            }
            TicketError::NotFound(_) => Some("Check if the ticket ID is correct"),
            TicketError::RateLimitExhausted { .. } => {
                Some("Wait a moment before retrying or reduce request frequency")
            }
            _ => None,
        }
    }
}

impl From<ApiError> for TicketError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::AuthenticationFailed { message } => TicketError::Authentication(message),
            ApiError::PermissionDenied { message } => TicketError::Permission(message),
            ApiError::NotFound { resource, message } => {
                TicketError::NotFound(format!("{resource}: {message}"))
            }
            ApiError::RateLimitExceeded { .. } => TicketError::RateLimitExhausted { retries: 0 },
            ApiError::RateLimitExhausted { retries } => TicketError::RateLimitExhausted { retries },
            ApiError::ServerError { status, message } => TicketError::Server { status, message },
            ApiError::InvalidResponse(message) => TicketError::Parse(message),
            ApiError::InvalidUrl(err) => TicketError::Configuration(format!("invalid base_url: {err}")),
            ApiError::RequestFailed(err) => TicketError::Server {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TicketError>;
