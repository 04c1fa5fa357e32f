use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    HttpStatus {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response format at '{field}': {message}")]
    WireFormat { field: String, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not logged in, call login first")]
    NotAuthenticated,

    #[error("A login attempt is already in progress for this session")]
    LoginInProgress,

    #[error("Session expired, log in again")]
    SessionExpired,

    #[error("School search failed: {0}")]
    SchoolSearch(String),

    #[error("Calendar API error: {0}")]
    Calendar(String),

    #[error("Failed to sync exam '{exam}': {source}")]
    Reconciliation {
        exam: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network timeout")]
    Timeout,
}

impl Error {
    pub(crate) fn wire(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WireFormat {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
