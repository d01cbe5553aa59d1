use thiserror::Error;

use crate::movies::DataError;

/// Error types that can occur while running an assistant turn.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the model provider
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// A movie lookup failed; the turn is aborted
    #[error("Data function `{function}` failed: {source}")]
    DataFunction {
        function: String,
        #[source]
        source: DataError,
    },
    /// The reply sink refused output
    #[error("Output error: {0}")]
    OutputError(String),
    /// No conversation is registered under the session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Converts reqwest HTTP errors into AssistantErrors
impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}
