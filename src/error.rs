//! Error types for the forum client

use std::time::Duration;
use thiserror::Error;

/// Forum client error
#[derive(Debug, Error)]
pub enum ForumError {
    /// Required connection settings were missing when the client was built.
    /// The client can never become ready.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The `api_init` handshake failed or returned an incomplete session.
    /// The client will not retry; build a new one.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A signed call was attempted without an established session
    #[error("Client is not initialized")]
    NotInitialized,

    /// Waiting for the handshake exceeded its deadline
    #[error("Connection timed out after {waited:?}: {reason}")]
    Timeout { waited: Duration, reason: String },

    /// Transport failure or non-200 status
    #[error("No response from forum API: {0}")]
    NoResponse(String),

    /// The API answered with an error code other than the one the action expects
    #[error("Forum returned error code: {code}")]
    Domain { code: String },

    /// `call_method` was invoked without a method name
    #[error("A method name is required")]
    MethodMissing,

    /// A typed parameter struct is missing a required value
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The requested entity was not present in the response
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ForumError {
    /// Domain error code carried by this error, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            ForumError::Domain { code } => Some(code),
            _ => None,
        }
    }
}

/// Result type for forum operations
pub type Result<T> = std::result::Result<T, ForumError>;
