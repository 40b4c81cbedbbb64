//! Error types for the ACME DNS bridge
//!
//! This module defines all error types used throughout the crate, and the
//! wire-level [`ErrorKind`] taxonomy reported in acknowledgments.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ACME DNS bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Action other than add/remove
    #[error("Unsupported action: {0}")]
    InvalidAction(String),

    /// No provider zone matches any suffix of the record name
    #[error("No DNS zone found for {fqdn}")]
    ZoneNotFound {
        /// The record name that could not be resolved
        fqdn: String,
    },

    /// Creating a TXT record failed
    #[error("Failed to add TXT record {name}: {message}")]
    AddFailed {
        /// Record name
        name: String,
        /// Underlying provider message
        message: String,
    },

    /// Deleting a TXT record failed
    #[error("Failed to remove TXT record {name}: {message}")]
    RemoveFailed {
        /// Record name
        name: String,
        /// Underlying provider message
        message: String,
    },

    /// Network-level failure talking to the provider
    #[error("Transport error ({provider}): {message}")]
    Transport {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider-reported business error (non-success envelope)
    #[error("Provider error ({provider}): {}", format_provider_message(.code, .message))]
    Provider {
        /// Provider name
        provider: String,
        /// Provider error code, when the provider reported one
        code: Option<i64>,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (transport glue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn format_provider_message(code: &Option<i64>, message: &str) -> String {
    match code {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    }
}

/// Error taxonomy reported in acknowledgments (`error.type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidAction,
    ZoneNotFound,
    AddFailed,
    RemoveFailed,
    TransportError,
}

impl ErrorKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidAction => "invalid_action",
            ErrorKind::ZoneNotFound => "zone_not_found",
            ErrorKind::AddFailed => "add_failed",
            ErrorKind::RemoveFailed => "remove_failed",
            ErrorKind::TransportError => "transport_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an invalid action error
    pub fn invalid_action(action: impl Into<String>) -> Self {
        Self::InvalidAction(action.into())
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(fqdn: impl Into<String>) -> Self {
        Self::ZoneNotFound { fqdn: fqdn.into() }
    }

    /// Create an add failure
    pub fn add_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AddFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a remove failure
    pub fn remove_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoveFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(
        provider: impl Into<String>,
        code: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map this error onto the acknowledgment taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) | Error::Config(_) | Error::Json(_) => {
                ErrorKind::InvalidRequest
            }
            Error::InvalidAction(_) => ErrorKind::InvalidAction,
            Error::ZoneNotFound { .. } => ErrorKind::ZoneNotFound,
            Error::AddFailed { .. } => ErrorKind::AddFailed,
            Error::RemoveFailed { .. } => ErrorKind::RemoveFailed,
            Error::Transport { .. }
            | Error::Authentication(_)
            | Error::RateLimited(_)
            | Error::Provider { .. }
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::TransportError,
        }
    }

    /// Fold this error into an `add_failed` for `name`, keeping the original text
    ///
    /// An existing add failure keeps its message and is re-labelled with `name`.
    pub fn into_add_failed(self, name: &str) -> Self {
        match self {
            Error::AddFailed { message, .. } => Error::add_failed(name, message),
            other => Error::add_failed(name, other.to_string()),
        }
    }

    /// Fold this error into a `remove_failed` for `name`, keeping the original text
    ///
    /// An existing remove failure keeps its message and is re-labelled with `name`.
    pub fn into_remove_failed(self, name: &str) -> Self {
        match self {
            Error::RemoveFailed { message, .. } => Error::remove_failed(name, message),
            other => Error::remove_failed(name, other.to_string()),
        }
    }

    /// Message reported to the requester
    ///
    /// Add/remove failures report the underlying provider message rather
    /// than the wrapped display string.
    pub fn report_message(&self) -> String {
        match self {
            Error::AddFailed { message, .. } | Error::RemoveFailed { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
