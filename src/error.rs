//! Error types for the Orshot plugin.

use thiserror::Error;

use crate::types::OutputItem;

/// Result type for Orshot operations.
pub type Result<T> = std::result::Result<T, OrshotError>;

/// Errors raised while loading options or rendering templates.
#[derive(Error, Debug)]
pub enum OrshotError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by a host-provided transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Upstream API answered with a non-2xx status.
    ///
    /// `message` is already the user-facing text, e.g.
    /// `API request failed with status 404: template not found`.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status, if any.
        status_text: String,
        /// Derived failure message.
        message: String,
        /// Raw response body as text.
        body: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A render parameter is out of range or malformed.
    #[error("Invalid parameter {field}: {message}")]
    InvalidParameter {
        /// Parameter name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Template list could not be loaded.
    #[error("{0}")]
    OptionLoad(String),
}

impl OrshotError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Upstream HTTP status, if this error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A batch aborted on the item at `item_index`.
///
/// Items rendered before the failure are kept in `completed`.
#[derive(Error, Debug)]
#[error("item {item_index}: {source}")]
pub struct ExecutionError {
    /// Position of the failing input item.
    pub item_index: usize,
    /// Underlying failure.
    #[source]
    pub source: OrshotError,
    /// Output items produced before the failure, in input order.
    pub completed: Vec<OutputItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_message_verbatim() {
        let err = OrshotError::Api {
            status: 404,
            status_text: "Not Found".to_string(),
            message: "API request failed with status 404: template not found".to_string(),
            body: r#"{"error":"template not found"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API request failed with status 404: template not found"
        );
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = OrshotError::invalid_parameter("scale", "must be between 0.1 and 10");
        assert_eq!(
            err.to_string(),
            "Invalid parameter scale: must be between 0.1 and 10"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let err = OrshotError::transport("connection reset");
        assert_eq!(err.to_string(), "Transport error: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_execution_error_carries_index() {
        let err = ExecutionError {
            item_index: 2,
            source: OrshotError::config("boom"),
            completed: Vec::new(),
        };
        assert_eq!(err.to_string(), "item 2: Invalid configuration: boom");
    }
}
