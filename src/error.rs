//! Error types for quota-pager
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::JsonValue;
use thiserror::Error;

/// The main error type for quota-pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors (retryable)
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Response Errors (not retried)
    // ============================================================================
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to decode page: {message}")]
    Decode { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Scheduling / Pagination Errors
    // ============================================================================
    #[error("Deadline exceeded after {deadline_ms}ms")]
    DeadlineExceeded { deadline_ms: u64 },

    #[error("Pagination exceeded the limit of {max_pages} pages")]
    PaginationLimitExceeded { max_pages: u32 },

    #[error("Pagination aborted after {pages_fetched} page(s): {source}")]
    Incomplete {
        pages_fetched: u32,
        items: Vec<JsonValue>,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Wrap a pagination failure together with the items accumulated so far
    pub fn incomplete(pages_fetched: u32, items: Vec<JsonValue>, source: Error) -> Self {
        Self::Incomplete {
            pages_fetched,
            items,
            source: Box::new(source),
        }
    }

    /// Check if this error means the request never completed.
    ///
    /// Only transport failures are handed to the retry policy; a bad status
    /// or a malformed payload will not improve on a second attempt.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Connection { .. } | Error::Timeout { .. }
        )
    }

    /// The innermost error, looking through `Incomplete` wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Incomplete { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Items accumulated before pagination failed, if any were recorded
    pub fn partial_items(&self) -> Option<&[JsonValue]> {
        match self {
            Error::Incomplete { items, .. } => Some(items),
            _ => None,
        }
    }
}

/// Result type alias for quota-pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
