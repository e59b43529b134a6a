//! Unified error handling for the Rescale SDK
//!
//! Every fallible SDK call returns [`RescaleError`]. Lookups that can
//! legitimately find nothing (`get_latest_status`, `get_newest_by_name`, ...)
//! return `Option` instead of an error.
//!
//! # Example
//!
//! ```rust
//! use rescale::RescaleError;
//!
//! fn describe(err: &RescaleError) -> &'static str {
//!     if err.is_not_found() {
//!         "missing"
//!     } else if err.is_unauthorized() {
//!         "check RESCALE_API_KEY"
//!     } else {
//!         "failed"
//!     }
//! }
//!
//! let err = RescaleError::Http { status: 404, body: "Not found.".to_string() };
//! assert_eq!(describe(&err), "missing");
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for SDK operations
#[derive(Error, Debug)]
pub enum RescaleError {
    /// Profile or credential resolution failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The API answered with a 4xx/5xx status on the final attempt
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request could not be completed at the transport level
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a body that does not match the expected shape
    #[error("Unexpected response: {0}")]
    Protocol(String),

    /// A JSON body could not be decoded into the expected type
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// A relative path could not be joined onto the base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Local file access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A polling loop exceeded its configured timeout
    #[error("Timed out after {timeout:?} waiting for {label}")]
    PollTimeout { label: String, timeout: Duration },
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, RescaleError>;

impl RescaleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status of the final failed response, if there was one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            RescaleError::Http { status, .. } => Some(*status),
            RescaleError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if s >= 500)
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            RescaleError::Request(e) => e.is_timeout(),
            RescaleError::PollTimeout { .. } => true,
            _ => false,
        }
    }
}
