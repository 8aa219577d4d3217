//! Error types for SiteBrief.
//!
//! Library crates use [`SiteBriefError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every variant can be rendered as a structured response body with
//! [`SiteBriefError::to_body`], so callers never receive an opaque message.

use std::path::PathBuf;

use serde_json::{Value, json};

/// Top-level error type for all SiteBrief operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteBriefError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Caller input rejected before any network call (bad URL, empty job id).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTTP client could not be constructed.
    #[error("network error: {0}")]
    Network(String),

    /// An upstream service (crawl or completion) answered with a failure,
    /// timed out, or could not be reached.
    #[error("{service} failed: {message} (status {status}, {attempts} attempt(s))")]
    Upstream {
        service: &'static str,
        message: String,
        status: u16,
        attempts: u32,
        detail: Value,
    },

    /// The completion model returned text that neither parsing nor the
    /// repair pass could turn into a JSON object.
    #[error("malformed model output: {message}")]
    MalformedOutput {
        message: String,
        raw: String,
        repair: Value,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteBriefError>;

impl SiteBriefError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a transport timeout reported by an upstream call.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Upstream { detail, .. } if detail.get("timeout_ms").is_some_and(|v| !v.is_null()))
    }

    /// HTTP status a request/response boundary should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Config { .. } | Self::Network(_) | Self::Io { .. } => 500,
            Self::Upstream { .. } | Self::MalformedOutput { .. } => 502,
        }
    }

    /// Structured response body for this failure.
    pub fn to_body(&self) -> Value {
        match self {
            Self::Config { message } | Self::Validation { message } => json!({
                "status": "failed",
                "error": message,
            }),
            Self::Network(message) => json!({
                "status": "failed",
                "error": message,
            }),
            Self::Upstream {
                service,
                message,
                status,
                attempts,
                detail,
            } => json!({
                "status": "failed",
                "error": message,
                "service": service,
                "upstream_status": status,
                "attempts": attempts,
                "detail": detail,
            }),
            Self::MalformedOutput {
                message,
                raw,
                repair,
            } => json!({
                "status": "failed",
                "error": message,
                "raw": raw,
                "repair": repair,
            }),
            Self::Io { path, source } => json!({
                "status": "failed",
                "error": format!("I/O error at {}", path.display()),
                "detail": source.to_string(),
            }),
        }
    }
}
