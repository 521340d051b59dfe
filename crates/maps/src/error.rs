//! Error taxonomy shared by both servers.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single map operation.
///
/// Every variant corresponds to one kind in [`ErrorKind`]. Errors are never
/// retried or swallowed by the servers; callers decide what to do with them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or out-of-range input, detected before any request is sent.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The query was well formed but the provider had no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// The routing provider reported that no path exists.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// No response arrived within the configured budget.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Non-success status, malformed body, or another provider-side fault.
    #[error("upstream error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

/// Machine-readable error kind, surfaced to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unreachable,
    Timeout,
    Upstream,
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Upstream error for a response body that could not be understood.
    pub fn malformed(context: &str, detail: impl std::fmt::Display) -> Self {
        Self::upstream(None, format!("malformed {context} response: {detail}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::Upstream => "upstream",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(Error::validation("x", "bad").kind(), ErrorKind::Validation);
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Unreachable("x".into()).kind(), ErrorKind::Unreachable);
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(Error::upstream(Some(500), "x").kind(), ErrorKind::Upstream);
    }

    #[test]
    fn display_includes_status_when_known() {
        let err = Error::upstream(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "upstream error (status 502): bad gateway");

        let err = Error::upstream(None, "connection reset");
        assert_eq!(err.to_string(), "upstream error: connection reset");
    }

    #[test]
    fn timeout_display_in_millis() {
        let err = Error::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "request timed out after 1500ms");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
