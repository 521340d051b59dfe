use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// These are fed back to the model as tool results, never raised to the
/// caller of the assistant loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("rejected by user: {0}")]
    Rejected(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    /// A map operation failed; `kind` is its error kind.
    #[error("{message}")]
    Failed { kind: String, message: String },
}

impl ToolError {
    pub fn kind(&self) -> &str {
        match self {
            Self::NotFound(_) => "unknown_tool",
            Self::InvalidInput(_) => "validation",
            Self::Rejected(_) => "rejected",
            Self::Timeout(_) => "timeout",
            Self::Failed { kind, .. } => kind,
        }
    }

    /// `{"error": {"kind": ..., "message": ...}}`
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<maps::ToolError> for ToolError {
    fn from(err: maps::ToolError) -> Self {
        match err {
            maps::ToolError::UnknownTool(name) => Self::NotFound(name),
            maps::ToolError::Failed(e) if e.kind() == maps::ErrorKind::Validation => {
                Self::InvalidInput(e.to_string())
            }
            other => Self::Failed {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_errors_keep_their_kind() {
        let err: ToolError = maps::ToolError::Failed(maps::Error::Unreachable(
            "Route could not be found".into(),
        ))
        .into();
        assert_eq!(err.kind(), "unreachable");
        assert_eq!(err.to_json()["error"]["kind"], "unreachable");

        let err: ToolError =
            maps::ToolError::Failed(maps::Error::validation("latitude", "out of range")).into();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert_eq!(err.kind(), "validation");

        let err: ToolError = maps::ToolError::UnknownTool("fly".into()).into();
        assert_eq!(err, ToolError::NotFound("fly".into()));
    }

    #[test]
    fn rejection_message() {
        let err = ToolError::Rejected("route".into());
        assert_eq!(err.to_string(), "rejected by user: route");
        assert_eq!(err.to_json()["error"]["kind"], "rejected");
    }
}
