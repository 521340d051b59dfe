//! Tool host trait.

use crate::model::{ToolCall, ToolSpec};
use crate::tools::ToolError;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
/// This is the boundary between the model loop and side effects.
pub trait ToolHost: Send + Sync {
    /// Get available tool specifications.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<Value, ToolError>> + Send;
}

/// Wraps a host so every call is abandoned after `limit`.
#[derive(Debug, Clone)]
pub struct Timed<H> {
    inner: H,
    limit: Duration,
}

impl<H> Timed<H> {
    pub fn new(inner: H, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl<H: ToolHost> ToolHost for Timed<H> {
    fn specs(&self) -> &[ToolSpec] {
        self.inner.specs()
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        tokio::time::timeout(self.limit, self.inner.execute(call))
            .await
            .map_err(|_| ToolError::Timeout(self.limit.as_millis() as u64))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Slow {
        specs: Vec<ToolSpec>,
    }

    impl ToolHost for Slow {
        fn specs(&self) -> &[ToolSpec] {
            &self.specs
        }

        async fn execute(&self, _call: &ToolCall) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn timed_host_gives_up() {
        let host = Timed::new(Slow { specs: Vec::new() }, Duration::from_millis(50));
        let call = ToolCall {
            id: "call_1".into(),
            name: "matrix".into(),
            input: json!({}),
        };
        let err = host.execute(&call).await.unwrap_err();
        assert_eq!(err, ToolError::Timeout(50));
    }
}
