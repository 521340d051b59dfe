//! The map assistant: a conversation plus the tool-calling loop.

use crate::model::{Backend, Message, ModelRequest, Role, ToolCall, ToolResult, Usage};
use crate::tools::{ToolError, ToolHost};
use crate::{Error, Result};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are MapAssistant, a helpful assistant specializing in geographic information and routing.

You have six tools:
- forward_geocode: convert an address or place name to coordinates
- reverse_geocode: convert a latitude/longitude to an address
- poi_search: find points of interest near a latitude/longitude
- route: calculate a route between two or more points
- isochrone: calculate the area reachable within a time or distance
- matrix: calculate distances and durations between several points

Geocode place names before routing to them. Route, isochrone and matrix take
coordinates as [longitude, latitude] pairs. Distances are in meters and
durations in seconds; convert them to units people use when you answer.
When a tool reports an error, explain it plainly instead of guessing.";

/// Decides whether a tool call may run. `false` rejects it.
pub type ApprovalHook = Box<dyn Fn(&ToolCall) -> bool + Send + Sync>;

/// The outcome of one user turn.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    /// Tokens spent on this turn across every model call.
    pub usage: Usage,
    /// Names of the tools executed, in order.
    pub tool_calls: Vec<String>,
}

/// A conversation with a model that can call map tools.
pub struct Assistant<B, H> {
    backend: B,
    host: H,
    messages: Vec<Message>,
    max_rounds: usize,
    approval: Option<ApprovalHook>,
    usage: Usage,
}

impl<B: Backend, H: ToolHost> Assistant<B, H> {
    pub fn new(backend: B, host: H) -> Self {
        Self {
            backend,
            host,
            messages: vec![Message::system(DEFAULT_SYSTEM_PROMPT)],
            max_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            approval: None,
            usage: Usage::default(),
        }
    }

    /// Replace the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.messages.retain(|m| m.role != Role::System);
        self.messages.insert(0, Message::system(system));
        self
    }

    /// Model calls allowed per turn before giving up.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Ask `hook` before every tool call.
    pub fn with_approval(
        mut self,
        hook: impl Fn(&ToolCall) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.approval = Some(Box::new(hook));
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Tokens spent since the conversation started.
    pub fn total_usage(&self) -> Usage {
        self.usage
    }

    /// Send a user message and run tools until the model answers.
    ///
    /// On error the conversation is rolled back to before this turn.
    pub async fn chat(&mut self, input: &str) -> Result<Reply> {
        let checkpoint = self.messages.len();
        self.messages.push(Message::user(input));
        let result = self.run_turn().await;
        if result.is_err() {
            self.messages.truncate(checkpoint);
        }
        result
    }

    async fn run_turn(&mut self) -> Result<Reply> {
        let mut usage = Usage::default();
        let mut executed = Vec::new();

        for round in 1..=self.max_rounds {
            let response = self
                .backend
                .call(ModelRequest {
                    messages: &self.messages,
                    tools: self.host.specs(),
                })
                .await?;
            usage += response.usage;
            self.usage += response.usage;

            let calls = response.message.tool_calls();
            self.messages.push(response.message);
            if calls.is_empty() {
                info!(
                    rounds = round,
                    tools = executed.len(),
                    tokens = usage.total(),
                    "turn complete"
                );
                let text = self.messages.last().map(Message::text).unwrap_or_default();
                return Ok(Reply {
                    text,
                    usage,
                    tool_calls: executed,
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_tool(&call).await);
                executed.push(call.name);
            }
            self.messages.push(Message::tool_results(results));
        }

        warn!(max_rounds = self.max_rounds, "tool loop limit reached");
        Err(Error::ToolLoopLimit(self.max_rounds))
    }

    async fn run_tool(&self, call: &ToolCall) -> ToolResult {
        if let Some(approve) = &self.approval {
            if !approve(call) {
                debug!(tool = %call.name, "tool call rejected");
                return ToolResult::Failure {
                    tool_call_id: call.id.clone(),
                    error: ToolError::Rejected(call.name.clone()),
                };
            }
        }

        debug!(tool = %call.name, id = %call.id, "executing tool");
        match self.host.execute(call).await {
            Ok(output) => ToolResult::Success {
                tool_call_id: call.id.clone(),
                output,
            },
            Err(error) => {
                warn!(tool = %call.name, kind = error.kind(), %error, "tool failed");
                ToolResult::Failure {
                    tool_call_id: call.id.clone(),
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelResponse, Part, ToolSpec};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays canned responses and records what it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<Message>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Message>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Backend for Scripted {
        async fn call(
            &self,
            request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
            Ok(ModelResponse {
                message,
                usage: Usage {
                    input_tokens: 100,
                    output_tokens: 10,
                },
            })
        }
    }

    /// Answers every call with a fixed payload and counts executions.
    struct Canned {
        specs: Vec<ToolSpec>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new() -> Self {
            Self {
                specs: vec![ToolSpec {
                    name: "forward_geocode".into(),
                    description: "geocode".into(),
                    schema: json!({"type": "object"}),
                }],
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ToolHost for Canned {
        fn specs(&self) -> &[ToolSpec] {
            &self.specs
        }

        async fn execute(&self, call: &ToolCall) -> std::result::Result<Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match call.name.as_str() {
                "forward_geocode" => Ok(json!({
                    "results": [{"display_name": "Tour Eiffel", "latitude": 48.8584, "longitude": 2.2945}]
                })),
                other => Err(ToolError::NotFound(other.to_string())),
            }
        }
    }

    fn call(id: &str, name: &str) -> Message {
        Message {
            role: Role::Assistant,
            parts: vec![Part::ToolCall(ToolCall {
                id: id.into(),
                name: name.into(),
                input: json!({"query": "Eiffel Tower"}),
            })],
        }
    }

    fn tool_result(messages: &[Message]) -> ToolResult {
        messages
            .iter()
            .rev()
            .flat_map(|m| m.parts.iter())
            .find_map(|p| match p {
                Part::ToolResult(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn plain_answer_without_tools() {
        let backend = Scripted::new(vec![Message::assistant("Hello!")]);
        let mut assistant = Assistant::new(backend, Canned::new());
        let reply = assistant.chat("hi").await.unwrap();
        assert_eq!(reply.text, "Hello!");
        assert!(reply.tool_calls.is_empty());
        assert_eq!(assistant.messages().len(), 3);
    }

    #[tokio::test]
    async fn runs_tool_then_answers() {
        let backend = Scripted::new(vec![
            call("call_1", "forward_geocode"),
            Message::assistant("The Eiffel Tower is at 48.8584, 2.2945."),
        ]);
        let mut assistant = Assistant::new(backend, Canned::new());
        let reply = assistant.chat("Where is the Eiffel Tower?").await.unwrap();

        assert_eq!(reply.text, "The Eiffel Tower is at 48.8584, 2.2945.");
        assert_eq!(reply.tool_calls, ["forward_geocode"]);
        assert_eq!(reply.usage.input_tokens, 200);
        assert_eq!(assistant.host.calls.load(Ordering::SeqCst), 1);

        // Second model call saw the tool result.
        let seen = assistant.backend.seen.lock().unwrap();
        let result = tool_result(&seen[1]);
        assert_eq!(result.tool_call_id(), "call_1");
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn tool_failure_goes_back_to_model() {
        let backend = Scripted::new(vec![
            call("call_1", "teleport"),
            Message::assistant("I can't do that."),
        ]);
        let mut assistant = Assistant::new(backend, Canned::new());
        assistant.chat("teleport me").await.unwrap();

        let seen = assistant.backend.seen.lock().unwrap();
        let result = tool_result(&seen[1]);
        assert!(result.is_error());
        assert!(result.content().contains("unknown_tool"));
    }

    #[tokio::test]
    async fn rejected_calls_are_not_executed() {
        let backend = Scripted::new(vec![
            call("call_1", "forward_geocode"),
            Message::assistant("Okay, I won't look it up."),
        ]);
        let mut assistant = Assistant::new(backend, Canned::new()).with_approval(|_| false);
        assistant.chat("Where is the Eiffel Tower?").await.unwrap();

        assert_eq!(assistant.host.calls.load(Ordering::SeqCst), 0);
        let seen = assistant.backend.seen.lock().unwrap();
        let result = tool_result(&seen[1]);
        assert!(result.content().contains("rejected by user"));
    }

    #[tokio::test]
    async fn stops_at_round_limit_and_rolls_back() {
        let backend = Scripted::new(
            (0..5)
                .map(|i| call(&format!("call_{i}"), "forward_geocode"))
                .collect(),
        );
        let mut assistant = Assistant::new(backend, Canned::new()).with_max_rounds(3);
        let err = assistant.chat("loop forever").await.unwrap_err();

        assert!(matches!(err, Error::ToolLoopLimit(3)));
        assert_eq!(assistant.messages().len(), 1);
        assert_eq!(assistant.total_usage().input_tokens, 300);
    }

    #[tokio::test]
    async fn model_error_rolls_back_turn() {
        let backend = Scripted::new(vec![Message::assistant("first")]);
        let mut assistant = Assistant::new(backend, Canned::new());
        assistant.chat("one").await.unwrap();
        let err = assistant.chat("two").await.unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert_eq!(assistant.messages().len(), 3);
    }

    #[test]
    fn custom_system_prompt_replaces_default() {
        let assistant =
            Assistant::new(Scripted::new(vec![]), Canned::new()).with_system("Be brief.");
        assert_eq!(assistant.messages().len(), 1);
        assert_eq!(assistant.messages()[0].text(), "Be brief.");
    }
}
