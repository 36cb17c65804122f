pub mod tools;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::console::Console;
use crate::error::TurnError;
use crate::events::ChatEvent;
use crate::llm::{ChatModel, DialogueMessage, LLMResponse, ToolCallRequest};
use tools::ToolCatalog;

/// Upper bound of model round trips for one reply.
pub const MAX_HOPS: usize = 3;

/// Reply used when the model answers with empty content.
pub const FALLBACK_REPLY: &str = "I'm here if anyone needs help!";

/// Audit entry for one executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocationRecord {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arguments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub invocations: Vec<ToolInvocationRecord>,
    pub total_tokens: u64,
    pub hops: usize,
}

enum TurnState {
    Requesting,
    AwaitingModel(LLMResponse),
    ExecutingTools {
        content: String,
        calls: Vec<ToolCallRequest>,
    },
    Done(String),
    Failed(TurnError),
}

/// Drives the exchange with the model for a single chat event.
pub struct Agent<'a> {
    model: &'a dyn ChatModel,
    console: &'a dyn Console,
    system_prompt: &'a str,
}

impl<'a> Agent<'a> {
    pub fn new(model: &'a dyn ChatModel, console: &'a dyn Console, system_prompt: &'a str) -> Self {
        Self {
            model,
            console,
            system_prompt,
        }
    }

    /// Runs the tool loop until the model answers in plain text.
    ///
    /// Tool failures are reported back to the model and do not end the turn.
    /// The turn fails when the model errors, asks only for unknown tools, or
    /// still wants tools after [`MAX_HOPS`] round trips.
    pub async fn respond(
        &self,
        event: &ChatEvent,
        prompt: &str,
        catalog: &ToolCatalog,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        let mut transcript = vec![
            DialogueMessage::system(self.system_prompt),
            DialogueMessage::user(format!("Player {} says: {}", event.player, prompt)),
        ];
        let mut invocations = Vec::new();
        let mut total_tokens = 0;
        let mut hops = 0;
        let mut state = TurnState::Requesting;

        loop {
            state = match state {
                TurnState::Requesting if hops == MAX_HOPS => {
                    TurnState::Failed(TurnError::HopLimit(MAX_HOPS))
                }
                TurnState::Requesting => {
                    hops += 1;
                    let request = self.model.completion(&transcript, catalog.definitions());
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => TurnState::Failed(TurnError::Cancelled),
                        response = request => match response {
                            Ok(response) => TurnState::AwaitingModel(response),
                            Err(e) => TurnState::Failed(e.into()),
                        },
                    }
                }
                TurnState::AwaitingModel(response) => {
                    total_tokens += response.total_tokens;
                    if response.tool_calls.is_empty() || catalog.is_empty() {
                        TurnState::Done(response.content)
                    } else if response
                        .tool_calls
                        .iter()
                        .all(|call| catalog.lookup(&call.name).is_none())
                    {
                        let names = response.tool_calls.into_iter().map(|c| c.name).collect();
                        TurnState::Failed(TurnError::Unroutable(names))
                    } else {
                        TurnState::ExecutingTools {
                            content: response.content,
                            calls: response.tool_calls,
                        }
                    }
                }
                TurnState::ExecutingTools { content, calls } => {
                    transcript.push(DialogueMessage::assistant(content, calls.clone()));
                    for call in &calls {
                        let result = self.run_tool(catalog, event, call, &mut invocations).await;
                        transcript.push(DialogueMessage::tool_result(call, result));
                    }
                    TurnState::Requesting
                }
                TurnState::Done(content) => {
                    let text = match content.trim() {
                        "" => FALLBACK_REPLY.to_string(),
                        trimmed => trimmed.to_string(),
                    };
                    info!(
                        player = %event.player,
                        hops,
                        tools = invocations.len(),
                        "Tokens used: {}",
                        total_tokens
                    );
                    return Ok(TurnReply {
                        text,
                        invocations,
                        total_tokens,
                        hops,
                    });
                }
                TurnState::Failed(err) => {
                    warn!(
                        player = %event.player,
                        hops,
                        tools = invocations.len(),
                        "Turn failed after using {} tokens: {}",
                        total_tokens,
                        err
                    );
                    return Err(err);
                }
            };
        }
    }

    /// Executes one call and returns the text fed back to the model.
    async fn run_tool(
        &self,
        catalog: &ToolCatalog,
        event: &ChatEvent,
        call: &ToolCallRequest,
        invocations: &mut Vec<ToolInvocationRecord>,
    ) -> String {
        let Some(kind) = catalog.lookup(&call.name) else {
            warn!("Model requested unavailable tool {}", call.name);
            return format!("error: tool {} is not available", call.name);
        };
        let mut record = ToolInvocationRecord {
            name: call.name.clone(),
            arguments: call.arguments.trim().to_string(),
            output: None,
            error: None,
        };
        let text = match catalog.execute(kind, self.console, event, call).await {
            Ok(output) => {
                record.output = Some(output.clone());
                output
            }
            Err(e) => {
                warn!(tool = %call.name, "Tool call failed: {}", e);
                record.error = Some(e.to_string());
                format!("error: {e}")
            }
        };
        invocations.push(record);
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::ToolDefinition;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records each transcript it was sent.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<LLMResponse, LlmError>>>,
        repeat_tool_call: Option<ToolCallRequest>,
        pub requests: Mutex<Vec<Vec<DialogueMessage>>>,
        pub offered_tools: Mutex<Vec<usize>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<LLMResponse, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        /// A model that asks for the same tool call forever.
        pub fn always_calling(call: ToolCallRequest) -> Self {
            Self {
                repeat_tool_call: Some(call),
                ..Self::default()
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    pub fn text(content: &str) -> Result<LLMResponse, LlmError> {
        Ok(LLMResponse {
            content: content.to_string(),
            tool_calls: Vec::new(),
            total_tokens: 10,
        })
    }

    pub fn tool_calls(calls: &[(&str, &str)]) -> Result<LLMResponse, LlmError> {
        Ok(LLMResponse {
            content: String::new(),
            tool_calls: calls
                .iter()
                .enumerate()
                .map(|(i, (name, arguments))| ToolCallRequest {
                    id: format!("call_{i}"),
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                })
                .collect(),
            total_tokens: 20,
        })
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn completion(
            &self,
            messages: &[DialogueMessage],
            tools: &[ToolDefinition],
        ) -> Result<LLMResponse, LlmError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.offered_tools.lock().unwrap().push(tools.len());
            if let Some(call) = &self.repeat_tool_call {
                return Ok(LLMResponse {
                    content: String::new(),
                    tool_calls: vec![call.clone()],
                    total_tokens: 5,
                });
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::NoChoices))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedModel, text, tool_calls};
    use super::tools::ToolSettings;
    use super::*;
    use crate::console::testing::RecordingConsole;
    use crate::error::LlmError;
    use crate::llm::Role;

    fn catalog() -> ToolCatalog {
        ToolCatalog::build(&ToolSettings {
            enable_tool_use: true,
            enable_world_tools: true,
            enable_easter_eggs: true,
        })
    }

    fn event() -> ChatEvent {
        ChatEvent::new("Steve", "make it day please")
    }

    #[tokio::test]
    async fn test_plain_answer_is_trimmed() {
        let model = ScriptedModel::new(vec![text("  Torches everywhere!  ")]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "be kind");

        let reply = agent
            .respond(&event(), "make it day please", &catalog(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.text, "Torches everywhere!");
        assert_eq!(reply.hops, 1);
        assert!(reply.invocations.is_empty());

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0][0], DialogueMessage::system("be kind"));
        assert_eq!(
            requests[0][1],
            DialogueMessage::user("Player Steve says: make it day please")
        );
        assert_eq!(model.offered_tools.lock().unwrap()[0], 12);
    }

    #[tokio::test]
    async fn test_empty_answer_uses_fallback() {
        let model = ScriptedModel::new(vec![text("   ")]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let reply = agent
            .respond(&event(), "hi", &catalog(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_tool_round_trip_feeds_results_back() {
        let model = ScriptedModel::new(vec![
            tool_calls(&[("set_time", r#"{"value":"day"}"#), ("set_weather", r#"{"state":"snow"}"#)]),
            text("Sunrise delivered!"),
        ]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");

        let reply = agent
            .respond(&event(), "make it day please", &catalog(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.text, "Sunrise delivered!");
        assert_eq!(reply.hops, 2);
        assert_eq!(reply.total_tokens, 30);
        assert_eq!(console.commands(), vec!["time set day"]);

        assert_eq!(reply.invocations.len(), 2);
        assert_eq!(reply.invocations[0].output.as_deref(), Some("World time set to day."));
        assert_eq!(
            reply.invocations[1].error.as_deref(),
            Some("unsupported weather value: snow")
        );

        let requests = model.requests.lock().unwrap();
        let second = &requests[1];
        assert_eq!(second.len(), 5);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].tool_calls.len(), 2);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_0"));
        assert_eq!(second[3].content, "World time set to day.");
        assert_eq!(second[4].content, "error: unsupported weather value: snow");
    }

    #[tokio::test]
    async fn test_unknown_tools_only_is_a_routing_failure() {
        let model = ScriptedModel::new(vec![tool_calls(&[("fly", "{}")])]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let err = agent
            .respond(&event(), "let me fly", &catalog(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Unroutable(names) if names == vec!["fly".to_string()]));
        assert!(console.commands().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_next_to_known_one_gets_error_result() {
        let model = ScriptedModel::new(vec![
            tool_calls(&[("fly", "{}"), ("glowing_aura", "{}")]),
            text("Glow on!"),
        ]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let reply = agent
            .respond(&event(), "glow", &catalog(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.invocations.len(), 1);
        assert_eq!(reply.invocations[0].name, "glowing_aura");
        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[1][3].content, "error: tool fly is not available");
    }

    #[tokio::test]
    async fn test_hop_limit_bounds_requests() {
        let model = ScriptedModel::always_calling(ToolCallRequest {
            id: "loop".to_string(),
            name: "heart_particles".to_string(),
            arguments: "{}".to_string(),
        });
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let err = agent
            .respond(&event(), "hearts", &catalog(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::HopLimit(MAX_HOPS)));
        assert_eq!(model.request_count(), MAX_HOPS);
        assert_eq!(console.commands().len(), MAX_HOPS);
    }

    #[tokio::test]
    async fn test_model_error_fails_turn() {
        let model = ScriptedModel::new(vec![Err(LlmError::Status {
            status: "500 Internal Server Error".to_string(),
            body: "boom".to_string(),
        })]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let err = agent
            .respond(&event(), "hi", &catalog(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Model(LlmError::Status { .. })));
    }

    #[tokio::test]
    async fn test_tool_calls_without_catalog_are_treated_as_text() {
        let model = ScriptedModel::new(vec![Ok(LLMResponse {
            content: "Hello!".to_string(),
            tool_calls: vec![ToolCallRequest {
                id: "x".to_string(),
                name: "set_time".to_string(),
                arguments: "{}".to_string(),
            }],
            total_tokens: 3,
        })]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let reply = agent
            .respond(&event(), "hi", &ToolCatalog::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.text, "Hello!");
        assert_eq!(model.offered_tools.lock().unwrap()[0], 0);
        assert!(console.commands().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_turn_does_not_wait_for_model() {
        let model = ScriptedModel::new(vec![text("late")]);
        let console = RecordingConsole::default();
        let agent = Agent::new(&model, &console, "sys");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = agent.respond(&event(), "hi", &catalog(), &cancel).await;
        assert!(matches!(result, Err(TurnError::Cancelled)));
        assert!(console.commands().is_empty());
    }
}
