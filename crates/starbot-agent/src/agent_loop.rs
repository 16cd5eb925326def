//! Agent loop — streams model output, runs requested tools, repeats.
//!
//! One call to [`Agent::run`] is one turn: the user text is appended, then
//! the loop alternates between a streaming model call and sequential tool
//! execution until the model answers without tool calls, the iteration cap
//! is hit, or the stream fails. Everything observable comes out as
//! [`AgentEvent`]s in order.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, error, info, trace, warn};

use starbot_core::config::Config;
use starbot_core::types::{FunctionCall, ToolCall, UsageInfo};
use starbot_providers::{LlmProvider, LlmRequestConfig, ProviderError};

use crate::accumulator::ToolCallAccumulator;
use crate::confirm::ConfirmationGate;
use crate::conversation::Conversation;
use crate::event::AgentEvent;
use crate::tools::ToolRegistry;

/// Tool result recorded when the user rejects a dangerous call.
pub const DENIED_RESULT: &str = "[user denied execution]";

/// Error message emitted when the iteration cap is hit.
pub const MAX_ITERATIONS_MESSAGE: &str = "Max iterations reached";

/// Default maximum model ↔ tool iterations per turn.
const DEFAULT_MAX_ITERATIONS: u32 = 20;

// ─────────────────────────────────────────────
// Options / state
// ─────────────────────────────────────────────

/// Per-agent settings, fixed at construction.
#[derive(Clone, Debug)]
pub struct AgentOptions {
    /// Model identifier; empty means the provider's default.
    pub model: String,
    /// Max model ↔ tool iterations per turn.
    pub max_iterations: u32,
    /// Ask before running dangerous tools.
    pub confirm_dangerous: bool,
    /// Temperature / max_tokens for every model call.
    pub request: LlmRequestConfig,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            confirm_dangerous: true,
            request: LlmRequestConfig::default(),
        }
    }
}

impl AgentOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.model.clone(),
            max_iterations: config.agent.max_iterations,
            confirm_dangerous: config.agent.confirm_dangerous,
            request: LlmRequestConfig::from(&config.model),
        }
    }
}

/// Where the loop is within a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Streaming,
    Deciding,
    ExecutingTools,
    Done,
    Failed,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// A single-conversation agent.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    conversation: Conversation,
    gate: ConfirmationGate,
    options: AgentOptions,
    state: LoopState,
    usage: UsageInfo,
}

impl Agent {
    /// Create an agent. `system_prompt` becomes the first message (if non-empty).
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        system_prompt: &str,
        mut options: AgentOptions,
    ) -> Self {
        if options.model.is_empty() {
            options.model = provider.default_model().to_string();
        }

        info!(
            provider = provider.display_name(),
            model = %options.model,
            tools = tools.len(),
            max_iterations = options.max_iterations,
            confirm_dangerous = options.confirm_dangerous,
            "agent initialized"
        );

        Self {
            provider,
            tools,
            conversation: Conversation::new(system_prompt),
            gate: ConfirmationGate::new(),
            options,
            state: LoopState::Idle,
            usage: UsageInfo::default(),
        }
    }

    fn transition(&mut self, next: LoopState) {
        trace!(from = ?self.state, to = ?next, "agent state");
        self.state = next;
    }

    /// Run one turn for `user_text`.
    ///
    /// The returned stream borrows the agent until it is dropped. To answer a
    /// [`AgentEvent::Confirm`], resolve the handle obtained from
    /// [`confirmation_gate`](Self::confirmation_gate) before polling again.
    pub fn run(&mut self, user_text: impl Into<String>) -> BoxStream<'_, AgentEvent> {
        let user_text = user_text.into();
        let agent = self;

        Box::pin(async_stream::stream! {
            agent.conversation.add_user(user_text);

            let definitions = agent.tools.definitions();
            let tools = if definitions.is_empty() { None } else { Some(definitions) };

            for iteration in 1..=agent.options.max_iterations {
                agent.transition(LoopState::Streaming);
                debug!(
                    iteration,
                    messages = agent.conversation.len(),
                    "calling model"
                );

                let opened = agent
                    .provider
                    .chat_stream(
                        agent.conversation.snapshot(),
                        tools.as_deref(),
                        &agent.options.model,
                        &agent.options.request,
                    )
                    .await;
                let mut chunks = match opened {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        error!(iteration, error = %e, "failed to open model stream");
                        agent.transition(LoopState::Failed);
                        yield stream_failed(&e);
                        return;
                    }
                };

                let mut text = String::new();
                let mut calls = ToolCallAccumulator::new();
                let mut turn_usage: Option<UsageInfo> = None;
                let mut failure: Option<ProviderError> = None;

                while let Some(item) = chunks.next().await {
                    let chunk = match item {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    };
                    for delta in &chunk.tool_calls {
                        calls.apply(delta);
                    }
                    if let Some(usage) = &chunk.usage {
                        turn_usage.get_or_insert_with(UsageInfo::default).accumulate(usage);
                    }
                    if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                        text.push_str(&content);
                        yield AgentEvent::Text { content };
                    }
                }

                if let Some(usage) = turn_usage {
                    agent.usage.accumulate(&usage);
                    yield AgentEvent::Usage {
                        usage,
                        cumulative: agent.usage,
                    };
                }

                agent.transition(LoopState::Deciding);
                let content = if text.is_empty() { None } else { Some(text) };

                if let Some(e) = failure {
                    warn!(iteration, error = %e, "model stream failed");
                    // keep what the user already saw; drop half-built tool calls
                    if content.is_some() {
                        agent.conversation.add_assistant(content, Vec::new());
                    }
                    agent.transition(LoopState::Failed);
                    yield stream_failed(&e);
                    return;
                }

                if calls.is_empty() {
                    agent.conversation.add_assistant(content, Vec::new());
                    agent.transition(LoopState::Done);
                    debug!(iteration, "turn complete");
                    agent.transition(LoopState::Idle);
                    return;
                }

                let tool_calls = calls.finish();
                debug!(iteration, count = tool_calls.len(), "model requested tools");
                agent.conversation.add_assistant(content, tool_calls.clone());
                agent.transition(LoopState::ExecutingTools);

                for call in tool_calls {
                    let ToolCall {
                        id,
                        function: FunctionCall { name, arguments },
                        ..
                    } = call;

                    yield AgentEvent::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    };

                    let approved = if agent.options.confirm_dangerous && agent.tools.is_dangerous(&name) {
                        let pending = agent.gate.request();
                        yield AgentEvent::Confirm {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: arguments.clone(),
                        };
                        pending.wait().await
                    } else {
                        true
                    };

                    let result = if approved {
                        agent.tools.execute(&name, &arguments).await
                    } else {
                        info!(tool = %name, "user denied execution");
                        DENIED_RESULT.to_string()
                    };

                    debug!(tool = %name, result_len = result.len(), "tool result");
                    agent.conversation.add_tool_result(id.clone(), result.clone());
                    yield AgentEvent::ToolResult { id, name, result };
                }
            }

            warn!(max_iterations = agent.options.max_iterations, "max iterations reached");
            agent.transition(LoopState::Failed);
            yield AgentEvent::Error {
                message: MAX_ITERATIONS_MESSAGE.to_string(),
            };
        })
    }

    /// Back to a fresh conversation: system prompt only, nothing pending.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.gate.cancel();
        self.usage = UsageInfo::default();
        self.transition(LoopState::Idle);
        debug!("agent reset");
    }

    /// A handle for answering `Confirm` events.
    pub fn confirmation_gate(&self) -> ConfirmationGate {
        self.gate.clone()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Token usage accumulated since construction or the last reset.
    pub fn usage(&self) -> UsageInfo {
        self.usage
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }
}

fn stream_failed(e: &ProviderError) -> AgentEvent {
    AgentEvent::Error {
        message: format!("Model stream failed: {e}"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use starbot_core::types::{Message, StreamChunk, ToolCallDelta, ToolDefinition};
    use starbot_providers::ChunkStream;

    use crate::tools::{Tool, ToolOutput};

    type Script = Result<Vec<Result<StreamChunk, ProviderError>>, ProviderError>;

    /// A mock provider that replays one scripted stream per call.
    struct ScriptedProvider {
        scripts: Mutex<VecDeque<Script>>,
        /// Snapshot and tool count seen by each call.
        calls: Mutex<Vec<(Vec<Message>, Option<usize>)>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat_stream(
            &self,
            messages: &[Message],
            tools: Option<&[ToolDefinition]>,
            _model: &str,
            _config: &LlmRequestConfig,
        ) -> Result<ChunkStream, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), tools.map(|t| t.len())));
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![Ok(StreamChunk::text("(script exhausted)"))]));
            script.map(|chunks| futures::stream::iter(chunks).boxed())
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }

        fn display_name(&self) -> &str {
            "ScriptedProvider"
        }
    }

    /// Records every invocation.
    struct SpyTool {
        name: &'static str,
        dangerous: bool,
        calls: Arc<AtomicUsize>,
        last_params: Arc<Mutex<Option<HashMap<String, Value>>>>,
    }

    impl SpyTool {
        fn new(name: &'static str, dangerous: bool) -> Self {
            Self {
                name,
                dangerous,
                calls: Arc::new(AtomicUsize::new(0)),
                last_params: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl Tool for SpyTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "spy"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        fn dangerous(&self) -> bool {
            self.dangerous
        }
        async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_params.lock().unwrap() = Some(params);
            Ok(format!("{} ran", self.name).into())
        }
    }

    fn text(s: &str) -> Result<StreamChunk, ProviderError> {
        Ok(StreamChunk::text(s))
    }

    fn call(index: u32, id: &str, name: &str, args: &str) -> Result<StreamChunk, ProviderError> {
        Ok(StreamChunk::tool_calls(vec![ToolCallDelta::new(index, id, name, args)]))
    }

    fn options(max_iterations: u32, confirm_dangerous: bool) -> AgentOptions {
        AgentOptions {
            max_iterations,
            confirm_dangerous,
            ..Default::default()
        }
    }

    fn agent_with(provider: Arc<ScriptedProvider>, tools: Vec<SpyTool>, opts: AgentOptions) -> Agent {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(Arc::new(tool));
        }
        Agent::new(provider, Arc::new(registry), "You are a test agent.", opts)
    }

    /// Drive one turn, answering every confirmation with `approve`.
    async fn drive(agent: &mut Agent, input: &str, approve: bool) -> Vec<AgentEvent> {
        let gate = agent.confirmation_gate();
        let mut stream = agent.run(input);
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            if matches!(event, AgentEvent::Confirm { .. }) {
                assert!(gate.is_pending());
                gate.resolve(approve);
            }
            events.push(event);
        }
        events
    }

    fn roles(agent: &Agent) -> Vec<&'static str> {
        agent.conversation().snapshot().iter().map(|m| m.role()).collect()
    }

    /// Every tool message answers an id from an earlier assistant message.
    fn assert_tool_results_reference_earlier_calls(agent: &Agent) {
        let mut seen = HashSet::new();
        for message in agent.conversation().snapshot() {
            for call in message.tool_calls() {
                seen.insert(call.id.clone());
            }
            if let Message::Tool { tool_call_id, .. } = message {
                assert!(seen.contains(tool_call_id), "orphan tool result {tool_call_id}");
            }
        }
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("Hel"), text("lo")])]);
        let mut agent = agent_with(provider.clone(), vec![], options(5, true));

        let events = drive(&mut agent, "Hi", true).await;
        assert_eq!(
            events,
            vec![
                AgentEvent::Text { content: "Hel".into() },
                AgentEvent::Text { content: "lo".into() },
            ]
        );
        assert_eq!(roles(&agent), vec!["system", "user", "assistant"]);
        assert_eq!(
            agent.conversation().snapshot()[2],
            Message::assistant("Hello")
        );
        assert_eq!(agent.state(), LoopState::Idle);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tools_omitted_when_registry_empty() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("ok")])]);
        let mut agent = agent_with(provider.clone(), vec![], options(5, true));
        drive(&mut agent, "Hi", true).await;
        assert_eq!(provider.calls.lock().unwrap()[0].1, None);

        let provider = ScriptedProvider::new(vec![Ok(vec![text("ok")])]);
        let mut agent = agent_with(provider.clone(), vec![SpyTool::new("get_x", false)], options(5, true));
        drive(&mut agent, "Hi", true).await;
        assert_eq!(provider.calls.lock().unwrap()[0].1, Some(1));
    }

    #[tokio::test]
    async fn test_fragment_accumulation_and_tool_round_trip() {
        let spy = SpyTool::new("get_x", false);
        let calls = spy.calls.clone();
        let params = spy.last_params.clone();

        let provider = ScriptedProvider::new(vec![
            Ok(vec![
                call(0, "c1", "get_x", ""),
                call(0, "", "", "{\"a\":"),
                call(0, "", "", "1}"),
            ]),
            Ok(vec![text("x is 1")]),
        ]);
        let mut agent = agent_with(provider.clone(), vec![spy], options(5, true));

        let events = drive(&mut agent, "what is x?", true).await;
        assert_eq!(
            events,
            vec![
                AgentEvent::ToolCall {
                    id: "c1".into(),
                    name: "get_x".into(),
                    arguments: "{\"a\":1}".into(),
                },
                AgentEvent::ToolResult {
                    id: "c1".into(),
                    name: "get_x".into(),
                    result: "get_x ran".into(),
                },
                AgentEvent::Text { content: "x is 1".into() },
            ]
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            params.lock().unwrap().as_ref().unwrap().get("a"),
            Some(&json!(1))
        );

        assert_eq!(
            roles(&agent),
            vec!["system", "user", "assistant", "tool", "assistant"]
        );
        let assistant = &agent.conversation().snapshot()[2];
        assert_eq!(assistant.tool_calls(), &[ToolCall::new("c1", "get_x", "{\"a\":1}")]);

        // second model call saw the tool result
        let seen = &provider.calls.lock().unwrap()[1].0;
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], Message::tool_result("c1", "get_x ran"));
        assert_tool_results_reference_earlier_calls(&agent);
    }

    #[tokio::test]
    async fn test_text_and_multiple_calls_in_index_order() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![
                text("Let me check. "),
                call(1, "c2", "second", "{}"),
                call(0, "c1", "first", "{}"),
            ]),
            Ok(vec![text("done")]),
        ]);
        let mut agent = agent_with(
            provider,
            vec![SpyTool::new("first", false), SpyTool::new("second", false)],
            options(5, true),
        );

        let events = drive(&mut agent, "go", true).await;
        let call_ids: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::ToolCall { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(call_ids, vec!["c1", "c2"]);

        match &agent.conversation().snapshot()[2] {
            Message::Assistant { content, tool_calls } => {
                assert_eq!(content.as_deref(), Some("Let me check. "));
                assert_eq!(tool_calls.as_ref().map(|c| c.len()), Some(2));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_tool_results_reference_earlier_calls(&agent);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let spy = SpyTool::new("get_x", false);
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "get_x", "{}")]),
            Ok(vec![text("never requested")]),
        ]);
        let mut agent = agent_with(provider.clone(), vec![spy], options(1, true));

        let events = drive(&mut agent, "loop", true).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AgentEvent::ToolCall { .. }));
        assert!(matches!(events[1], AgentEvent::ToolResult { .. }));
        assert_eq!(
            events[2],
            AgentEvent::Error { message: "Max iterations reached".into() }
        );
        assert_eq!(provider.call_count(), 1);
        assert_eq!(agent.state(), LoopState::Failed);
        // transcript left as-is: the tool result is the last entry
        assert_eq!(roles(&agent).last(), Some(&"tool"));
    }

    #[tokio::test]
    async fn test_denied_dangerous_call_never_executes() {
        let spy = SpyTool::new("rm_all", true);
        let calls = spy.calls.clone();
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "rm_all", "{}")]),
            Ok(vec![text("ok, I won't")]),
        ]);
        let mut agent = agent_with(provider, vec![spy], options(5, true));

        let events = drive(&mut agent, "delete everything", false).await;
        assert_eq!(
            events[..3],
            [
                AgentEvent::ToolCall {
                    id: "c1".into(),
                    name: "rm_all".into(),
                    arguments: "{}".into(),
                },
                AgentEvent::Confirm {
                    id: "c1".into(),
                    name: "rm_all".into(),
                    arguments: "{}".into(),
                },
                AgentEvent::ToolResult {
                    id: "c1".into(),
                    name: "rm_all".into(),
                    result: "[user denied execution]".into(),
                },
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            agent.conversation().snapshot()[3],
            Message::tool_result("c1", DENIED_RESULT)
        );
        assert!(!agent.confirmation_gate().is_pending());
    }

    #[tokio::test]
    async fn test_approved_dangerous_call_executes() {
        let spy = SpyTool::new("rm_all", true);
        let calls = spy.calls.clone();
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "rm_all", "{}")]),
            Ok(vec![text("done")]),
        ]);
        let mut agent = agent_with(provider, vec![spy], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        assert!(events.iter().any(|e| e.event_type() == "confirm"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_confirmation_disabled() {
        let spy = SpyTool::new("rm_all", true);
        let calls = spy.calls.clone();
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "rm_all", "{}")]),
            Ok(vec![text("done")]),
        ]);
        let mut agent = agent_with(provider, vec![spy], options(5, false));

        let events = drive(&mut agent, "go", false).await;
        assert!(events.iter().all(|e| e.event_type() != "confirm"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_confirmation_counts_as_denial() {
        let spy = SpyTool::new("rm_all", true);
        let calls = spy.calls.clone();
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "rm_all", "{}")]),
            Ok(vec![text("done")]),
        ]);
        let mut agent = agent_with(provider, vec![spy], options(5, true));
        let gate = agent.confirmation_gate();

        let mut stream = agent.run("go");
        let mut results = Vec::new();
        while let Some(event) = stream.next().await {
            if matches!(event, AgentEvent::Confirm { .. }) {
                gate.cancel();
            }
            if let AgentEvent::ToolResult { result, .. } = event {
                results.push(result);
            }
        }
        drop(stream);

        assert_eq!(results, vec![DENIED_RESULT.to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "nope", "{}")]),
            Ok(vec![text("sorry")]),
        ]);
        let mut agent = agent_with(provider, vec![SpyTool::new("get_x", false)], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        assert_eq!(
            events[1],
            AgentEvent::ToolResult {
                id: "c1".into(),
                name: "nope".into(),
                result: "[error] Unknown tool: nope".into(),
            }
        );
        assert_eq!(events.last(), Some(&AgentEvent::Text { content: "sorry".into() }));
        assert_eq!(agent.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_arguments_become_error_text() {
        let spy = SpyTool::new("get_x", false);
        let calls = spy.calls.clone();
        let provider = ScriptedProvider::new(vec![
            Ok(vec![call(0, "c1", "get_x", "{broken")]),
            Ok(vec![text("oops")]),
        ]);
        let mut agent = agent_with(provider, vec![spy], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        match &events[1] {
            AgentEvent::ToolResult { result, .. } => {
                assert!(result.starts_with("[error] Invalid arguments for get_x"))
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stream_failure_mid_turn() {
        let provider = ScriptedProvider::new(vec![Ok(vec![
            text("partial "),
            call(0, "c1", "get_x", "{\"a\""),
            Err(ProviderError::Stream("connection reset".into())),
        ])]);
        let mut agent = agent_with(provider, vec![SpyTool::new("get_x", false)], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        assert_eq!(
            events,
            vec![
                AgentEvent::Text { content: "partial ".into() },
                AgentEvent::Error {
                    message: "Model stream failed: stream interrupted: connection reset".into()
                },
            ]
        );
        // streamed text kept, half-built tool call dropped
        assert_eq!(roles(&agent), vec!["system", "user", "assistant"]);
        assert_eq!(agent.conversation().snapshot()[2], Message::assistant("partial "));
        assert_eq!(agent.state(), LoopState::Failed);
    }

    #[tokio::test]
    async fn test_stream_open_failure() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::Api {
            status: 500,
            body: "boom".into(),
        })]);
        let mut agent = agent_with(provider, vec![], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        assert_eq!(
            events,
            vec![AgentEvent::Error {
                message: "Model stream failed: API error 500: boom".into()
            }]
        );
        assert_eq!(roles(&agent), vec!["system", "user"]);
    }

    #[tokio::test]
    async fn test_usage_accumulates_across_iterations() {
        let usage = UsageInfo {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let with_usage = |mut chunk: StreamChunk| -> Result<StreamChunk, ProviderError> {
            chunk.usage = Some(usage);
            Ok(chunk)
        };
        let provider = ScriptedProvider::new(vec![
            Ok(vec![
                call(0, "c1", "get_x", "{}"),
                with_usage(StreamChunk::default()),
            ]),
            Ok(vec![with_usage(StreamChunk::text("done"))]),
        ]);
        let mut agent = agent_with(provider, vec![SpyTool::new("get_x", false)], options(5, true));

        let events = drive(&mut agent, "go", true).await;
        let cumulative: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Usage { cumulative, .. } => Some(cumulative.total_tokens),
                _ => None,
            })
            .collect();
        assert_eq!(cumulative, vec![15, 30]);
        assert_eq!(agent.usage().total_tokens, 30);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("hello")])]);
        let mut agent = agent_with(provider, vec![], options(5, true));
        drive(&mut agent, "hi", true).await;
        assert_eq!(agent.conversation().len(), 3);

        agent.reset();
        let after_one = agent.conversation().snapshot().to_vec();
        agent.reset();
        assert_eq!(agent.conversation().snapshot(), after_one.as_slice());
        assert_eq!(after_one, vec![Message::system("You are a test agent.")]);
        assert_eq!(agent.state(), LoopState::Idle);
        assert_eq!(agent.usage(), UsageInfo::default());
        assert!(!agent.confirmation_gate().is_pending());
    }

    #[tokio::test]
    async fn test_conversation_continues_across_turns() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("one")]), Ok(vec![text("two")])]);
        let mut agent = agent_with(provider.clone(), vec![], options(5, true));
        drive(&mut agent, "first", true).await;
        drive(&mut agent, "second", true).await;

        assert_eq!(
            roles(&agent),
            vec!["system", "user", "assistant", "user", "assistant"]
        );
        assert_eq!(provider.calls.lock().unwrap()[1].0.len(), 4);
    }

    #[test]
    fn test_model_defaults_to_provider() {
        let provider = ScriptedProvider::new(vec![]);
        let agent = agent_with(provider, vec![], AgentOptions::default());
        assert_eq!(agent.model(), "mock-model");
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.agent.max_iterations = 3;
        config.agent.confirm_dangerous = false;
        config.model.max_tokens = 256;

        let opts = AgentOptions::from_config(&config);
        assert_eq!(opts.model, "gpt-4o");
        assert_eq!(opts.max_iterations, 3);
        assert!(!opts.confirm_dangerous);
        assert_eq!(opts.request.max_tokens, 256);
    }

    #[tokio::test]
    async fn test_dropped_turn_clears_pending_confirmation() {
        let provider = ScriptedProvider::new(vec![Ok(vec![call(0, "c1", "danger", "{}")])]);
        let spy = SpyTool::new("danger", true);
        let calls = spy.calls.clone();
        let mut agent = agent_with(provider, vec![spy], options(5, true));
        let gate = agent.confirmation_gate();

        {
            let mut stream = agent.run("go");
            while let Some(event) = stream.next().await {
                if matches!(event, AgentEvent::Confirm { .. }) {
                    break;
                }
            }
            assert!(gate.is_pending());
        }

        assert!(!gate.is_pending());
        assert!(!gate.resolve(true));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
