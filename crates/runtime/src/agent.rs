//! The tool-calling loop.
//!
//! One [`Agent::run`] resolves one query: the model is called with the user
//! prompt and the tool catalog, every batch of tool calls it issues is
//! dispatched concurrently and fed back as a single turn, and the loop stops
//! on a final answer, the turn limit, or cancellation.

use crate::model::{Backend, Message, ModelRequest, ToolCall, ToolResult, Usage};
use crate::tools::{ToolError, ToolHost};
use crate::{Error, Result};
use futures::future::join_all;
use market::ApiError;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tool-call rounds allowed before the loop gives up.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Upper bound on a single tool call.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// How a query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model answered without requesting more tools.
    Final { text: String, turns: usize },
    /// The model was still requesting tools when the turn budget ran out.
    TurnLimitExceeded { turns: usize, last_text: String },
    /// The cancellation token fired between turns.
    Cancelled { turns: usize },
    /// The backend cannot drive the tool catalog; nothing was sent.
    Unsupported { provider: String },
}

impl Outcome {
    pub fn turns(&self) -> usize {
        match self {
            Self::Final { turns, .. }
            | Self::TurnLimitExceeded { turns, .. }
            | Self::Cancelled { turns } => *turns,
            Self::Unsupported { .. } => 0,
        }
    }

    /// The string shown to the user.
    pub fn into_message(self) -> String {
        match self {
            Self::Final { text, .. } => text,
            Self::TurnLimitExceeded { turns, last_text } => {
                if last_text.trim().is_empty() {
                    format!(
                        "Stopped after reaching the turn limit ({}) without a final answer.",
                        turn_count(turns)
                    )
                } else {
                    last_text
                }
            }
            Self::Cancelled { turns } => format!("Query cancelled after {}.", turn_count(turns)),
            Self::Unsupported { provider } => format!("Unsupported provider: {provider}"),
        }
    }
}

fn turn_count(turns: usize) -> String {
    match turns {
        1 => "1 turn".to_string(),
        n => format!("{n} turns"),
    }
}

/// Drives a model backend against a tool host.
pub struct Agent<B, T> {
    backend: B,
    tools: T,
    system: String,
    max_turns: usize,
    tool_timeout: Duration,
}

impl<B: Backend, T: ToolHost> Agent<B, T> {
    pub fn new(backend: B, tools: T) -> Self {
        Self {
            backend,
            tools,
            system: String::new(),
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Resolve one query.
    ///
    /// Tool failures never end the loop; they are handed to the model as
    /// error results. Only a failing model call returns `Err`.
    pub async fn run(&self, query: &str, cancel: &CancellationToken) -> Result<Outcome> {
        let provider = self.backend.name();
        if !self.backend.supports_tools() {
            warn!(provider, "backend does not support tool calling");
            return Ok(Outcome::Unsupported {
                provider: provider.to_string(),
            });
        }
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled { turns: 0 });
        }

        info!(provider, max_turns = self.max_turns, "starting query");

        let mut messages = vec![Message::user(query)];
        let mut usage = Usage::default();
        let mut last_text = String::new();
        let mut turns = 0;
        let mut reply = self.complete(&messages, &mut usage).await?;

        loop {
            let calls = reply.tool_calls();
            let text = reply.text();
            if !text.trim().is_empty() {
                last_text.clone_from(&text);
            }
            messages.push(reply);

            if calls.is_empty() {
                info!(
                    turns,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "query answered"
                );
                return Ok(Outcome::Final { text, turns });
            }

            if turns >= self.max_turns {
                warn!(
                    turns,
                    pending_calls = calls.len(),
                    total_tokens = usage.total_tokens(),
                    "turn limit reached"
                );
                return Ok(Outcome::TurnLimitExceeded { turns, last_text });
            }

            let results = self.dispatch(calls).await;
            messages.push(Message::tool_results(results));

            if cancel.is_cancelled() {
                info!(turns, "query cancelled");
                return Ok(Outcome::Cancelled { turns });
            }

            reply = self.complete(&messages, &mut usage).await?;
            turns += 1;
        }
    }

    async fn complete(&self, messages: &[Message], usage: &mut Usage) -> Result<Message> {
        let request = ModelRequest {
            system: &self.system,
            messages,
            tools: self.tools.specs(),
        };

        debug!(messages = messages.len(), "calling model");
        let response = self
            .backend
            .call(request)
            .await
            .map_err(|source| Error::Provider {
                provider: self.backend.name().to_string(),
                source,
            })?;

        *usage += response.usage;
        Ok(response.message)
    }

    /// Execute a batch concurrently; one result per call, in call order.
    async fn dispatch(&self, calls: Vec<ToolCall>) -> Vec<ToolResult> {
        debug!(count = calls.len(), "dispatching tool calls");
        join_all(calls.into_iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: ToolCall) -> ToolResult {
        let started = Instant::now();
        let result = tokio::time::timeout(self.tool_timeout, self.tools.execute(&call))
            .await
            .unwrap_or_else(|_| Err(ToolError::Api(ApiError::Timeout(self.tool_timeout))));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                debug!(tool = %call.name, elapsed_ms, "tool call succeeded");
                ToolResult::Success {
                    tool_call_id: call.id,
                    name: call.name,
                    output,
                }
            }
            Err(err) => {
                warn!(tool = %call.name, elapsed_ms, error = %err, "tool call failed");
                ToolResult::Failure {
                    tool_call_id: call.id,
                    name: call.name,
                    error: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelResponse, Part, Role, ToolSpec};
    use crate::tools::MarketTools;
    use market::{Function, Params, QuoteApi};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted replies, then repeats `fallback` forever.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Message>>,
        fallback: Option<Message>,
        requests: Mutex<Vec<Vec<Message>>>,
        supports_tools: bool,
        fail: bool,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
                supports_tools: true,
                fail: false,
            }
        }

        fn repeating(reply: Message) -> Self {
            Self {
                fallback: Some(reply),
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> Vec<Message> {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn call(
            &self,
            request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            self.requests.lock().unwrap().push(request.messages.to_vec());
            if self.fail {
                return Err(ModelError::Api("429 Too Many Requests".into()));
            }
            let message = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.fallback.clone())
                .unwrap_or_else(|| Message::assistant(""));
            Ok(ModelResponse {
                message,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 2,
                },
            })
        }

        fn name(&self) -> &str {
            "Mock"
        }

        fn supports_tools(&self) -> bool {
            self.supports_tools
        }
    }

    /// Answers every tool with its name; tools named `fail*` fail and
    /// tools named `slow*` sleep.
    #[derive(Default)]
    struct EchoTools {
        specs: Vec<ToolSpec>,
        executed: AtomicUsize,
    }

    impl ToolHost for EchoTools {
        fn specs(&self) -> &[ToolSpec] {
            &self.specs
        }

        async fn execute(&self, call: &ToolCall) -> std::result::Result<Value, ToolError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            if call.name.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if call.name.starts_with("fail") {
                return Err(ToolError::MissingSymbol);
            }
            Ok(json!({ "tool": call.name }))
        }
    }

    /// Cancels the query from inside the first tool it runs.
    struct CancellingTools {
        cancel: CancellationToken,
        executed: AtomicUsize,
    }

    impl ToolHost for CancellingTools {
        fn specs(&self) -> &[ToolSpec] {
            &[]
        }

        async fn execute(&self, _call: &ToolCall) -> std::result::Result<Value, ToolError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            Ok(json!({"series": []}))
        }
    }

    /// Fixed upstream body, counting invocations.
    struct FixedQuotes {
        body: Value,
        invocations: AtomicUsize,
    }

    impl QuoteApi for FixedQuotes {
        async fn invoke(&self, _function: Function, _params: &Params) -> market::Result<Value> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn tool_call(id: &str, name: &str, input: Value) -> Part {
        Part::ToolCall(ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    fn requesting(parts: Vec<Part>) -> Message {
        Message {
            role: Role::Assistant,
            parts,
        }
    }

    #[tokio::test]
    async fn direct_answer_ends_at_turn_zero() {
        let backend = ScriptedBackend::new(vec![Message::assistant("EUR/USD looks range-bound.")]);
        let agent = Agent::new(backend, EchoTools::default());

        let outcome = agent.run("EUR/USD?", &CancellationToken::new()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Final {
                text: "EUR/USD looks range-bound.".into(),
                turns: 0,
            }
        );
        assert_eq!(agent.backend().calls(), 1);
        assert_eq!(agent.tools().executed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn endless_tool_requests_stop_at_turn_limit() {
        let backend = ScriptedBackend::repeating(requesting(vec![tool_call(
            "c",
            "get_rsi",
            json!({"symbol": "EURUSD"}),
        )]));
        let agent = Agent::new(backend, EchoTools::default());

        let outcome = agent.run("loop", &CancellationToken::new()).await.unwrap();

        assert!(matches!(outcome, Outcome::TurnLimitExceeded { turns: 10, .. }));
        assert_eq!(agent.backend().calls(), 11);
        assert_eq!(agent.tools().executed.load(Ordering::SeqCst), 10);
        assert!(outcome.into_message().contains("turn limit"));
    }

    #[tokio::test]
    async fn turn_limit_surfaces_last_model_text() {
        let backend = ScriptedBackend::repeating(requesting(vec![
            Part::Text("Still gathering data.".into()),
            tool_call("c", "get_sma", json!({"symbol": "EURUSD"})),
        ]));
        let agent = Agent::new(backend, EchoTools::default()).with_max_turns(2);

        let outcome = agent.run("loop", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.turns(), 2);
        assert_eq!(outcome.into_message(), "Still gathering data.");
    }

    #[tokio::test]
    async fn batch_results_keep_order_and_failures() {
        let backend = ScriptedBackend::new(vec![
            requesting(vec![
                tool_call("a", "get_fx_daily", json!({})),
                tool_call("b", "fail_sma", json!({})),
                tool_call("c", "get_rsi", json!({})),
            ]),
            Message::assistant("done"),
        ]);
        let agent = Agent::new(backend, EchoTools::default());

        let outcome = agent.run("batch", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.turns(), 1);

        let second = agent.backend().request(1);
        let results = second.last().unwrap();
        assert_eq!(results.role, Role::Tool);
        let results = results.results();
        let ids: Vec<_> = results.iter().map(|r| r.tool_call_id()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(results[0].payload(), json!({"tool": "get_fx_daily"}));
        assert_eq!(results[1].payload(), json!({"error": "Missing symbol info"}));
        assert_eq!(results[2].payload(), json!({"tool": "get_rsi"}));
    }

    #[tokio::test]
    async fn tool_payload_is_forwarded_verbatim() {
        let body = json!({"series": [{"date": "2024-05-01", "close": "1.0712"}]});
        let quotes = FixedQuotes {
            body: body.clone(),
            invocations: AtomicUsize::new(0),
        };
        let backend = ScriptedBackend::new(vec![
            requesting(vec![tool_call(
                "call_1",
                "get_fx_daily",
                json!({"from_symbol": "EUR", "to_symbol": "USD"}),
            )]),
            Message::assistant("EUR/USD closed at 1.0712."),
        ]);
        let agent = Agent::new(backend, MarketTools::new(quotes));

        let outcome = agent.run("EUR/USD close?", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.into_message(), "EUR/USD closed at 1.0712.");

        // [user, assistant(tool call), tool results]
        let second = agent.backend().request(1);
        assert_eq!(second.len(), 3);
        let results = second[2].results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_call_id(), "call_1");
        assert_eq!(results[0].payload(), body);
    }

    #[tokio::test]
    async fn unsupported_backend_makes_no_calls() {
        let backend = ScriptedBackend {
            supports_tools: false,
            ..ScriptedBackend::new(vec![Message::assistant("unused")])
        };
        let agent = Agent::new(backend, EchoTools::default());

        let outcome = agent.run("hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Unsupported {
                provider: "Mock".into()
            }
        );
        assert_eq!(agent.backend().calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped_with_name() {
        let backend = ScriptedBackend {
            fail: true,
            ..ScriptedBackend::new(Vec::new())
        };
        let agent = Agent::new(backend, EchoTools::default());

        let err = agent.run("hi", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error interacting with Mock: provider api: 429 Too Many Requests"
        );
    }

    #[tokio::test]
    async fn cancellation_stops_at_turn_boundary() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let agent = Agent::new(
            ScriptedBackend::new(vec![Message::assistant("unused")]),
            EchoTools::default(),
        );

        let outcome = agent.run("hi", &cancel).await.unwrap();

        assert_eq!(outcome, Outcome::Cancelled { turns: 0 });
        assert_eq!(agent.backend().calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_during_dispatch_skips_next_model_call() {
        let cancel = CancellationToken::new();
        let backend = ScriptedBackend::new(vec![
            requesting(vec![tool_call("a", "get_fx_daily", json!({}))]),
            Message::assistant("never reached"),
        ]);
        let tools = CancellingTools {
            cancel: cancel.clone(),
            executed: AtomicUsize::new(0),
        };
        let agent = Agent::new(backend, tools);

        let outcome = agent.run("EUR/USD?", &cancel).await.unwrap();

        assert_eq!(outcome, Outcome::Cancelled { turns: 0 });
        assert_eq!(agent.backend().calls(), 1);
        assert_eq!(agent.tools().executed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_message_handles_singular() {
        assert_eq!(
            Outcome::Cancelled { turns: 1 }.into_message(),
            "Query cancelled after 1 turn."
        );
        assert_eq!(
            Outcome::Cancelled { turns: 3 }.into_message(),
            "Query cancelled after 3 turns."
        );
    }

    #[tokio::test]
    async fn slow_tool_times_out_without_blocking_siblings() {
        let backend = ScriptedBackend::new(vec![
            requesting(vec![
                tool_call("a", "slow_daily", json!({})),
                tool_call("b", "get_rsi", json!({})),
            ]),
            Message::assistant("partial data"),
        ]);
        let agent = Agent::new(backend, EchoTools::default())
            .with_tool_timeout(Duration::from_millis(100));

        let outcome = agent.run("slow", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.into_message(), "partial data");

        let second = agent.backend().request(1);
        let results = second[2].results();
        assert!(results[0].is_error());
        assert_eq!(
            results[0].payload(),
            json!({"error": "request timed out after 100ms"})
        );
        assert!(!results[1].is_error());
    }
}
