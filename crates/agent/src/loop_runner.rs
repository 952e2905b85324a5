//! The orchestration loop implementation.

use crate::breakpoint::{BreakpointHandler, BreakpointSession};
use crate::dispatch::{Debugger, Dispatcher};
use conductor_config::AppConfig;
use conductor_core::error::ProviderError;
use conductor_core::event::{DomainEvent, EventBus};
use conductor_core::message::{Conversation, ConversationId, Message, ToolCall};
use conductor_core::provider::{Provider, ProviderRequest, ProviderResponse};
use conductor_core::tool::{Tool, ToolRegistry, ToolResult, ToolSource};
use conductor_telemetry::{BehaviorEvent, BehaviorEventKind, BehaviorLog, ExecutionTracer};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// An agent: a provider, the tools it may call, and the conversation so far.
///
/// All state is per-agent. Two agents never share a trace, a breakpoint
/// slot or a conversation unless the caller hands them the same
/// [`ExecutionTracer`] on purpose.
///
/// The conversation is edited in place, so dropping an `input()` future
/// part way through keeps every message appended before the drop.
pub struct Agent {
    engine: Engine,

    /// Created on first `input()`, dropped by `reset()`
    conversation: Option<Conversation>,

    /// Prompt of the latest `input()` call, shown to breakpoints
    last_prompt: String,
}

/// Everything a turn reads. Kept apart from the conversation a turn writes.
struct Engine {
    /// The completion backend
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Seeded as the first message of a new conversation
    system_prompt: String,

    /// Provider round-trips allowed per `input()` call
    max_iterations: u32,

    /// Tool registry
    tools: ToolRegistry,

    /// Every tool dispatch, in settle order
    tracer: Arc<ExecutionTracer>,

    /// Event bus for progress events
    event_bus: Arc<EventBus>,

    /// Optional persisted behavior log
    behavior_log: Option<Arc<dyn BehaviorLog>>,

    /// One paused call at a time
    breakpoints: BreakpointSession,

    /// Who answers breakpoints
    breakpoint_handler: Option<Arc<dyn BreakpointHandler>>,

    /// Whether flagged tools pause at all
    debugging: bool,

    /// Tool names to pause on besides tools flagged in code
    break_on: HashSet<String>,

    tool_timeout: Option<Duration>,
    provider_timeout: Option<Duration>,

    /// Render every settled call field by field
    verbose: bool,
}

impl Agent {
    /// Create an agent with default settings and no tools.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        let defaults = AppConfig::default();
        Self {
            engine: Engine {
                provider,
                model: defaults.model,
                temperature: defaults.temperature,
                max_tokens: None,
                system_prompt: defaults.system_prompt,
                max_iterations: defaults.max_iterations,
                tools: ToolRegistry::new(),
                tracer: Arc::new(ExecutionTracer::new()),
                event_bus: Arc::new(EventBus::default()),
                behavior_log: None,
                breakpoints: BreakpointSession::new(),
                breakpoint_handler: None,
                debugging: false,
                break_on: HashSet::new(),
                tool_timeout: None,
                provider_timeout: None,
                verbose: false,
            },
            conversation: None,
            last_prompt: String::new(),
        }
    }

    /// Create an agent from loaded configuration.
    ///
    /// The behavior log and breakpoint handler are not built here; attach
    /// them with [`with_behavior_log`](Self::with_behavior_log) and
    /// [`with_breakpoint_handler`](Self::with_breakpoint_handler).
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let mut agent = Self::new(provider)
            .with_model(&config.model)
            .with_temperature(config.temperature)
            .with_system_prompt(&config.system_prompt)
            .with_max_iterations(config.max_iterations)
            .with_debugging(config.debug.enabled)
            .with_break_on(config.debug.breakpoints.iter().cloned())
            .with_verbose(config.trace.verbose);
        agent.engine.max_tokens = config.max_tokens;
        agent.engine.tool_timeout = config.tool_timeout_secs.map(Duration::from_secs);
        agent.engine.provider_timeout = config.provider_timeout_secs.map(Duration::from_secs);
        agent
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.engine.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.engine.temperature = temperature;
        self
    }

    /// Set the default max tokens per provider response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.engine.max_tokens = Some(max);
        self
    }

    /// Set the system message for conversations started after this call.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.engine.system_prompt = prompt.into();
        self
    }

    /// Set the maximum number of provider round-trips per `input()`.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.engine.max_iterations = max;
        self
    }

    /// Register tools at construction.
    pub fn with_tools(mut self, source: impl Into<ToolSource>) -> Self {
        self.engine.tools.register(source);
        self
    }

    /// Publish progress on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.engine.event_bus = event_bus;
        self
    }

    /// Record dispatches into a shared tracer.
    pub fn with_tracer(mut self, tracer: Arc<ExecutionTracer>) -> Self {
        self.engine.tracer = tracer;
        self
    }

    pub fn with_behavior_log(mut self, log: Arc<dyn BehaviorLog>) -> Self {
        self.engine.behavior_log = Some(log);
        self
    }

    pub fn with_breakpoint_handler(mut self, handler: Arc<dyn BreakpointHandler>) -> Self {
        self.engine.breakpoint_handler = Some(handler);
        self
    }

    /// Enable or disable pausing at breakpoints.
    pub fn with_debugging(mut self, enabled: bool) -> Self {
        self.engine.debugging = enabled;
        self
    }

    /// Pause on these tools too, whether or not they are flagged in code.
    pub fn with_break_on(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.engine.break_on.extend(names);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.engine.tool_timeout = Some(timeout);
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.engine.provider_timeout = Some(timeout);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.engine.verbose = verbose;
        self
    }

    /// Register more tools. Same-name tools replace earlier ones.
    pub fn register(&mut self, source: impl Into<ToolSource>) -> Vec<Arc<dyn Tool>> {
        self.engine.tools.register(source)
    }

    /// Unregister a tool. Returns whether it was registered.
    pub fn remove_tool(&mut self, name: &str) -> bool {
        self.engine.tools.remove(name)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.engine.tools
    }

    /// The conversation, once the first `input()` has started it.
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// The execution trace.
    pub fn trace(&self) -> &ExecutionTracer {
        &self.engine.tracer
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.engine.event_bus)
    }

    /// The breakpoint slot, for observing which call is paused.
    pub fn breakpoints(&self) -> &BreakpointSession {
        &self.engine.breakpoints
    }

    pub fn max_iterations(&self) -> u32 {
        self.engine.max_iterations
    }

    pub fn set_debugging(&mut self, enabled: bool) {
        self.engine.debugging = enabled;
    }

    pub fn is_debugging(&self) -> bool {
        self.engine.debugging
    }

    /// Forget the conversation and clear the trace. Tools stay registered.
    pub fn reset(&mut self) {
        self.conversation = None;
        self.last_prompt.clear();
        self.engine.tracer.clear();
    }

    /// Process one prompt with the configured iteration limit.
    pub async fn input(&mut self, prompt: &str) -> conductor_core::Result<String> {
        self.input_with_limit(prompt, self.engine.max_iterations).await
    }

    /// Process one prompt, allowing at most `max_iterations` provider calls.
    ///
    /// Returns the provider's final text, or `""` if the limit ran out
    /// before the provider stopped asking for tools. Only provider failures
    /// are errors; tool failures reach the provider as tool messages.
    pub async fn input_with_limit(
        &mut self,
        prompt: &str,
        max_iterations: u32,
    ) -> conductor_core::Result<String> {
        self.last_prompt = prompt.to_string();
        let engine = &self.engine;
        let conversation = self
            .conversation
            .get_or_insert_with(|| Conversation::with_system(&engine.system_prompt));

        engine.drive(conversation, prompt, max_iterations).await
    }

    /// Run `tool_name` again with the arguments of its most recent traced
    /// call, overridden key by key by `overrides`.
    ///
    /// The replay goes through normal dispatch, so it may pause at a
    /// breakpoint, and appends a new trace entry. The conversation is not
    /// touched. Returns `None` if the tool has never been dispatched.
    pub async fn replay(&self, tool_name: &str, overrides: Map<String, Value>) -> Option<ToolResult> {
        let previous = self.engine.tracer.last_for(tool_name)?;
        let mut arguments = previous.arguments;
        arguments.extend(overrides);

        let call = ToolCall {
            id: format!("replay_{}", uuid::Uuid::new_v4().simple()),
            name: previous.tool_name,
            arguments,
        };
        info!(tool = %call.name, replayed = %previous.call_id, "Replaying tool call");

        let messages = self
            .conversation
            .as_ref()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default();
        let dispatcher = self.engine.dispatcher(&self.last_prompt, messages);
        Some(dispatcher.dispatch(&call, previous.iteration).await)
    }
}

impl Engine {
    async fn drive(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        max_iterations: u32,
    ) -> conductor_core::Result<String> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            max_iterations,
            "Processing input"
        );

        let session = conversation.id.clone();
        self.record(&session, BehaviorEventKind::InputReceived {
            prompt: prompt.to_string(),
        });
        conversation.push(Message::user(prompt));

        let tool_definitions = self.tools.definitions();
        let mut answer = None;
        let mut iterations = 0;

        for iteration in 0..max_iterations {
            iterations = iteration + 1;
            debug!(conversation_id = %conversation.id, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };
            self.event_bus.publish(DomainEvent::RequestSent {
                iteration,
                messages: request.messages.len(),
                tools: request.tools.len(),
                timestamp: chrono::Utc::now(),
            });

            let started = Instant::now();
            let response = match self.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(provider = self.provider.name(), error = %e, "Provider call failed");
                    self.record(&session, BehaviorEventKind::FinalOutput {
                        output: String::new(),
                        iterations,
                        exhausted: false,
                        error: Some(e.to_string()),
                    });
                    return Err(e.into());
                }
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            self.event_bus.publish(DomainEvent::ResponseReceived {
                iteration,
                latency_ms,
                tool_calls: response.tool_calls.len(),
                timestamp: chrono::Utc::now(),
            });
            self.record(&session, BehaviorEventKind::ProviderResponse {
                iteration,
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
                latency_ms,
            });

            if !response.has_tool_calls() {
                let text = response.content.unwrap_or_default();
                conversation.push(Message::assistant(&text));
                answer = Some(text);
                break;
            }

            let calls = response.tool_calls;
            debug!(tool_count = calls.len(), iteration, "Executing tool calls");
            let request_message =
                Message::assistant_with_calls(response.content.unwrap_or_default(), calls.clone());

            // The request and its results land together, so a dropped turn
            // never leaves unanswered calls in the conversation.
            let context = [
                conversation.messages.as_slice(),
                std::slice::from_ref(&request_message),
            ]
            .concat();
            let results = {
                let dispatcher = self.dispatcher(prompt, &context);
                join_all(calls.iter().map(|call| dispatcher.dispatch(call, iteration))).await
            };

            conversation.push(request_message);
            for (call, result) in calls.iter().zip(results) {
                self.record_tool(&session, call, &result, iteration);
                conversation.push(
                    Message::tool_result(&call.id, result.to_content())
                        .with_metadata("status", result.status().as_str())
                        .with_metadata("tool", call.name.as_str()),
                );
            }
        }

        let exhausted = answer.is_none();
        if exhausted {
            warn!(
                conversation_id = %conversation.id,
                iterations,
                "Iteration limit reached without a final answer"
            );
        }
        let answer = answer.unwrap_or_default();

        self.event_bus.publish(DomainEvent::Completed {
            iterations,
            exhausted,
            answer_chars: answer.chars().count(),
            timestamp: chrono::Utc::now(),
        });
        self.record(&session, BehaviorEventKind::FinalOutput {
            output: answer.clone(),
            iterations,
            exhausted,
            error: None,
        });

        Ok(answer)
    }

    fn dispatcher<'a>(&'a self, prompt: &'a str, conversation: &'a [Message]) -> Dispatcher<'a> {
        let debugger = match (&self.breakpoint_handler, self.debugging) {
            (Some(handler), true) => Some(Debugger {
                session: &self.breakpoints,
                handler: handler.as_ref(),
                break_on: &self.break_on,
            }),
            _ => None,
        };

        Dispatcher {
            tools: &self.tools,
            tracer: &self.tracer,
            events: &self.event_bus,
            debugger,
            tool_timeout: self.tool_timeout,
            verbose: self.verbose,
            prompt,
            conversation,
        }
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.provider.complete(request);
        match self.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(ProviderError::Timeout(format!(
                    "{} did not answer within {}s",
                    self.provider.name(),
                    limit.as_secs()
                )))
            }),
            None => call.await,
        }
    }

    fn record_tool(&self, session: &ConversationId, call: &ToolCall, result: &ToolResult, iteration: u32) {
        // Arguments as actually run live in the trace; the log keeps the request.
        self.record(session, BehaviorEventKind::ToolCall {
            iteration,
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            status: result.status(),
            output: result.to_content(),
        });
    }

    fn record(&self, session: &ConversationId, kind: BehaviorEventKind) {
        let Some(log) = &self.behavior_log else {
            return;
        };
        if let Err(e) = log.record(&BehaviorEvent::new(session.to_string(), kind)) {
            warn!(error = %e, "Failed to write behavior event");
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.engine.provider.name())
            .field("model", &self.engine.model)
            .field("tools", &self.engine.tools.names())
            .field("max_iterations", &self.engine.max_iterations)
            .field("debugging", &self.engine.debugging)
            .field("trace_len", &self.engine.tracer.len())
            .finish()
    }
}
