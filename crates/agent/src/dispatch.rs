//! Single tool dispatch.
//!
//! Turns one provider-requested [`ToolCall`] into a [`ToolResult`]. Nothing
//! a tool does (error, timeout, panic) escapes as an error: every outcome is
//! folded into the result, traced, and published on the event bus.

use crate::breakpoint::{BreakpointContext, BreakpointHandler, BreakpointSession, Resolution};
use conductor_core::error::ToolError;
use conductor_core::event::{DomainEvent, EventBus};
use conductor_core::message::{Message, ToolCall};
use conductor_core::tool::{Tool, ToolRegistry, ToolResult};
use conductor_telemetry::{ExecutionTracer, TraceEntry};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Breakpoint wiring for one dispatch, present only while debugging.
pub(crate) struct Debugger<'a> {
    pub session: &'a BreakpointSession,
    pub handler: &'a dyn BreakpointHandler,
    pub break_on: &'a HashSet<String>,
}

impl Debugger<'_> {
    fn flags(&self, tool: &dyn Tool) -> bool {
        tool.breakpoint() || self.break_on.contains(tool.name())
    }
}

/// Borrowed view of an agent's state for the duration of one turn.
pub(crate) struct Dispatcher<'a> {
    pub tools: &'a ToolRegistry,
    pub tracer: &'a ExecutionTracer,
    pub events: &'a EventBus,
    pub debugger: Option<Debugger<'a>>,
    pub tool_timeout: Option<Duration>,
    pub verbose: bool,
    pub prompt: &'a str,
    pub conversation: &'a [Message],
}

impl Dispatcher<'_> {
    pub async fn dispatch(&self, call: &ToolCall, iteration: u32) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Provider requested an unknown tool");
            let result = ToolResult::not_found(&call.name);
            self.settle(call, call.arguments.clone(), &result, 0, iteration, false);
            return result;
        };

        let flagged = self
            .debugger
            .as_ref()
            .is_some_and(|debugger| debugger.flags(tool.as_ref()));

        let arguments = match &self.debugger {
            Some(debugger) if flagged => {
                let context = BreakpointContext {
                    tool_name: call.name.clone(),
                    call_id: call.id.clone(),
                    arguments: call.arguments.clone(),
                    prompt: self.prompt.to_string(),
                    iteration,
                    conversation: self.conversation.to_vec(),
                    previous_tools: self.tracer.tool_names(),
                };
                match debugger.session.intercept(context, debugger.handler).await {
                    Resolution::Run(arguments) => arguments,
                    Resolution::Skip => {
                        debug!(tool = %call.name, call_id = %call.id, "Tool call skipped at breakpoint");
                        let result = ToolResult::skipped();
                        self.settle(call, call.arguments.clone(), &result, 0, iteration, true);
                        return result;
                    }
                }
            }
            _ => call.arguments.clone(),
        };

        debug!(tool = %call.name, call_id = %call.id, iteration, "Dispatching tool call");
        let started = Instant::now();
        let outcome = self.run(tool.as_ref(), arguments.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(value) => ToolResult::success(value),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                ToolResult::error(e.to_string())
            }
        };

        self.settle(call, arguments, &result, elapsed_ms, iteration, flagged);
        result
    }

    async fn run(&self, tool: &dyn Tool, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let name = tool.name().to_string();
        let guarded = AssertUnwindSafe(tool.execute(arguments)).catch_unwind();

        let outcome = match self.tool_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(ToolError::Timeout {
                        tool_name: name,
                        timeout_secs: limit.as_secs(),
                    });
                }
            },
            None => guarded.await,
        };

        outcome.unwrap_or_else(|panic| Err(ToolError::failed(name, panic_message(&*panic))))
    }

    fn settle(
        &self,
        call: &ToolCall,
        arguments: Map<String, Value>,
        result: &ToolResult,
        elapsed_ms: u64,
        iteration: u32,
        flagged: bool,
    ) {
        self.events.publish(DomainEvent::ToolCompleted {
            iteration,
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            status: result.status(),
            elapsed_ms,
            arguments: arguments.clone(),
            output: result.to_content(),
            verbose: self.verbose || flagged,
            timestamp: chrono::Utc::now(),
        });

        self.tracer.record(TraceEntry::new(
            &call.name,
            &call.id,
            arguments,
            result.clone(),
            elapsed_ms,
            iteration,
        ));
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
