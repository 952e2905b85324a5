//! Interactive breakpoints — pause before a flagged tool runs.
//!
//! When debugging is on, dispatch hands a [`BreakpointContext`] to the
//! agent's [`BreakpointSession`] and waits for a [`BreakpointHandler`] to
//! answer with one of three commands:
//!
//! - **continue** — run with the original arguments
//! - **edit** — run with replacement arguments (malformed edits fall back
//!   to the originals)
//! - **skip** — do not run; report `"[skipped]"` as a success
//!
//! The session admits one paused call at a time. Concurrent calls that
//! both hit breakpoints wait their turn instead of interleaving prompts.

use async_trait::async_trait;
use conductor_core::message::Message;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Everything a debugger gets to look at while a call is paused.
#[derive(Debug, Clone, Serialize)]
pub struct BreakpointContext {
    pub tool_name: String,
    pub call_id: String,
    pub arguments: Map<String, Value>,
    /// Prompt of the `input()` call in progress.
    pub prompt: String,
    pub iteration: u32,
    /// Conversation up to and including the assistant message that asked
    /// for this call.
    pub conversation: Vec<Message>,
    /// Tools dispatched earlier in this agent's trace, oldest first.
    pub previous_tools: Vec<String>,
}

impl BreakpointContext {
    /// Field-per-line rendering for terminals.
    pub fn render_verbose(&self) -> String {
        let mut out = format!(
            "⏸ breakpoint: {} [{}] (iteration {})\n",
            self.tool_name, self.call_id, self.iteration
        );
        out.push_str(&format!("    prompt: {}\n", self.prompt));
        if self.arguments.is_empty() {
            out.push_str("    arguments: (none)\n");
        } else {
            out.push_str("    arguments:\n");
            for (key, value) in &self.arguments {
                out.push_str(&format!("      {key} = {value}\n"));
            }
        }
        out.push_str(&format!("    messages so far: {}\n", self.conversation.len()));
        if !self.previous_tools.is_empty() {
            out.push_str(&format!(
                "    previous tools: {}\n",
                self.previous_tools.join(", ")
            ));
        }
        out
    }
}

/// A debugger's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointCommand {
    Continue,
    /// Replacement arguments: a JSON object, or a string holding one.
    Edit(Value),
    Skip,
}

impl BreakpointCommand {
    /// Parse a terminal command: `c`/`continue`, `s`/`skip`,
    /// `e <json>`/`edit <json>`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "c" | "continue" => Some(Self::Continue),
            "s" | "skip" => Some(Self::Skip),
            "e" | "edit" => Some(Self::Edit(Value::String(rest.to_string()))),
            _ => None,
        }
    }
}

/// What dispatch should do once a breakpoint has been answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Run(Map<String, Value>),
    Skip,
}

/// Turn edit input into an argument map.
pub fn parse_edit(edit: &Value) -> Result<Map<String, Value>, String> {
    match edit {
        Value::Object(map) => Ok(map.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!("expected a JSON object, got {other}")),
            Err(e) => Err(e.to_string()),
        },
        other => Err(format!("expected a JSON object, got {other}")),
    }
}

fn resolve(command: BreakpointCommand, original: &Map<String, Value>) -> Resolution {
    match command {
        BreakpointCommand::Continue => Resolution::Run(original.clone()),
        BreakpointCommand::Skip => Resolution::Skip,
        BreakpointCommand::Edit(edit) => match parse_edit(&edit) {
            Ok(arguments) => Resolution::Run(arguments),
            Err(reason) => {
                warn!(%reason, "Malformed breakpoint edit, keeping original arguments");
                Resolution::Run(original.clone())
            }
        },
    }
}

/// Something that answers breakpoints.
#[async_trait]
pub trait BreakpointHandler: Send + Sync {
    async fn decide(&self, context: &BreakpointContext) -> BreakpointCommand;
}

/// The per-agent breakpoint slot.
#[derive(Debug, Default)]
pub struct BreakpointSession {
    turn: tokio::sync::Mutex<()>,
    current: Mutex<Option<BreakpointContext>>,
}

/// Empties the slot however the wait ends, including cancellation.
struct ClearOnDrop<'a>(&'a BreakpointSession);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.slot() = None;
    }
}

impl BreakpointSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<BreakpointContext>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The call currently paused, if any.
    pub fn current(&self) -> Option<BreakpointContext> {
        self.slot().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.slot().is_some()
    }

    /// Occupy the slot with `context`, wait for `handler`, then clear it.
    pub async fn intercept(
        &self,
        context: BreakpointContext,
        handler: &dyn BreakpointHandler,
    ) -> Resolution {
        let _turn = self.turn.lock().await;
        *self.slot() = Some(context.clone());
        let _clear = ClearOnDrop(self);

        debug!(tool = %context.tool_name, call_id = %context.call_id, "Paused at breakpoint");
        let command = handler.decide(&context).await;
        debug!(tool = %context.tool_name, ?command, "Breakpoint resolved");

        resolve(command, &context.arguments)
    }
}

/// A paused call waiting for an answer over a channel.
#[derive(Debug)]
pub struct BreakpointRequest {
    pub context: BreakpointContext,
    reply: oneshot::Sender<BreakpointCommand>,
}

impl BreakpointRequest {
    pub fn respond(self, command: BreakpointCommand) {
        // The dispatcher may have been dropped meanwhile
        let _ = self.reply.send(command);
    }
}

/// Breakpoint handler that forwards every pause to a receiver, for UIs and
/// other programmatic debuggers. If the receiving side goes away, paused
/// calls continue with their original arguments.
#[derive(Debug, Clone)]
pub struct ChannelBreakpoints {
    requests: mpsc::Sender<BreakpointRequest>,
}

impl ChannelBreakpoints {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BreakpointRequest>) {
        let (requests, rx) = mpsc::channel(capacity);
        (Self { requests }, rx)
    }
}

#[async_trait]
impl BreakpointHandler for ChannelBreakpoints {
    async fn decide(&self, context: &BreakpointContext) -> BreakpointCommand {
        let (reply, answer) = oneshot::channel();
        let request = BreakpointRequest {
            context: context.clone(),
            reply,
        };

        if self.requests.send(request).await.is_err() {
            warn!(tool = %context.tool_name, "Breakpoint channel closed, continuing");
            return BreakpointCommand::Continue;
        }

        answer.await.unwrap_or_else(|_| {
            warn!(tool = %context.tool_name, "Breakpoint request dropped, continuing");
            BreakpointCommand::Continue
        })
    }
}

/// Breakpoint handler that replays a fixed list of commands, then
/// continues. Records every context it was shown.
#[derive(Debug, Default)]
pub struct ScriptedBreakpoints {
    commands: Mutex<VecDeque<BreakpointCommand>>,
    seen: Mutex<Vec<BreakpointContext>>,
}

impl ScriptedBreakpoints {
    pub fn new(commands: impl IntoIterator<Item = BreakpointCommand>) -> Self {
        Self {
            commands: Mutex::new(commands.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Contexts handed to this handler so far.
    pub fn seen(&self) -> Vec<BreakpointContext> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl BreakpointHandler for ScriptedBreakpoints {
    async fn decide(&self, context: &BreakpointContext) -> BreakpointCommand {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(context.clone());
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(BreakpointCommand::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn context(tool: &str) -> BreakpointContext {
        let mut arguments = Map::new();
        arguments.insert("path".into(), json!("/tmp/a"));
        BreakpointContext {
            tool_name: tool.into(),
            call_id: format!("call_{tool}"),
            arguments,
            prompt: "clean up".into(),
            iteration: 0,
            conversation: vec![Message::user("clean up")],
            previous_tools: vec!["list".into()],
        }
    }

    #[test]
    fn parses_terminal_commands() {
        assert_eq!(BreakpointCommand::parse("c"), Some(BreakpointCommand::Continue));
        assert_eq!(BreakpointCommand::parse(" SKIP "), Some(BreakpointCommand::Skip));
        assert_eq!(
            BreakpointCommand::parse(r#"edit {"path": "/tmp/b"}"#),
            Some(BreakpointCommand::Edit(json!(r#"{"path": "/tmp/b"}"#)))
        );
        assert_eq!(BreakpointCommand::parse("launch"), None);
    }

    #[test]
    fn edit_parsing_accepts_objects_only() {
        assert!(parse_edit(&json!({"a": 1})).is_ok());
        assert_eq!(parse_edit(&json!(r#"{"a": 1}"#)).unwrap()["a"], 1);
        assert!(parse_edit(&json!("[1, 2]")).is_err());
        assert!(parse_edit(&json!("{oops")).is_err());
        assert!(parse_edit(&json!(42)).is_err());
    }

    #[tokio::test]
    async fn malformed_edit_keeps_original_arguments() {
        let session = BreakpointSession::new();
        let handler = ScriptedBreakpoints::new([BreakpointCommand::Edit(json!("{not json"))]);
        let resolution = session.intercept(context("rm"), &handler).await;
        assert_eq!(resolution, Resolution::Run(context("rm").arguments));
    }

    #[tokio::test]
    async fn session_is_cleared_after_decision() {
        let session = BreakpointSession::new();
        let handler = ScriptedBreakpoints::new([BreakpointCommand::Skip]);
        assert_eq!(session.intercept(context("rm"), &handler).await, Resolution::Skip);
        assert!(!session.is_paused());
        assert_eq!(handler.seen().len(), 1);
        assert_eq!(handler.seen()[0].previous_tools, vec!["list"]);
    }

    #[tokio::test]
    async fn channel_handler_round_trip() {
        let session = Arc::new(BreakpointSession::new());
        let (handler, mut requests) = ChannelBreakpoints::new(4);

        let paused = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.intercept(context("rm"), &handler).await })
        };

        let request = requests.recv().await.unwrap();
        assert_eq!(request.context.tool_name, "rm");
        assert_eq!(session.current().unwrap().call_id, "call_rm");
        request.respond(BreakpointCommand::Edit(json!({"path": "/tmp/safe"})));

        let resolution = paused.await.unwrap();
        let Resolution::Run(arguments) = resolution else {
            panic!("expected the call to run");
        };
        assert_eq!(arguments["path"], "/tmp/safe");
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn closed_channel_continues() {
        let session = BreakpointSession::new();
        let (handler, requests) = ChannelBreakpoints::new(1);
        drop(requests);
        let resolution = session.intercept(context("rm"), &handler).await;
        assert!(matches!(resolution, Resolution::Run(_)));
    }

    #[test]
    fn verbose_rendering_lists_fields() {
        let text = context("rm").render_verbose();
        assert!(text.contains("breakpoint: rm [call_rm]"));
        assert!(text.contains(r#"path = "/tmp/a""#));
        assert!(text.contains("previous tools: list"));
    }
}
