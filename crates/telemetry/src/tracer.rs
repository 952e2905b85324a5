//! Thread-safe execution tracer — the append-only log of tool dispatches.

use crate::model::TraceEntry;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Append-only record of every tool dispatch for one agent.
///
/// Concurrent dispatches within a turn append through a shared reference,
/// so entries land in settle order. Nothing ever mutates an entry after it
/// has been recorded; [`clear`](Self::clear) is the only way to shrink it.
#[derive(Debug, Default)]
pub struct ExecutionTracer {
    entries: RwLock<Vec<TraceEntry>>,
}

impl ExecutionTracer {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic inside a reader cannot leave the Vec half-written, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Vec<TraceEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TraceEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry.
    pub fn record(&self, entry: TraceEntry) {
        tracing::debug!(
            tool = %entry.tool_name,
            status = %entry.status,
            elapsed_ms = entry.elapsed_ms,
            "Trace entry recorded"
        );
        self.write().push(entry);
    }

    /// Snapshot of all entries in recording order.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// The most recent dispatch of `tool_name`.
    pub fn last_for(&self, tool_name: &str) -> Option<TraceEntry> {
        self.read()
            .iter()
            .rev()
            .find(|e| e.tool_name == tool_name)
            .cloned()
    }

    /// Names of every dispatched tool, in order, repeats included.
    pub fn tool_names(&self) -> Vec<String> {
        self.read().iter().map(|e| e.tool_name.clone()).collect()
    }

    /// Human-readable numbered listing.
    pub fn render(&self, preview_chars: usize) -> String {
        let entries = self.read();
        if entries.is_empty() {
            return "Execution trace: no tool calls recorded".to_string();
        }

        let mut out = format!("Execution trace ({} calls)\n", entries.len());
        for (i, entry) in entries.iter().enumerate() {
            out.push_str(&format!("{:>4}. {}\n", i + 1, entry.summary(preview_chars)));
        }
        out
    }

    /// The whole trace as a JSON array.
    pub fn to_json(&self) -> Result<String, crate::TelemetryError> {
        Ok(serde_json::to_string_pretty(&*self.read())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::tool::{ToolResult, ToolStatus};
    use serde_json::{Map, json};

    fn entry(name: &str, result: ToolResult) -> TraceEntry {
        TraceEntry::new(name, format!("call_{name}"), Map::new(), result, 1, 0)
    }

    #[test]
    fn records_in_order_and_clears() {
        let tracer = ExecutionTracer::new();
        tracer.record(entry("a", ToolResult::success(json!(1))));
        tracer.record(entry("b", ToolResult::error("nope")));
        tracer.record(entry("c", ToolResult::not_found("c")));

        let statuses: Vec<ToolStatus> = tracer.entries().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![ToolStatus::Success, ToolStatus::Error, ToolStatus::NotFound]
        );
        assert_eq!(tracer.tool_names(), vec!["a", "b", "c"]);

        tracer.clear();
        assert!(tracer.is_empty());
    }

    #[test]
    fn last_for_finds_most_recent() {
        let tracer = ExecutionTracer::new();
        tracer.record(entry("a", ToolResult::success(json!(1))));
        tracer.record(entry("b", ToolResult::success(json!(2))));
        tracer.record(entry("a", ToolResult::success(json!(3))));

        let last = tracer.last_for("a").unwrap();
        assert_eq!(last.result, ToolResult::success(json!(3)));
        assert!(tracer.last_for("zzz").is_none());
    }

    #[test]
    fn render_lists_every_entry() {
        let tracer = ExecutionTracer::new();
        assert!(tracer.render(40).contains("no tool calls"));

        tracer.record(entry("a", ToolResult::success(json!("x".repeat(100)))));
        tracer.record(entry("b", ToolResult::error("bad")));
        let text = tracer.render(20);
        assert!(text.contains("(2 calls)"));
        assert!(text.contains("1. ✓ a("));
        assert!(text.contains("2. ✗ b("));
        assert!(text.contains('…'));
    }

    #[test]
    fn to_json_is_an_array() {
        let tracer = ExecutionTracer::new();
        tracer.record(entry("a", ToolResult::success(json!(1))));
        let parsed: serde_json::Value = serde_json::from_str(&tracer.to_json().unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }
}
