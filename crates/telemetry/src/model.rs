//! Data model for the execution trace.

use chrono::{DateTime, Utc};
use conductor_core::tool::{ToolResult, ToolStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ── TraceEntry ────────────────────────────────────────────────────────────

/// One tool dispatch, as it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unique identifier.
    pub id: String,
    /// Tool that was requested.
    pub tool_name: String,
    /// Provider call id the dispatch answered.
    pub call_id: String,
    /// Arguments the tool actually ran with (after any breakpoint edit).
    pub arguments: Map<String, Value>,
    /// What came back.
    pub result: ToolResult,
    /// Wall time spent in the tool, in milliseconds.
    pub elapsed_ms: u64,
    /// Mirrors `result.status()` for cheap filtering.
    pub status: ToolStatus,
    /// Loop iteration the call belonged to.
    pub iteration: u32,
    /// When the dispatch settled.
    pub timestamp: DateTime<Utc>,
}

impl TraceEntry {
    pub fn new(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: Map<String, Value>,
        result: ToolResult,
        elapsed_ms: u64,
        iteration: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            arguments,
            status: result.status(),
            result,
            elapsed_ms,
            iteration,
            timestamp: Utc::now(),
        }
    }

    /// One-line rendering with truncated previews.
    pub fn summary(&self, preview_chars: usize) -> String {
        format!(
            "{} {}({}) → {}  [{} ms, iter {}]",
            self.status.glyph(),
            self.tool_name,
            preview(&Value::Object(self.arguments.clone()).to_string(), preview_chars),
            preview(&self.result.to_content(), preview_chars),
            self.elapsed_ms,
            self.iteration,
        )
    }
}

/// Truncate `text` to at most `max_chars` characters, marking the cut.
/// Newlines are flattened so previews stay on one line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let kept: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn status_follows_result() {
        let entry = TraceEntry::new("add", "c1", Map::new(), ToolResult::error("boom"), 3, 0);
        assert_eq!(entry.status, ToolStatus::Error);
        assert!(entry.summary(20).starts_with('✗'));
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééééé", 4), "ééé…");
        assert_eq!(preview("a\nb", 10), "a b");
    }

    #[test]
    fn summary_includes_previews_and_timing() {
        let entry = TraceEntry::new(
            "add",
            "c1",
            args(json!({"a": 5, "b": 3})),
            ToolResult::success(json!(8)),
            2,
            1,
        );
        let line = entry.summary(80);
        assert!(line.starts_with("✓ add("));
        assert!(line.contains(r#""a":5"#));
        assert!(line.contains("→ 8"));
        assert!(line.contains("[2 ms, iter 1]"));
    }

    #[test]
    fn entry_serializes_with_tagged_result() {
        let entry = TraceEntry::new("x", "c", Map::new(), ToolResult::not_found("x"), 0, 0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["result"]["status"], "not_found");
    }
}
