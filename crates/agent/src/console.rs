//! Console progress rendering for domain events.

use conductor_core::event::{DomainEvent, EventBus};
use conductor_telemetry::preview;
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Render one event as console text, without a trailing newline.
///
/// Tool calls marked verbose get one line per argument plus the full
/// output; the rest get a single line with previews cut at
/// `preview_chars`.
pub fn render(event: &DomainEvent, preview_chars: usize) -> String {
    match event {
        DomainEvent::RequestSent {
            iteration,
            messages,
            tools,
            ..
        } => format!(
            "→ [iter {}] asking provider ({messages} messages, {tools} tools)",
            iteration + 1
        ),
        DomainEvent::ResponseReceived {
            iteration,
            latency_ms,
            tool_calls,
            ..
        } => {
            let what = match tool_calls {
                0 => "final answer".to_string(),
                1 => "1 tool call".to_string(),
                n => format!("{n} tool calls"),
            };
            format!("← [iter {}] {what} in {latency_ms} ms", iteration + 1)
        }
        DomainEvent::ToolCompleted {
            call_id,
            tool_name,
            status,
            elapsed_ms,
            arguments,
            output,
            verbose,
            ..
        } => {
            let glyph = status.glyph();
            if *verbose {
                let mut out = format!("  {glyph} {tool_name} [{call_id}] {status} in {elapsed_ms} ms");
                for (key, value) in arguments {
                    out.push_str(&format!("\n      {key} = {value}"));
                }
                out.push_str(&format!("\n      => {output}"));
                out
            } else {
                let args = serde_json::Value::Object(arguments.clone()).to_string();
                format!(
                    "  {glyph} {tool_name}({}) → {} ({elapsed_ms} ms)",
                    preview(&args, preview_chars),
                    preview(output, preview_chars)
                )
            }
        }
        DomainEvent::Completed {
            iterations,
            exhausted: true,
            ..
        } => format!("⚠ iteration limit reached after {iterations} iterations, no answer"),
        DomainEvent::Completed {
            iterations,
            answer_chars,
            ..
        } => format!("✔ answered after {iterations} iterations ({answer_chars} chars)"),
    }
}

/// Print every event published on `bus` to `out` until the bus closes.
pub fn spawn_console<W>(bus: &EventBus, preview_chars: usize, mut out: W) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    // Console output is best-effort
                    let _ = writeln!(out, "{}", render(&event, preview_chars));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Console fell behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use conductor_core::tool::ToolStatus;
    use serde_json::{Map, json};

    fn tool_event(verbose: bool, output: &str) -> DomainEvent {
        let mut arguments = Map::new();
        arguments.insert("a".into(), json!(5));
        arguments.insert("b".into(), json!(3));
        DomainEvent::ToolCompleted {
            iteration: 0,
            call_id: "call_1".into(),
            tool_name: "add".into(),
            status: ToolStatus::Success,
            elapsed_ms: 2,
            arguments,
            output: output.into(),
            verbose,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn compact_tool_line() {
        let line = render(&tool_event(false, "8"), 80);
        assert_eq!(line, r#"  ✓ add({"a":5,"b":3}) → 8 (2 ms)"#);
    }

    #[test]
    fn compact_line_truncates_output() {
        let line = render(&tool_event(false, &"x".repeat(200)), 20);
        assert!(line.contains('…'));
        assert!(!line.contains(&"x".repeat(21)));
    }

    #[test]
    fn verbose_tool_lists_each_argument() {
        let text = render(&tool_event(true, "8"), 80);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("add [call_1] success"));
        assert_eq!(lines[1].trim(), "a = 5");
        assert_eq!(lines[2].trim(), "b = 3");
        assert_eq!(lines[3].trim(), "=> 8");
    }

    #[test]
    fn completion_lines() {
        let done = DomainEvent::Completed {
            iterations: 2,
            exhausted: false,
            answer_chars: 9,
            timestamp: Utc::now(),
        };
        assert!(render(&done, 80).contains("answered after 2 iterations"));

        let exhausted = DomainEvent::Completed {
            iterations: 10,
            exhausted: true,
            answer_chars: 0,
            timestamp: Utc::now(),
        };
        assert!(render(&exhausted, 80).contains("iteration limit"));
    }

    #[test]
    fn response_counts_calls() {
        let event = DomainEvent::ResponseReceived {
            iteration: 1,
            latency_ms: 40,
            tool_calls: 3,
            timestamp: Utc::now(),
        };
        assert_eq!(render(&event, 80), "← [iter 2] 3 tool calls in 40 ms");
    }
}
