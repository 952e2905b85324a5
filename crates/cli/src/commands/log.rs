//! `conductor log` — print a persisted behavior log.

use conductor_config::AppConfig;
use conductor_telemetry::{BehaviorEvent, BehaviorEventKind, preview, read_events};
use std::path::PathBuf;

const PREVIEW: usize = 72;

pub async fn run(
    path: Option<PathBuf>,
    tail: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => path,
        None => AppConfig::load()?.behavior_log.resolved_path(),
    };

    let events = read_events(&path)?;
    let skip = tail.map_or(0, |n| events.len().saturating_sub(n));
    let shown = &events[skip..];

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    println!("📜 Behavior log: {} ({} events)", path.display(), events.len());
    println!("─────────────────────────────────────");
    for event in shown {
        println!("{}", format_event(event));
    }
    Ok(())
}

/// One line per event.
pub fn format_event(event: &BehaviorEvent) -> String {
    let time = event.timestamp.format("%H:%M:%S");
    let detail = match &event.kind {
        BehaviorEventKind::InputReceived { prompt } => preview(prompt, PREVIEW),
        BehaviorEventKind::ProviderResponse {
            iteration,
            content,
            tool_calls,
            latency_ms,
        } => {
            if tool_calls.is_empty() {
                format!(
                    "iter {iteration}: {} ({latency_ms} ms)",
                    preview(content.as_deref().unwrap_or(""), PREVIEW)
                )
            } else {
                let names: Vec<_> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                format!("iter {iteration}: calls {} ({latency_ms} ms)", names.join(", "))
            }
        }
        BehaviorEventKind::ToolCall {
            tool_name,
            status,
            output,
            ..
        } => format!("{tool_name} [{status}] → {}", preview(output, PREVIEW)),
        BehaviorEventKind::FinalOutput {
            output,
            iterations,
            exhausted,
            error,
        } => match error {
            Some(error) => format!("failed after {iterations} iterations: {error}"),
            None if *exhausted => format!("no answer after {iterations} iterations"),
            None => format!("{} (after {iterations} iterations)", preview(output, PREVIEW)),
        },
    };
    format!("{time}  {:<8} {detail}", event.label())
}
