//! Behavior log — the coarse, persistable story of each `input()` call.
//!
//! Every call emits, in order: the input, each provider response, each
//! tool call, and the final output. The persisted form is a JSON array of
//! these events. Sinks report write failures to the caller, which logs
//! them and carries on.

use crate::TelemetryError;
use chrono::{DateTime, Utc};
use conductor_core::message::ToolCall;
use conductor_core::tool::ToolStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BehaviorEventKind {
    InputReceived {
        prompt: String,
    },
    ProviderResponse {
        iteration: u32,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
        latency_ms: u64,
    },
    ToolCall {
        iteration: u32,
        call_id: String,
        tool_name: String,
        arguments: Map<String, Value>,
        status: ToolStatus,
        output: String,
    },
    FinalOutput {
        output: String,
        iterations: u32,
        exhausted: bool,
        /// Set when the provider failed and the call returned an error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// A timestamped behavior event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub timestamp: DateTime<Utc>,
    /// Conversation the event belongs to.
    pub session: String,
    #[serde(flatten)]
    pub kind: BehaviorEventKind,
}

impl BehaviorEvent {
    pub fn new(session: impl Into<String>, kind: BehaviorEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            session: session.into(),
            kind,
        }
    }

    /// Short label for listings.
    pub fn label(&self) -> &'static str {
        match self.kind {
            BehaviorEventKind::InputReceived { .. } => "input",
            BehaviorEventKind::ProviderResponse { .. } => "response",
            BehaviorEventKind::ToolCall { .. } => "tool",
            BehaviorEventKind::FinalOutput { .. } => "output",
        }
    }
}

/// Trait for behavior log sinks (where events are written).
pub trait BehaviorLog: Send + Sync {
    fn record(&self, event: &BehaviorEvent) -> Result<(), TelemetryError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory behavior log. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryBehaviorLog {
    events: Mutex<Vec<BehaviorEvent>>,
}

impl MemoryBehaviorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BehaviorEvent> {
        lock(&self.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl BehaviorLog for MemoryBehaviorLog {
    fn record(&self, event: &BehaviorEvent) -> Result<(), TelemetryError> {
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

/// File-backed behavior log: one JSON array, atomically replaced on every
/// event so each event is durable on its own.
#[derive(Debug)]
pub struct JsonFileBehaviorLog {
    path: PathBuf,
    events: Mutex<Vec<BehaviorEvent>>,
}

impl JsonFileBehaviorLog {
    /// Open a log at `path`, continuing any events already stored there.
    ///
    /// A missing file starts an empty log. A file that does not parse is
    /// moved aside to `<name>.corrupt` before starting fresh.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let events = match read_events(&path) {
            Ok(events) => events,
            Err(TelemetryError::Read { .. }) => Vec::new(),
            Err(e) => {
                let aside = sibling(&path, ".corrupt");
                match std::fs::rename(&path, &aside) {
                    Ok(()) => warn!(
                        path = %path.display(),
                        moved_to = %aside.display(),
                        error = %e,
                        "Behavior log does not parse; moved aside"
                    ),
                    Err(io) => warn!(
                        path = %path.display(),
                        error = %e,
                        rename_error = %io,
                        "Behavior log does not parse and could not be moved aside"
                    ),
                }
                Vec::new()
            }
        };
        debug!(path = %path.display(), count = events.len(), "Behavior log opened");
        Self {
            path,
            events: Mutex::new(events),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, events: &[BehaviorEvent]) -> Result<(), TelemetryError> {
        let write_err = |reason: String| TelemetryError::Write {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(events)?;

        // Write a sibling and rename it over the log; a crash mid-write
        // leaves the previous file intact.
        let tmp = sibling(&self.path, &format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let written = std::fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(content.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp, &self.path));

        written.map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_err(e.to_string())
        })
    }
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

impl BehaviorLog for JsonFileBehaviorLog {
    fn record(&self, event: &BehaviorEvent) -> Result<(), TelemetryError> {
        let mut events = lock(&self.events);
        events.push(event.clone());
        self.flush(&events)
    }
}

/// Load a persisted behavior log.
pub fn read_events(path: &Path) -> Result<Vec<BehaviorEvent>, TelemetryError> {
    let content = std::fs::read_to_string(path).map_err(|e| TelemetryError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}
