//! Execution tracing and behavior logging for Conductor.
//!
//! Two append-only records of what an agent did:
//! - the [`ExecutionTracer`] keeps every tool dispatch (arguments, result,
//!   timing, status) in memory for inspection and replay
//! - a [`BehaviorLog`] sink receives the coarse input → response → tool →
//!   output events of every `input()` call and may persist them

pub mod behavior;
pub mod model;
pub mod tracer;

pub use behavior::{
    BehaviorEvent, BehaviorEventKind, BehaviorLog, JsonFileBehaviorLog, MemoryBehaviorLog,
    read_events,
};
pub use model::{TraceEntry, preview};
pub use tracer::ExecutionTracer;

use std::path::PathBuf;

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
