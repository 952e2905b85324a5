//! Domain event system — decoupled progress reporting.
//!
//! The orchestration loop publishes an event for every provider round-trip
//! and every settled tool call. Consoles, UIs and tests subscribe and render
//! what they care about without the loop knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::tool::ToolStatus;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A request is on its way to the provider
    RequestSent {
        iteration: u32,
        messages: usize,
        tools: usize,
        timestamp: DateTime<Utc>,
    },

    /// The provider answered
    ResponseReceived {
        iteration: u32,
        latency_ms: u64,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool call settled
    ToolCompleted {
        iteration: u32,
        call_id: String,
        tool_name: String,
        status: ToolStatus,
        elapsed_ms: u64,
        arguments: serde_json::Map<String, serde_json::Value>,
        output: String,
        /// Render every field instead of a one-line preview
        verbose: bool,
        timestamp: DateTime<Utc>,
    },

    /// An `input()` call finished
    Completed {
        iterations: u32,
        exhausted: bool,
        answer_chars: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
