//! # Conductor Core
//!
//! Domain types, traits, and error definitions for the Conductor agent
//! orchestration runtime. This crate has **no runtime wiring** — it defines
//! the vocabulary that the loop, the tracer, and the CLI share.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration loop is a trait here:
//! - [`Provider`] turns a conversation plus tool definitions into a response
//! - [`Tool`] is a named, schema-described, invokable capability
//!
//! Implementations live with their callers, which keeps the loop testable
//! with scripted providers and in-process tools.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role, ToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use schema::{Param, ParamType, ToolArgs};
pub use tool::{FnTool, Tool, ToolRegistry, ToolResult, ToolSource, ToolStatus, Toolbox};
