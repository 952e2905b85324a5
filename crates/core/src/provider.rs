//! Provider trait — the abstraction over completion backends.
//!
//! A Provider receives the whole conversation plus the schemas of every
//! registered tool, and answers with text, tool-call requests, or both.
//! It must not mutate the conversation it is given; the request owns a
//! snapshot for exactly that reason.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::{Message, ToolCall};

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the provider so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text. `None` together with no tool calls is an empty answer.
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls the model wants executed this turn
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded
    #[serde(default)]
    pub model: String,
}

impl ProviderResponse {
    /// A terminal text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A turn that requests tool calls.
    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The orchestration loop calls `complete()` without knowing which backend
/// answers. Any error returned here aborts the current `input()` call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_without_content_deserializes() {
        let resp: ProviderResponse = serde_json::from_str(
            r#"{"tool_calls": [{"id": "c1", "name": "add", "arguments": {"a": 1, "b": 2}}]}"#,
        )
        .unwrap();
        assert!(resp.content.is_none());
        assert!(resp.has_tool_calls());
        assert_eq!(resp.tool_calls[0].arguments["b"], 2);
    }

    #[test]
    fn text_response_has_no_calls() {
        let resp = ProviderResponse::text("done");
        assert_eq!(resp.content.as_deref(), Some("done"));
        assert!(!resp.has_tool_calls());
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "add".into(),
            description: "Add two numbers".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number" }
                },
                "required": ["a"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("add"));
        assert!(json.contains("required"));
    }
}
