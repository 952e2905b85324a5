//! Error types for the Conductor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Only provider failures ever cross the orchestration loop's boundary;
//! tool failures are folded into [`crate::tool::ToolResult`] by dispatch.

use thiserror::Error;

/// The top-level error type for all Conductor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Shorthand for a failure raised from inside a tool body.
    pub fn failed(tool_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::Timeout {
            tool_name: "fetch".into(),
            timeout_secs: 30,
        });
        assert!(err.to_string().contains("fetch"));
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn provider_errors_convert_with_question_mark() {
        fn call() -> Result<()> {
            let completed: std::result::Result<(), ProviderError> =
                Err(ProviderError::Timeout("no answer within 2s".into()));
            completed?;
            Ok(())
        }
        assert!(matches!(call(), Err(Error::Provider(ProviderError::Timeout(_)))));
    }

    #[test]
    fn failed_shorthand_keeps_reason() {
        let err = ToolError::failed("divide", "division by zero");
        assert_eq!(
            err.to_string(),
            "Tool execution failed: divide: division by zero"
        );
    }
}
