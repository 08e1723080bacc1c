//! Handler interface implemented by every tool.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tool_primitives::ErrorKind;

/// Result alias for tool handlers.
pub type ToolResult<T> = Result<T, ToolError>;

/// Trait implemented by tool handlers.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Runs the tool with the given JSON arguments, returning JSON output.
    async fn invoke(&self, arguments: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, arguments: Value) -> ToolResult<Value> {
        (self)(arguments).await
    }
}

/// Errors returned by tool handlers.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The handler could not interpret its arguments.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The handler classified the failure itself.
    #[error("{message}")]
    Failed {
        /// Classification reported to the caller.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
        /// Optional structured context.
        details: Option<Value>,
    },

    /// Unclassified execution failure.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an invalid-arguments error.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates a classified failure.
    #[must_use]
    pub fn failed(kind: ErrorKind, message: impl Into<String>, details: Option<Value>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
            details,
        }
    }

    /// Returns the kind reported in the error envelope.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::Failed { kind, .. } => *kind,
            Self::Execution { .. } => ErrorKind::HandlerFailure,
        }
    }

    /// Returns structured details, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Failed { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_arguments(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            ToolError::invalid_arguments("x").kind(),
            ErrorKind::InvalidArguments
        );
        assert_eq!(ToolError::execution("x").kind(), ErrorKind::HandlerFailure);
        let failed = ToolError::failed(
            ErrorKind::ProviderRejected,
            "denied",
            Some(json!({"provider": "aws"})),
        );
        assert_eq!(failed.kind(), ErrorKind::ProviderRejected);
        assert_eq!(failed.to_string(), "denied");
        assert_eq!(failed.details(), Some(&json!({"provider": "aws"})));
    }

    #[tokio::test]
    async fn closures_are_tools() {
        let tool = |input: Value| async move { Ok::<_, ToolError>(json!({ "echo": input })) };
        let out = tool.invoke(json!(1)).await.unwrap();
        assert_eq!(out, json!({"echo": 1}));
    }
}
