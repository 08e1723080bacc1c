//! Invocation requests and the structured result envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification attached to every error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No tool is registered under the requested name.
    UnknownTool,
    /// The arguments did not match what the tool expects.
    InvalidArguments,
    /// A required credential source (environment value, key file) is absent.
    MissingCredentialSource,
    /// The credential payload could not be parsed or lacks required fields.
    MalformedCredential,
    /// The provider refused the credential during live verification.
    ProviderRejected,
    /// Any other fault raised while the handler was running.
    HandlerFailure,
}

impl ErrorKind {
    /// Returns the wire representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::InvalidArguments => "invalid_arguments",
            Self::MissingCredentialSource => "missing_credential_source",
            Self::MalformedCredential => "malformed_credential",
            Self::ProviderRejected => "provider_rejected",
            Self::HandlerFailure => "handler_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to run a named tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    tool_name: String,
    #[serde(default)]
    arguments: Value,
}

impl InvocationRequest {
    /// Creates a request; `null` arguments are normalised to an empty object.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Returns the requested tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the argument payload.
    #[must_use]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Splits the request into its name and arguments.
    #[must_use]
    pub fn into_parts(self) -> (String, Value) {
        (self.tool_name, self.arguments)
    }
}

/// Structured outcome returned for every invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationResult {
    /// The handler completed and produced a payload.
    Success {
        /// Value returned by the handler.
        payload: Value,
    },
    /// The invocation failed; the fault has been normalised.
    Error {
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
        /// Optional structured context (e.g. missing field names).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

impl InvocationResult {
    /// Wraps a successful payload.
    #[must_use]
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    /// Builds an error envelope without details.
    #[must_use]
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details to an error envelope. No-op on success.
    #[must_use]
    pub fn with_details(mut self, value: Value) -> Self {
        if let Self::Error { details, .. } = &mut self {
            *details = Some(value);
        }
        self
    }

    /// Returns `true` for the success variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the payload when successful.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error kind when failed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    /// Returns the error details when present.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Error { details, .. } => details.as_ref(),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_arguments_become_empty_object() {
        let request = InvocationRequest::new("print_env", Value::Null);
        assert_eq!(request.arguments(), &json!({}));
    }

    #[test]
    fn envelopes_carry_status_tag() {
        let ok = serde_json::to_value(InvocationResult::success(json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"status": "success", "payload": {"a": 1}}));

        let err = InvocationResult::error(ErrorKind::UnknownTool, "tool `x` is not registered");
        assert_eq!(
            serde_json::to_value(err).unwrap(),
            json!({
                "status": "error",
                "kind": "unknown_tool",
                "message": "tool `x` is not registered",
            })
        );
    }

    #[test]
    fn details_only_attach_to_errors() {
        let err = InvocationResult::error(ErrorKind::MalformedCredential, "bad")
            .with_details(json!({"missing_fields": ["private_key"]}));
        assert_eq!(
            err.details(),
            Some(&json!({"missing_fields": ["private_key"]}))
        );

        let ok = InvocationResult::success(Value::Null).with_details(json!({}));
        assert!(ok.details().is_none());
    }

    #[test]
    fn kind_display_matches_serde() {
        let kind = ErrorKind::MissingCredentialSource;
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            Value::String(kind.to_string())
        );
    }
}
