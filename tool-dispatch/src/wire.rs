//! JSON-RPC 2.0 mapping between request bodies and the dispatcher.
//!
//! Supported methods: `initialize`, `ping`, `tools/list`, `tools/call`.
//! `tools/call` answers with the invocation envelope both as text content and
//! as `structuredContent`, flagging failures through `isError`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tool_primitives::{InvocationRequest, InvocationResult};
use tracing::debug;

use crate::Dispatcher;

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Errors raised while decoding or encoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// The body was not valid JSON.
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// The body was JSON but not a request object.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    /// The method is not served.
    #[error("unknown method `{method}`")]
    MethodNotFound {
        /// Requested method name.
        method: String,
    },

    /// Parameters did not match the method.
    #[error("invalid params: {reason}")]
    InvalidParams {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A response could not be serialised.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl WireError {
    /// JSON-RPC error code for this failure.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => PARSE_ERROR,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::Encode(_) => INTERNAL_ERROR,
        }
    }
}

/// Incoming JSON-RPC request or notification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol marker, always `"2.0"`.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Request id; absent for notifications. An explicit `null` is kept as
    /// `Some(Value::Null)` and still gets a response.
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Builds a request with the given id.
    #[must_use]
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Builds a `tools/call` request.
    #[must_use]
    pub fn tool_call(id: impl Into<Value>, name: &str, arguments: Value) -> Self {
        Self::new(
            id,
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
    }
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Outgoing JSON-RPC response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    /// Protocol marker, always `"2.0"`.
    pub jsonrpc: String,
    /// Id echoed from the request, `null` when it could not be read.
    #[serde(default)]
    pub id: Value,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Error member of a JSON-RPC response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    /// JSON-RPC error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl RpcResponse {
    /// Successful response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response built from a [`WireError`].
    #[must_use]
    pub fn failure(id: Value, err: &WireError) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(RpcError {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}

fn jsonrpc_version() -> String {
    "2.0".to_owned()
}

/// Name and version reported by `initialize`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Extracts `(name, arguments)` from `tools/call` params.
///
/// # Errors
///
/// Returns [`WireError::InvalidParams`] when `name` is missing or not a string.
pub fn decode_call(params: Value) -> Result<InvocationRequest, WireError> {
    let params: ToolCallParams =
        serde_json::from_value(params).map_err(|err| WireError::InvalidParams {
            reason: err.to_string(),
        })?;
    Ok(InvocationRequest::new(params.name, params.arguments))
}

/// Encodes an envelope as a `tools/call` result.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if the envelope cannot be serialised.
pub fn encode_result(result: &InvocationResult) -> Result<Value, WireError> {
    let structured = serde_json::to_value(result).map_err(WireError::Encode)?;
    let text = serde_json::to_string(&structured).map_err(WireError::Encode)?;
    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
        "isError": !result.is_success(),
    }))
}

/// Routes JSON-RPC requests to a [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct RpcRouter {
    dispatcher: Dispatcher,
    info: ServerInfo,
}

impl RpcRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, info: ServerInfo) -> Self {
        Self { dispatcher, info }
    }

    /// Returns the underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handles a raw request body.
    ///
    /// Returns `Ok(None)` for notifications, which receive no response.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if the response cannot be serialised.
    pub async fn handle_body(&self, body: &[u8]) -> Result<Option<Vec<u8>>, WireError> {
        let response = match decode_request(body) {
            Ok(request) => self.handle(request).await,
            Err(err) => Some(RpcResponse::failure(Value::Null, &err)),
        };

        response
            .map(|response| serde_json::to_vec(&response).map_err(WireError::Encode))
            .transpose()
    }

    /// Handles a decoded request; `None` for notifications.
    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let RpcRequest {
            id, method, params, ..
        } = request;
        debug!(method = %method, "rpc request");

        let outcome = match method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": self.info,
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.dispatcher.registry().list() })),
            "tools/call" => match decode_call(params) {
                Ok(call) => encode_result(&self.dispatcher.invoke(call).await),
                Err(err) => Err(err),
            },
            _ => Err(WireError::MethodNotFound { method }),
        };

        let id = id?;
        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(err) => RpcResponse::failure(id, &err),
        })
    }
}

fn decode_request(body: &[u8]) -> Result<RpcRequest, WireError> {
    let value: Value = serde_json::from_slice(body).map_err(WireError::Parse)?;
    serde_json::from_value(value).map_err(WireError::InvalidRequest)
}
