//! Request routing for the HTTP shell.

use std::time::Duration;

use hyper::body::HttpBody as _;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::json;
use tokio::time::timeout;
use toolbox::dispatch::RpcRouter;
use toolbox::telemetry::health::HealthMonitor;
use tracing::{debug, error, warn};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

pub struct AppState {
    router: RpcRouter,
    health: HealthMonitor,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(router: RpcRouter, health: HealthMonitor, request_timeout: Duration) -> Self {
        Self {
            router,
            health,
            request_timeout,
        }
    }

    pub async fn route(&self, request: Request<Body>) -> Response<Body> {
        debug!(method = %request.method(), path = request.uri().path(), "http request");
        match (request.method(), request.uri().path()) {
            (&Method::GET, "/health") => self.health(),
            (&Method::POST, "/mcp") => self.rpc(request).await,
            (_, "/health" | "/mcp") => plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
            _ => plain(StatusCode::NOT_FOUND, "not found"),
        }
    }

    fn health(&self) -> Response<Body> {
        let tools = self.router.dispatcher().registry().len();
        match serde_json::to_vec(&self.health.report(tools)) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(err) => {
                error!(error = %err, "failed to encode health report");
                plain(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }

    async fn rpc(&self, request: Request<Body>) -> Response<Body> {
        if declared_length(&request).is_some_and(|length| length > MAX_BODY_BYTES) {
            return plain(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }

        let body = match read_capped(request.into_body()).await {
            Ok(body) => body,
            Err(BodyError::TooLarge) => {
                warn!(limit = MAX_BODY_BYTES, "request body exceeded limit");
                return plain(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            }
            Err(BodyError::Read(err)) => {
                warn!(error = %err, "failed to read request body");
                return plain(StatusCode::BAD_REQUEST, "unreadable body");
            }
        };

        match timeout(self.request_timeout, self.router.handle_body(&body)).await {
            Ok(Ok(Some(response))) => json_response(StatusCode::OK, response),
            Ok(Ok(None)) => empty(StatusCode::ACCEPTED),
            Ok(Err(err)) => {
                error!(error = %err, "failed to encode rpc response");
                plain(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
            Err(_) => {
                warn!(timeout_secs = self.request_timeout.as_secs(), "request timed out");
                let body = json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32000, "message": "request timed out" }
                });
                json_response(StatusCode::GATEWAY_TIMEOUT, body.to_string().into_bytes())
            }
        }
    }
}

enum BodyError {
    TooLarge,
    Read(hyper::Error),
}

/// Collects the body, stopping as soon as it grows past [`MAX_BODY_BYTES`].
/// Chunked bodies carry no `Content-Length`, so the cap is enforced here.
async fn read_capped(mut body: Body) -> Result<Vec<u8>, BodyError> {
    let mut collected = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if (collected.len() + chunk.len()) as u64 > MAX_BODY_BYTES {
            return Err(BodyError::TooLarge);
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(collected)
}

fn declared_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hyper::body::{Bytes, to_bytes};
    use serde_json::Value;
    use toolbox::dispatch::{Dispatcher, ServerInfo};
    use toolbox::registry::{ToolDescriptor, ToolError, ToolRegistry};

    use super::*;

    fn state(request_timeout: Duration) -> AppState {
        let mut registry = ToolRegistry::new();
        registry
            .register_tool(ToolDescriptor::new("echo").unwrap(), |input: Value| async move {
                Ok::<_, ToolError>(input)
            })
            .unwrap();
        registry
            .register_tool(ToolDescriptor::new("stall").unwrap(), |_: Value| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, ToolError>(Value::Null)
            })
            .unwrap();
        AppState::new(
            RpcRouter::new(
                Dispatcher::new(Arc::new(registry)),
                ServerInfo::new("toolbox", "test"),
            ),
            HealthMonitor::new("test"),
            request_timeout,
        )
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/mcp")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_tool_count() {
        let response = state(Duration::from_secs(5))
            .route(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tools"], 2);
    }

    #[tokio::test]
    async fn rpc_call_is_answered() {
        let response = state(Duration::from_secs(5))
            .route(post(
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["structuredContent"]["payload"]["x"], 1);
    }

    #[tokio::test]
    async fn notification_is_accepted_without_body() {
        let response = state(Duration::from_secs(5))
            .route(post(r#"{"jsonrpc":"2.0","method":"ping"}"#))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let response = state(Duration::from_secs(1))
            .route(post(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"stall"}}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let state = state(Duration::from_secs(5));
        let response = state
            .route(Request::get("/mcp").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = state
            .route(Request::get("/other").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn declared_oversize_body_is_rejected() {
        let request = Request::post("/mcp")
            .header(CONTENT_LENGTH, MAX_BODY_BYTES + 1)
            .body(Body::empty())
            .unwrap();
        let response = state(Duration::from_secs(5)).route(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn chunked_body_over_limit_is_rejected() {
        let (mut sender, body) = Body::channel();
        tokio::spawn(async move {
            let chunk = Bytes::from(vec![b' '; 64 * 1024]);
            for _ in 0..64 {
                if sender.send_data(chunk.clone()).await.is_err() {
                    break;
                }
            }
        });

        let request = Request::post("/mcp").body(body).unwrap();
        assert!(request.headers().get(CONTENT_LENGTH).is_none());
        let response = state(Duration::from_secs(5)).route(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
