//! Central catch-and-wrap boundary for tool handlers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::{Value, json};
use tool_primitives::{ErrorKind, InvocationRequest, InvocationResult};
use tool_registry::{ToolDescriptor, ToolError, ToolRegistry};
use tracing::{Instrument, debug, info, info_span, warn};

/// Runs tools from a read-only registry.
///
/// Cloning is cheap; clones share the registry and hold no other state, so
/// any number of invocations may be in flight at once.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over a fully populated registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invokes `name` with `arguments`.
    pub async fn call(&self, name: &str, arguments: Value) -> InvocationResult {
        self.invoke(InvocationRequest::new(name, arguments)).await
    }

    /// Runs a request to completion and returns its envelope.
    ///
    /// Never fails: unknown tools, argument mismatches, handler errors, and
    /// handler panics all come back as [`InvocationResult::Error`].
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let (name, arguments) = request.into_parts();
        let span = info_span!("tool_invoke", tool = %name);

        async move {
            let started = Instant::now();
            let result = self.run(&name, arguments).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                InvocationResult::Success { .. } => {
                    info!(elapsed_ms, "tool invocation succeeded");
                }
                InvocationResult::Error { kind, message, .. } => {
                    warn!(elapsed_ms, kind = %kind, error = %message, "tool invocation failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, name: &str, arguments: Value) -> InvocationResult {
        let definition = match self.registry.lookup(name) {
            Ok(definition) => definition,
            Err(err) => return InvocationResult::error(ErrorKind::UnknownTool, err.to_string()),
        };

        if let Err(rejection) = check_arguments(definition.descriptor(), &arguments) {
            return rejection;
        }

        let handler = definition.handler();
        debug!("dispatching to handler");

        match AssertUnwindSafe(handler.invoke(arguments))
            .catch_unwind()
            .await
        {
            Ok(Ok(payload)) => InvocationResult::success(payload),
            Ok(Err(err)) => wrap_tool_error(err),
            Err(panic) => InvocationResult::error(
                ErrorKind::HandlerFailure,
                format!("tool `{name}` panicked: {}", panic_message(panic.as_ref())),
            ),
        }
    }
}

fn check_arguments(descriptor: &ToolDescriptor, arguments: &Value) -> Result<(), InvocationResult> {
    let Some(object) = arguments.as_object() else {
        return Err(InvocationResult::error(
            ErrorKind::InvalidArguments,
            "arguments must be a JSON object",
        ));
    };

    let missing: Vec<&str> = descriptor
        .required_arguments()
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(InvocationResult::error(
            ErrorKind::InvalidArguments,
            format!("missing required arguments: {}", missing.join(", ")),
        )
        .with_details(json!({ "missing_arguments": missing })))
    }
}

fn wrap_tool_error(err: ToolError) -> InvocationResult {
    let kind = err.kind();
    let message = err.to_string();
    match err {
        ToolError::Failed {
            details: Some(details),
            ..
        } => InvocationResult::error(kind, message).with_details(details),
        _ => InvocationResult::error(kind, message),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
