//! `print_env`: dumps the process environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tool_primitives::Environment;
use tool_registry::{RegistryResult, Tool, ToolDescriptor, ToolRegistry, ToolResult};

use crate::names::PRINT_ENV;

/// Returns every environment variable as a string-to-string object.
pub struct PrintEnv {
    env: Arc<dyn Environment>,
}

impl PrintEnv {
    /// Creates the tool over `env`.
    #[must_use]
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for PrintEnv {
    async fn invoke(&self, _arguments: Value) -> ToolResult<Value> {
        let vars: Map<String, Value> = self
            .env
            .snapshot()
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Ok(Value::Object(vars))
    }
}

pub(crate) fn register(registry: &mut ToolRegistry, env: Arc<dyn Environment>) -> RegistryResult<()> {
    let descriptor = ToolDescriptor::new(PRINT_ENV)?
        .with_description("Print the process environment variables as a name-to-value map.")
        .with_input_schema(json!({ "type": "object", "properties": {} }));
    registry.register_tool(descriptor, PrintEnv::new(env))
}

#[cfg(test)]
mod tests {
    use tool_primitives::MapEnvironment;

    use super::*;

    #[tokio::test]
    async fn dumps_every_variable() {
        let env = MapEnvironment::new()
            .with("HOME", "/home/ci")
            .with("EMPTY", "");
        let out = PrintEnv::new(Arc::new(env)).invoke(json!({})).await.unwrap();
        assert_eq!(out, json!({ "HOME": "/home/ci", "EMPTY": "" }));
    }

    #[tokio::test]
    async fn arguments_are_ignored() {
        let tool = PrintEnv::new(Arc::new(MapEnvironment::new()));
        assert_eq!(tool.invoke(json!({"extra": 1})).await.unwrap(), json!({}));
    }
}
