//! Runtime registry for tool descriptors and handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tool_primitives::ToolName;

use crate::tool::Tool;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Public description of a registered tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    name: ToolName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(
        rename = "inputSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    input_schema: Option<Value>,
}

impl ToolDescriptor {
    /// Creates a descriptor for the supplied name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidDefinition`] if the name fails
    /// validation.
    pub fn new(name: impl Into<String>) -> RegistryResult<Self> {
        let name = ToolName::new(name).map_err(|err| RegistryError::InvalidDefinition {
            reason: err.to_string(),
        })?;
        Ok(Self {
            name,
            description: None,
            input_schema: None,
        })
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the expected argument shape as a JSON schema object.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared input schema.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Value> {
        self.input_schema.as_ref()
    }

    /// Argument keys listed under the schema's `required` array.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .as_ref()
            .and_then(|schema| schema.get("required"))
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A descriptor bound to its handler.
#[derive(Clone)]
pub struct ToolDefinition {
    descriptor: ToolDescriptor,
    handler: Arc<dyn Tool>,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Binds a handler to its descriptor.
    #[must_use]
    pub fn new<T>(descriptor: ToolDescriptor, handler: T) -> Self
    where
        T: Tool + 'static,
    {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        self.descriptor.name()
    }

    /// Returns a shared handle to the handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.handler)
    }
}

/// Registry that stores tool definitions keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, ToolDefinition>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.tools.keys().map(ToolName::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is already present.
    pub fn register(&mut self, definition: ToolDefinition) -> RegistryResult<()> {
        let name = definition.name().clone();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName {
                name: name.into(),
            });
        }

        self.tools.insert(name, definition);
        Ok(())
    }

    /// Registers a handler under the supplied descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is already present.
    pub fn register_tool<T>(&mut self, descriptor: ToolDescriptor, tool: T) -> RegistryResult<()>
    where
        T: Tool + 'static,
    {
        self.register(ToolDefinition::new(descriptor, tool))
    }

    /// Returns the definition registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no tool has that name.
    pub fn lookup(&self, name: &str) -> RegistryResult<&ToolDefinition> {
        self.tools.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_owned(),
        })
    }

    /// Returns `true` when a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Lists the descriptors of all registered tools, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self
            .tools
            .values()
            .map(|definition| definition.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name().cmp(b.name()));
        descriptors
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Errors produced by tool registration and lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Tool descriptor failed validation.
    #[error("invalid tool definition: {reason}")]
    InvalidDefinition {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateName {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    NotFound {
        /// Name of the missing tool.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::tool::ToolError;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new("echo")
            .unwrap()
            .with_description("Echo incoming payload")
            .with_input_schema(json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"],
            }))
    }

    #[tokio::test]
    async fn register_and_lookup_tool() {
        let mut registry = ToolRegistry::new();
        registry
            .register_tool(descriptor(), |input: Value| async move { Ok::<_, ToolError>(input) })
            .unwrap();

        let definition = registry.lookup("echo").unwrap();
        assert_eq!(definition.descriptor().description(), Some("Echo incoming payload"));

        let payload = json!({ "message": "hello" });
        let output = definition.handler().invoke(payload.clone()).await.unwrap();
        assert_eq!(output, payload);
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut registry = ToolRegistry::new();
        registry
            .register_tool(descriptor(), |input: Value| async move { Ok::<_, ToolError>(input) })
            .unwrap();

        let err = registry
            .register_tool(ToolDescriptor::new("echo").unwrap(), |v: Value| async move {
                Ok(v)
            })
            .expect_err("duplicate registration should fail");

        assert_eq!(
            err,
            RegistryError::DuplicateName {
                name: "echo".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").expect_err("should be missing");
        assert!(matches!(err, RegistryError::NotFound { name } if name == "missing"));
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let err = ToolDescriptor::new("").expect_err("empty name should error");
        assert!(matches!(err, RegistryError::InvalidDefinition { .. }));
    }

    #[test]
    fn list_is_sorted_and_serialises_schema() {
        let mut registry = ToolRegistry::new();
        for name in ["sleep", "print_env", "fetch"] {
            registry
                .register_tool(ToolDescriptor::new(name).unwrap(), |_: Value| async move {
                    Err::<Value, _>(ToolError::execution("unused"))
                })
                .unwrap();
        }
        registry
            .register_tool(descriptor(), |input: Value| async move { Ok::<_, ToolError>(input) })
            .unwrap();

        let names: Vec<_> = registry
            .list()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["echo", "fetch", "print_env", "sleep"]);

        let echo = serde_json::to_value(registry.lookup("echo").unwrap().descriptor()).unwrap();
        assert_eq!(echo["inputSchema"]["required"], json!(["message"]));
        assert_eq!(
            registry.lookup("echo").unwrap().descriptor().required_arguments(),
            ["message"]
        );
    }
}
