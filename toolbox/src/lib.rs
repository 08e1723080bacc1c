//! Tool-invocation dispatch core.
//!
//! Depend on this crate to get the registry, dispatcher, credential
//! verification and built-in tools behind feature flags, so downstream users
//! can enable only the components they need.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use toolbox::builtins::register_builtins;
//! use toolbox::config::ToolboxConfig;
//! use toolbox::dispatch::Dispatcher;
//! use toolbox::primitives::ProcessEnvironment;
//! use toolbox::registry::ToolRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = ToolRegistry::new();
//! register_builtins(&mut registry, &ToolboxConfig::default(), Arc::new(ProcessEnvironment))?;
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//! let result = dispatcher.call("sleep", serde_json::json!({ "duration": 1 })).await;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use tool_primitives as primitives;

/// Tool registration and lookup (enabled by `registry` feature).
#[cfg(feature = "registry")]
pub use tool_registry as registry;

/// Dispatcher and JSON-RPC codec (enabled by `dispatch` feature).
#[cfg(feature = "dispatch")]
pub use tool_dispatch as dispatch;

/// Cloud credential verification (enabled by `credentials` feature).
#[cfg(feature = "credentials")]
pub use tool_credentials as credentials;

/// Built-in tools (enabled by `builtins` feature).
#[cfg(feature = "builtins")]
pub use tool_builtins as builtins;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use tool_config as config;

/// Tracing setup and health reporting (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use tool_telemetry as telemetry;
