//! Core shared types for the toolbox dispatch core.

#![warn(missing_docs, clippy::pedantic)]

mod envelope;
mod environment;
mod error;
mod name;

/// Invocation request, result envelope, and error taxonomy.
pub use envelope::{ErrorKind, InvocationRequest, InvocationResult};
/// Read access to process-style environment variables.
pub use environment::{Environment, MapEnvironment, ProcessEnvironment};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Validated tool identifier.
pub use name::ToolName;
