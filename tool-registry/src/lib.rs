//! Tool registration and lookup.
//!
//! A [`ToolRegistry`] is filled once at startup through `&mut self`, then
//! wrapped in an `Arc` and shared read-only with the dispatcher.

#![warn(missing_docs, clippy::pedantic)]

pub mod registry;
pub mod tool;

pub use registry::{RegistryError, RegistryResult, ToolDefinition, ToolDescriptor, ToolRegistry};
pub use tool::{Tool, ToolError, ToolResult};
