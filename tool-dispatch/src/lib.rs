//! Tool invocation dispatch.
//!
//! [`Dispatcher`] is the single boundary between callers and tool handlers:
//! whatever a handler does (return an error, panic, fail on I/O) the caller
//! receives an [`InvocationResult`](tool_primitives::InvocationResult).
//! The [`wire`] module maps JSON-RPC request bodies onto the dispatcher.

#![warn(missing_docs, clippy::pedantic)]

mod dispatcher;
pub mod wire;

pub use dispatcher::Dispatcher;
pub use wire::{RpcRequest, RpcResponse, RpcRouter, ServerInfo, WireError};
