//! `search` and `fetch` placeholders.
//!
//! Both accept their argument and answer with a fixed empty result marked
//! `placeholder: true`. They exist so clients that expect the pair can
//! connect.

use serde::Deserialize;
use serde_json::{Value, json};
use tool_registry::{RegistryResult, ToolDescriptor, ToolError, ToolRegistry, ToolResult};

use crate::names::{FETCH, SEARCH};

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Deserialize)]
struct FetchArgs {
    id: String,
}

async fn search(arguments: Value) -> ToolResult<Value> {
    let SearchArgs { query } = serde_json::from_value(arguments)?;
    Ok(json!({ "query": query, "results": [], "placeholder": true }))
}

async fn fetch(arguments: Value) -> ToolResult<Value> {
    let FetchArgs { id } = serde_json::from_value(arguments)?;
    if id.trim().is_empty() {
        return Err(ToolError::invalid_arguments("id must not be empty"));
    }
    Ok(json!({ "id": id, "title": "", "text": "", "url": null, "placeholder": true }))
}

pub(crate) fn register(registry: &mut ToolRegistry) -> RegistryResult<()> {
    registry.register_tool(
        ToolDescriptor::new(SEARCH)?
            .with_description("Placeholder search; always returns no results.")
            .with_input_schema(json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })),
        search,
    )?;
    registry.register_tool(
        ToolDescriptor::new(FETCH)?
            .with_description("Placeholder fetch; always returns an empty document.")
            .with_input_schema(json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"]
            })),
        fetch,
    )
}
