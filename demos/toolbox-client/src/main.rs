//! Calls one tool on a running toolbox server and prints the envelope.

use anyhow::{Context, Result, bail};
use clap::Parser;
use hyper::body::to_bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, Uri};
use serde_json::{Value, json};

#[derive(Debug, Parser)]
#[command(name = "toolbox-client", version, about)]
struct Args {
    /// JSON-RPC endpoint of the server.
    #[arg(long, env = "TOOLBOX_URL", default_value = "http://127.0.0.1:8001/mcp")]
    url: Uri,

    /// Tool to call; lists the available tools when omitted.
    tool: Option<String>,

    /// Tool arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    args: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let request = match &args.tool {
        Some(tool) => {
            let arguments: Value =
                serde_json::from_str(&args.args).context("--args must be valid JSON")?;
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": { "name": tool, "arguments": arguments },
            })
        }
        None => json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
    };

    let response = send(&args.url, &request).await?;

    if let Some(error) = response.get("error") {
        bail!("server returned a protocol error: {error}");
    }

    let result = response
        .get("result")
        .context("response carries neither result nor error")?;

    if args.tool.is_some() {
        let envelope = result.get("structuredContent").unwrap_or(result);
        println!("{}", serde_json::to_string_pretty(envelope)?);
        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            std::process::exit(1);
        }
    } else {
        for tool in result["tools"].as_array().into_iter().flatten() {
            let name = tool["name"].as_str().unwrap_or("?");
            let description = tool["description"].as_str().unwrap_or("");
            println!("{name:<24} {description}");
        }
    }

    Ok(())
}

async fn send(url: &Uri, request: &Value) -> Result<Value> {
    let client = Client::new();
    let request = Request::post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(request)?))?;

    let response = client
        .request(request)
        .await
        .with_context(|| format!("failed to reach {url}"))?;
    let status = response.status();
    let body = to_bytes(response.into_body()).await?;

    if !status.is_success() {
        bail!(
            "server answered {status}: {}",
            String::from_utf8_lossy(&body)
        );
    }

    serde_json::from_slice(&body).context("response is not valid JSON")
}
