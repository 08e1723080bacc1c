//! Toolbox server: JSON-RPC over `POST /mcp`, liveness on `GET /health`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tracing::{info, warn};

use toolbox::builtins::register_builtins;
use toolbox::config::ToolboxConfig;
use toolbox::dispatch::{Dispatcher, RpcRouter, ServerInfo};
use toolbox::primitives::{Environment, ProcessEnvironment};
use toolbox::registry::ToolRegistry;
use toolbox::telemetry::health::HealthMonitor;
use toolbox::telemetry::tracing_support;

mod service;

use service::AppState;

#[derive(Debug, Parser)]
#[command(name = "toolbox-server", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(long, env = "TOOLBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address; overrides configuration and `TOOLBOX_BIND`.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Register the `search` and `fetch` placeholder tools.
    #[arg(long)]
    placeholders: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let env: Arc<dyn Environment> = Arc::new(ProcessEnvironment);

    let mut config = ToolboxConfig::load(args.config.as_deref(), env.as_ref())
        .context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.placeholders {
        config.tools.placeholders = true;
    }

    tracing_support::init(&config.logging, env.as_ref())?;
    info!(
        file = ?args.config,
        env_overrides = ?ToolboxConfig::env_overrides(env.as_ref()),
        bind = %config.server.bind,
        log_filter = %config.logging.filter,
        delay_max_secs = config.tools.delay_max_secs,
        placeholders = config.tools.placeholders,
        "configuration loaded"
    );

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &config, Arc::clone(&env))
        .context("failed to register built-in tools")?;
    for descriptor in registry.list() {
        info!(tool = %descriptor.name(), "tool available");
    }

    let router = RpcRouter::new(
        Dispatcher::new(Arc::new(registry)),
        ServerInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    );
    let state = Arc::new(AppState::new(
        router,
        HealthMonitor::new(env!("CARGO_PKG_VERSION")),
        config.server.request_timeout(),
    ));

    let make_service = make_service_fn(move |_conn| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(state.route(request).await) }
            }))
        }
    });

    let server = Server::try_bind(&config.server.bind)
        .with_context(|| format!("failed to bind {}", config.server.bind))?
        .serve(make_service);
    info!(addr = %server.local_addr(), "toolbox server listening");

    server.with_graceful_shutdown(shutdown_signal()).await?;
    info!("toolbox server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
