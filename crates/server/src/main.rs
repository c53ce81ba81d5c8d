//! Petstore MCP server: exposes the Swagger Petstore REST API as MCP tools
//! over stdio.

mod server;

use anyhow::Context as _;
use clap::Parser;
use petstore_http_tools::catalog::ToolCatalog;
use rmcp::service::serve_server;
use server::PetstoreServer;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "https://petstore3.swagger.io/api/v3";

#[derive(Debug, Parser)]
#[command(name = "petstore-mcp", version, about = "MCP stdio server for the Swagger Petstore API")]
struct Args {
    /// Base URL of the Petstore API.
    #[arg(long, env = "PETSTORE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Ceiling on each outbound HTTP request, in seconds.
    #[arg(long, env = "PETSTORE_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log filter (e.g. `info` or `petstore_http_tools=debug`).
    #[arg(long, env = "PETSTORE_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, env = "PETSTORE_LOG_JSON", default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let catalog = ToolCatalog::new(&args.base_url, Duration::from_secs(args.timeout_secs))
        .context("build tool catalog")?;
    tracing::info!(base_url = %args.base_url, "starting petstore MCP server on stdio");

    let service = serve_server(
        PetstoreServer::new(catalog),
        (tokio::io::stdin(), tokio::io::stdout()),
    )
    .await
    .context("initialize MCP stdio transport")?;

    tokio::select! {
        reason = service.waiting() => {
            tracing::info!(?reason, "transport closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing(filter: &str, json: bool) -> anyhow::Result<()> {
    // stdout carries the MCP transport; every log line goes to stderr.
    let filter = EnvFilter::try_new(filter).context("parse log filter")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
