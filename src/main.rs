use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use datadog_logs_mcp::config::{Config, ServerMode};
use datadog_logs_mcp::datadog::LogsClient;
use datadog_logs_mcp::http::serve_http;
use datadog_logs_mcp::mcp::run_stdio;
use datadog_logs_mcp::search::SearchAdapter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for the stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = match args.get(1) {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::default(),
    };
    config.apply_env();

    let client = LogsClient::new(&config.datadog).context("building datadog client")?;
    if !client.has_credentials() {
        tracing::warn!(
            "DD_API_KEY / DD_APP_KEY not set; datadog will reject every search"
        );
    }
    let adapter = Arc::new(SearchAdapter::new(client, config.response.payload));

    match config.server.mode {
        ServerMode::Stdio => {
            tracing::info!("datadog mcp server running on stdio");
            run_stdio(adapter).await?;
        }
        ServerMode::Http => {
            serve_http(adapter, config).await?;
        }
        ServerMode::Both => {
            let stdio_adapter = adapter.clone();
            let http_task = tokio::spawn(async move { serve_http(adapter, config).await });
            let stdio_task = tokio::spawn(async move {
                tracing::info!("datadog mcp server running on stdio");
                run_stdio(stdio_adapter).await
            });
            http_task.await.expect("http task panicked")?;
            stdio_task.await.expect("stdio task panicked")?;
        }
    }

    Ok(())
}
