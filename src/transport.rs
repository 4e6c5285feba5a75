use std::future::Future;

use anyhow::Context;
use axum::Router;
use rmcp::{
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        },
    },
    ServiceExt,
};
use tokio::net::TcpListener;

use crate::server::SemtoolsServer;

/// Path the streamable HTTP endpoint is mounted on
pub const MCP_PATH: &str = "/mcp";

/// Serve a single client over stdin/stdout until it disconnects
pub async fn serve_stdio(server: SemtoolsServer) -> anyhow::Result<()> {
    let running = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Failed to start server: {}", e);
    })?;

    tracing::info!("Serving MCP on stdio, waiting for requests");
    running.waiting().await?;

    tracing::info!("Client disconnected, shutting down");
    Ok(())
}

/// Bind the HTTP listener. Port range and address errors surface here.
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))
}

/// Router exposing the MCP endpoint. Every session gets its own handler.
pub fn router(server: SemtoolsServer) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    Router::new().nest_service(MCP_PATH, service)
}

/// Serve streamable HTTP on an already bound listener until `shutdown` resolves
pub async fn serve_http<F>(
    listener: TcpListener,
    server: SemtoolsServer,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Serving MCP at http://{}{}", addr, MCP_PATH);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
