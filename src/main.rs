mod cli;
mod executor;
mod logging;
mod request;
mod security;
mod server;
mod tools;
mod transport;

use clap::Parser;

use cli::{Cli, Transport};
use server::SemtoolsServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing()?;

    let policy = cli.command_policy()?;
    if policy.is_unrestricted() && cli.exposes_network() {
        tracing::warn!(
            host = %cli.host,
            "execute_bash runs any command without restriction and the HTTP listener is not loopback-only"
        );
    }

    let server = SemtoolsServer::new(cli.execution_context(), policy);

    tracing::info!(transport = ?cli.transport, "Starting {}", server::SERVER_NAME);

    match cli.transport {
        Transport::Stdio => transport::serve_stdio(server).await,
        Transport::Http => {
            let listener = transport::bind(&cli.host, cli.port).await?;
            transport::serve_http(listener, server, transport::shutdown_signal()).await
        }
    }
}
