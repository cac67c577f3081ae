//! Searchlight Bridge Binary
//!
//! ## Usage
//!
//! ```bash
//! export MCP_TOKEN=...
//! echo '{"jsonrpc":"2.0","id":1,"method":"tools/list"}' | searchlight-bridge
//! ```
//!
//! stdout carries JSON-RPC responses only; all diagnostics go to stderr.

use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use searchlight_bridge::{Bridge, BridgeConfig, UpstreamClient};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "searchlight-bridge")]
#[command(about = "Stdio JSON-RPC bridge to the Searchlight analytics API")]
#[command(version)]
struct Cli {
    /// Remote endpoint, overrides MCP_SERVER_URL / SEARCHLIGHT_API_URL
    #[arg(long)]
    server_url: Option<String>,

    /// Seconds to wait for each remote response
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Skip the startup connectivity ping
    #[arg(long)]
    no_probe: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let mut config = BridgeConfig::from_env().context("failed to load configuration")?;
    if let Some(url) = cli.server_url.as_deref() {
        config = config
            .with_server_url(url)
            .context("invalid --server-url")?;
    }
    let config = config
        .with_request_timeout(Duration::from_secs(cli.timeout_secs))
        .with_startup_probe(!cli.no_probe);

    info!(
        server_url = %config.server_url,
        token = %config.token.masked(),
        timeout_secs = config.request_timeout.as_secs(),
        "searchlight-bridge starting"
    );

    let bridge = Bridge::new(UpstreamClient::new(&config)?);

    if config.startup_probe {
        // Detached: the read loop never waits on it.
        drop(bridge.spawn_probe());
    }

    tokio::select! {
        result = bridge.run(tokio::io::stdin(), tokio::io::stdout()) => {
            if let Err(e) = result {
                error!(error = %e, "bridge stopped");
                return Err(e.into());
            }
            info!("searchlight-bridge shutting down");
        }
        () = shutdown_signal() => {
            info!("termination signal received, exiting");
            // The blocking stdin read cannot be cancelled, so skip runtime
            // shutdown; in-flight replies are dropped.
            std::process::exit(0);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("searchlight_bridge=info".parse()?);

    // stderr only: stdout belongs to JSON-RPC
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_ansi(false))
            .with(filter)
            .init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
