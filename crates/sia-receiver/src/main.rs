//! SIA DC-09 Receiver
//!
//! Accepts alarm panel reports over TCP, UDP, and the Osborne-Hoffman
//! wrapper, and logs every accepted event.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use sia_common::counters::Counters;
use sia_common::{
    AccountStore, EventHandler, ServerState, SiaEvent, SiaServerOh, SiaServerTcp, SiaServerUdp,
};
use tracing::{error, info};

use config::Config;

#[derive(Parser)]
#[command(name = "sia-receiver", about = "SIA DC-09 alarm receiver")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "receiver.toml")]
    config: PathBuf,
}

/// Handler that logs each accepted event as JSON.
struct LogHandler;

#[async_trait]
impl EventHandler for LogHandler {
    async fn handle_event(&self, event: SiaEvent) -> Result<()> {
        info!(event = %serde_json::to_string(&event)?, "Event accepted");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    info!("==============================================");
    info!("   SIA DC-09 Receiver v{}", env!("CARGO_PKG_VERSION"));
    info!("==============================================");

    let accounts = config.build_accounts()?;
    info!("Loaded {} account(s)", accounts.len());

    let counters = Arc::new(Counters::new());
    let state = Arc::new(
        ServerState::new(
            AccountStore::new(accounts),
            Arc::new(LogHandler),
            Arc::clone(&counters),
        )
        .with_skew(config.skew()),
    );

    let mut servers = Vec::new();

    if let Some(addr) = config.server.tcp_bind {
        let server = SiaServerTcp::new(Arc::clone(&state));
        servers.push(tokio::spawn(async move {
            if let Err(e) = server.run(addr).await {
                error!("TCP server failed: {}", e);
            }
        }));
    }

    if let Some(addr) = config.server.udp_bind {
        let server = SiaServerUdp::new(Arc::clone(&state));
        servers.push(tokio::spawn(async move {
            if let Err(e) = server.run(addr).await {
                error!("UDP server failed: {}", e);
            }
        }));
    }

    if let Some(addr) = config.server.oh_bind {
        let server = match config.oh_seed()? {
            Some(seed) => SiaServerOh::with_seed(Arc::clone(&state), seed),
            None => SiaServerOh::new(Arc::clone(&state)),
        };
        servers.push(tokio::spawn(async move {
            if let Err(e) = server.run(addr).await {
                error!("OH server failed: {}", e);
            }
        }));
    }

    if servers.is_empty() {
        anyhow::bail!("No transport enabled; set tcp_bind, udp_bind, or oh_bind");
    }

    info!("Receiver running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    state.shutdown();
    for server in servers {
        let _ = server.await;
    }

    let snap = counters.snapshot();
    info!(
        events = snap.events,
        valid = snap.valid_events,
        crc = snap.crc_errors,
        timestamp = snap.timestamp_errors,
        account = snap.account_errors,
        code = snap.code_errors,
        format = snap.format_errors,
        user_code = snap.user_code_errors,
        "Final counters"
    );

    Ok(())
}
