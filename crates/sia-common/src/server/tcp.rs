//! TCP dispatch loop
//!
//! One spawned task per accepted connection. Each iteration reads up to
//! 1 KiB, runs the pipeline, writes the synthesized response, and hands
//! the event to the handler without waiting for it. Responses go out in
//! receive order, before the next read completes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::Result;
use crate::server::ServerState;

/// Read size per iteration; DC-09 frames are far smaller
pub(crate) const READ_BUF_LEN: usize = 1024;

/// How often a blocked accept or receive re-checks the shutdown flag
pub(crate) const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

/// SIA DC-09 server over plain TCP.
pub struct SiaServerTcp {
    state: Arc<ServerState>,
}

impl SiaServerTcp {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("SIA TCP server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        while !self.state.is_shutdown() {
            let Ok(accepted) = timeout(SHUTDOWN_POLL, listener.accept()).await else {
                continue;
            };
            match accepted {
                Ok((stream, peer)) => {
                    debug!("New connection from {}", peer);
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream, peer).await {
                            error!("Error handling connection {}: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
        Ok(())
    }
}

async fn handle_connection(
    state: Arc<ServerState>,
    mut stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let mut buf = vec![0u8; READ_BUF_LEN];

    while !state.is_shutdown() {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            // a reset terminates only this connection
            Err(e) => {
                debug!("Read error from {}: {}", peer, e);
                break;
            }
        };

        let Some(event) = state.parse_and_check_event(&buf[..n]) else {
            continue;
        };
        let response = event.create_response();
        stream.write_all(&response).await?;
        stream.flush().await?;
        state.dispatch(event);
    }

    debug!("Connection from {} closed", peer);
    Ok(())
}
