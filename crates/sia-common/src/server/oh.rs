//! Osborne-Hoffman dispatch loop
//!
//! Same pipeline as TCP, wrapped in the OH obfuscation. On accept the
//! receiver writes the scrambled key, then re-writes it before every
//! read as a keepalive. Each inbound frame is unwrapped, pipelined, and
//! the response wrapped back. The keystreams are positional, so a frame
//! that no longer lexes means lost sync and the connection is dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::Result;
use crate::crypto::osborne_hoffman::{OsborneHoffman, SCRAMBLED_KEY_LEN};
use crate::server::ServerState;
use crate::server::tcp::{READ_BUF_LEN, SHUTDOWN_POLL};

/// Reads blocked longer than this reclaim the socket
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// SIA DC-09 server over the Osborne-Hoffman wrapper.
pub struct SiaServerOh {
    state: Arc<ServerState>,
    seed: Option<[u8; SCRAMBLED_KEY_LEN]>,
    idle_timeout: Duration,
}

impl SiaServerOh {
    /// OH server on the receiver-wide default seed.
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            seed: None,
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// OH server deriving its scrambled key from a configured seed.
    pub fn with_seed(state: Arc<ServerState>, seed: [u8; SCRAMBLED_KEY_LEN]) -> Self {
        Self {
            state,
            seed: Some(seed),
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// Override the idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("SIA OH server listening on {}", listener.local_addr()?);
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
                    debug!("New OH connection from {}", peer);
                    let state = Arc::clone(&self.state);
                    let seed = self.seed;
                    let idle_timeout = self.idle_timeout;
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(state, seed, idle_timeout, stream, peer).await
                        {
                            error!("Error handling OH connection {}: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept OH connection: {}", e);
                }
            }
        }
        Ok(())
    }
}

async fn handle_connection(
    state: Arc<ServerState>,
    seed: Option<[u8; SCRAMBLED_KEY_LEN]>,
    idle_timeout: Duration,
    mut stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let mut oh = match seed {
        Some(seed) => OsborneHoffman::from_seed(&seed),
        None => OsborneHoffman::new(),
    };

    // handshake: the scrambled key is the first thing on the wire
    stream.write_all(oh.scrambled_key()).await?;
    stream.flush().await?;

    let mut buf = vec![0u8; READ_BUF_LEN];
    while !state.is_shutdown() {
        // the key is re-written before every read as a keepalive
        stream.write_all(oh.scrambled_key()).await?;
        stream.flush().await?;

        let n = match timeout(idle_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                debug!("Read error from OH peer {}: {}", peer, e);
                break;
            }
            Err(_) => {
                debug!("OH connection from {} idle, reclaiming", peer);
                break;
            }
        };

        let data = oh.decrypt_data(&buf[..n]);
        let Some(event) = state.parse_and_check_event(&data) else {
            // the keystream cannot resynchronize once a frame is garbled
            debug!("OH stream from {} desynchronized, closing", peer);
            break;
        };

        let response = oh.encrypt_data(&event.create_response());
        stream.write_all(&response).await?;
        stream.flush().await?;
        state.dispatch(event);
    }

    debug!("OH connection from {} closed", peer);
    Ok(())
}
