//! UDP dispatch loop
//!
//! One frame per datagram. The response datagram goes back to the
//! source address; the event is handed to the handler without awaiting
//! delivery of the reply.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::Result;
use crate::server::ServerState;
use crate::server::tcp::{READ_BUF_LEN, SHUTDOWN_POLL};

/// SIA DC-09 server over UDP datagrams.
pub struct SiaServerUdp {
    state: Arc<ServerState>,
}

impl SiaServerUdp {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let socket = UdpSocket::bind(addr).await?;
        info!("SIA UDP server listening on {}", socket.local_addr()?);
        self.serve(socket).await
    }

    /// Serve on an already-bound socket until shutdown.
    pub async fn serve(&self, socket: UdpSocket) -> Result<()> {
        let mut buf = vec![0u8; READ_BUF_LEN];

        while !self.state.is_shutdown() {
            let Ok(received) = timeout(SHUTDOWN_POLL, socket.recv_from(&mut buf)).await else {
                continue;
            };
            let (n, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    error!("Failed to receive datagram: {}", e);
                    continue;
                }
            };

            let Some(event) = self.state.parse_and_check_event(&buf[..n]) else {
                continue;
            };
            let response = event.create_response();
            if let Err(e) = socket.send_to(&response, peer).await {
                debug!("Failed to send response to {}: {}", peer, e);
            }
            self.state.dispatch(event);
        }
        Ok(())
    }
}
