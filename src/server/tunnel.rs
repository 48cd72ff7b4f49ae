//! Client/backend tunnel
//!
//! ```text
//!   Resolving ──▶ Connected ──▶ Relaying ──▶ Closed
//!       │             │
//!       └─────────────┴──────────────────────▶ Closed
//! ```
//!
//! `Resolving` and `Connected` happen in [`Tunnel::establish`], on the
//! front's accept loop. Any failure there drops the client connection and
//! the admission ticket. [`Tunnel::run`] relays until either side stops,
//! then closes both connections and releases the ticket.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::admission::Ticket;
use crate::error::TunnelError;
use crate::feed::Subscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Resolving,
    Connected,
    Relaying,
    Closed,
}

/// Which copy finished first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

/// How a relay ended
#[derive(Debug)]
pub struct RelaySummary {
    pub first_closed: Direction,
    /// Bytes copied in `first_closed` direction, or the error that stopped it
    pub outcome: io::Result<u64>,
}

pub struct Tunnel {
    client: TcpStream,
    backend: TcpStream,
    client_addr: SocketAddr,
    backend_addr: SocketAddr,
    state: TunnelState,
    // Declared last: released after both connections are closed.
    _ticket: Ticket,
}

impl Tunnel {
    /// Receive a backend address from `feed` and connect to it.
    pub async fn establish(
        ticket: Ticket,
        client: TcpStream,
        feed: &Subscriber,
    ) -> Result<Self, TunnelError> {
        debug!(state = ?TunnelState::Resolving, "Waiting for a backend address");
        let payload = feed.recv().await?;
        let backend = std::str::from_utf8(&payload)
            .map_err(|_| TunnelError::BadBackend(String::from_utf8_lossy(&payload).into_owned()))?;
        Self::connect(ticket, client, backend).await
    }

    /// Connect `client` to `backend` (a `host:port` string).
    pub async fn connect(
        ticket: Ticket,
        client: TcpStream,
        backend: &str,
    ) -> Result<Self, TunnelError> {
        let backend = backend.trim();
        if backend.is_empty() {
            return Err(TunnelError::BadBackend(backend.to_string()));
        }

        let dial_err = |source| TunnelError::Dial {
            addr: backend.to_string(),
            source,
        };
        let backend_stream = TcpStream::connect(backend).await.map_err(dial_err)?;
        let backend_addr = backend_stream.peer_addr().map_err(dial_err)?;
        let client_addr = client.peer_addr().map_err(dial_err)?;
        let _ = client.set_nodelay(true);
        let _ = backend_stream.set_nodelay(true);

        Ok(Self {
            client,
            backend: backend_stream,
            client_addr,
            backend_addr,
            state: TunnelState::Connected,
            _ticket: ticket,
        })
    }

    pub fn state(&self) -> TunnelState {
        self.state
    }

    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    pub fn backend_addr(&self) -> SocketAddr {
        self.backend_addr
    }

    /// Relay bytes both ways until either side reaches end of stream or
    /// fails, then close everything.
    pub async fn run(mut self) -> RelaySummary {
        self.state = TunnelState::Relaying;

        let summary = {
            let (mut client_rd, mut client_wr) = self.client.split();
            let (mut backend_rd, mut backend_wr) = self.backend.split();

            let (first_closed, outcome) = tokio::select! {
                res = tokio::io::copy(&mut client_rd, &mut backend_wr) => (Direction::ClientToBackend, res),
                res = tokio::io::copy(&mut backend_rd, &mut client_wr) => (Direction::BackendToClient, res),
            };

            // Best effort FIN on both sides; errors here change nothing.
            let _ = client_wr.shutdown().await;
            let _ = backend_wr.shutdown().await;

            RelaySummary {
                first_closed,
                outcome,
            }
        };

        self.state = TunnelState::Closed;
        match &summary.outcome {
            Ok(bytes) => info!(
                tunnel = %self,
                first_closed = ?summary.first_closed,
                bytes = *bytes,
                "Tunnel closed"
            ),
            Err(e) => info!(
                tunnel = %self,
                first_closed = ?summary.first_closed,
                error = %e,
                "Tunnel closed on error"
            ),
        }
        summary
    }
}

impl fmt::Display for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tunnel{{{}->{}}}", self.client_addr, self.backend_addr)
    }
}
