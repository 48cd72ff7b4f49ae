//! Public listening endpoint with its admission gate

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::admission::{Admission, FrontGate, Ticket};
use crate::config::resolve_addr;

pub struct Front {
    listener: TcpListener,
    gate: FrontGate,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl Front {
    /// Resolve and bind `listen_addr`, with a local pool of `local_capacity`.
    pub async fn bind(
        admission: &Admission,
        local_capacity: usize,
        listen_addr: &str,
    ) -> anyhow::Result<Self> {
        let addr = resolve_addr(listen_addr).await?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {addr}"))?;
        let local_addr = listener.local_addr()?;

        info!(
            bind_addr = %local_addr,
            max_connections = local_capacity,
            "Front bound"
        );

        Ok(Self {
            listener,
            gate: admission.front_gate(local_capacity),
            local_addr,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn gate(&self) -> &FrontGate {
        &self.gate
    }

    /// Admit, then accept.
    ///
    /// Accepting only after admission leaves excess clients waiting in the
    /// kernel backlog. Failed accepts are logged and their slot is released.
    /// Returns `None` once the front is closed.
    pub async fn next_client(&self) -> Option<(Ticket, TcpStream, SocketAddr)> {
        loop {
            let ticket = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                ticket = self.gate.admit() => ticket?,
            };
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                res = self.listener.accept() => res,
            };
            match accepted {
                Ok((stream, peer)) => return Some((ticket, stream, peer)),
                Err(e) => {
                    warn!(bind_addr = %self.local_addr, error = %e, "Accept failed");
                    ticket.release();
                }
            }
        }
    }

    /// Stop accepting and drain the local pool. The socket itself closes
    /// when the front is dropped.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            info!(bind_addr = %self.local_addr, "Front closing");
        }
        self.shutdown.cancel();
        self.gate.drain();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
