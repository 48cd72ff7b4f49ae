//! Echo front: every admitted client gets its own bytes back

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::Serve;
use super::front::Front;
use crate::admission::{Admission, FrontGate, Ticket};
use crate::config::EchoFrontSpec;

pub struct EchoFront {
    front: Front,
}

impl EchoFront {
    pub async fn create(
        admission: &Admission,
        local_capacity: usize,
        spec: &EchoFrontSpec,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            front: Front::bind(admission, local_capacity, &spec.listen_addr).await?,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.front.local_addr()
    }

    pub fn gate(&self) -> &FrontGate {
        self.front.gate()
    }
}

impl Serve for EchoFront {
    async fn run(self: Arc<Self>) {
        info!(front = %self.local_addr(), "Echo front started");

        while let Some((ticket, stream, peer)) = self.front.next_client().await {
            tokio::spawn(echo(ticket, stream, peer));
        }

        if !self.front.is_closed() {
            error!(front = %self.local_addr(), "Echo front stopped unexpectedly");
        }
    }

    fn close(&self) {
        self.front.close();
    }
}

async fn echo(ticket: Ticket, mut stream: TcpStream, peer: SocketAddr) {
    let (mut reader, mut writer) = stream.split();
    match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(bytes) => debug!(peer = %peer, bytes, "Echo client done"),
        Err(e) => debug!(peer = %peer, error = %e, "Echo client failed"),
    }
    drop(stream);
    ticket.release();
}
