//! Proxy front: accept loop, backend resolution, tunnel spawning

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{Instrument, error, info, warn};

use super::Serve;
use super::front::Front;
use super::tunnel::Tunnel;
use crate::admission::{Admission, FrontGate};
use crate::config::ProxyFrontSpec;
use crate::feed::Subscriber;

pub struct ProxyFront {
    front: Front,
    feed: Subscriber,
    spec: ProxyFrontSpec,
}

impl ProxyFront {
    /// Bind the public endpoint and dial every feed, best effort.
    pub async fn create(
        admission: &Admission,
        local_capacity: usize,
        spec: &ProxyFrontSpec,
    ) -> anyhow::Result<Self> {
        let front = Front::bind(admission, local_capacity, &spec.listen_addr).await?;

        let feed = Subscriber::new();
        for endpoint in &spec.feeds {
            feed.dial(endpoint);
        }

        Ok(Self {
            front,
            feed,
            spec: spec.clone(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.front.local_addr()
    }

    pub fn gate(&self) -> &FrontGate {
        self.front.gate()
    }

    pub fn feed(&self) -> &Subscriber {
        &self.feed
    }
}

impl Serve for ProxyFront {
    async fn run(self: Arc<Self>) {
        let feeds: Vec<String> = self.spec.feeds.iter().map(ToString::to_string).collect();
        info!(front = %self.local_addr(), feeds = ?feeds, "Proxy front started");

        while let Some((ticket, client, peer)) = self.front.next_client().await {
            match Tunnel::establish(ticket, client, &self.feed).await {
                Ok(tunnel) => {
                    info!(tunnel = %tunnel, "Incoming");
                    tokio::spawn(
                        async move {
                            tunnel.run().await;
                        }
                        .instrument(tracing::info_span!("tunnel", peer = %peer)),
                    );
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Incoming connection rejected");
                }
            }
        }

        if !self.front.is_closed() {
            error!(front = %self.local_addr(), "Proxy front stopped unexpectedly");
        }
    }

    fn close(&self) {
        self.front.close();
        self.feed.close();
    }
}
