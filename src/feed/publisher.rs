//! Push side of the feed
//!
//! Connected peers line up for the next message in FIFO order, so messages
//! are spread across subscribers. [`Publisher::send`] completes once a peer
//! has written the message into its connection. Feed sockets run with small
//! kernel buffers, so a subscriber that stops reading holds back its peer
//! after a few hundred messages and the queue stops draining.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::endpoint::Endpoint;
use super::transport::{Acceptor, BoxConn};
use super::wire::{self, PROTO_PULL, PROTO_PUSH};
use crate::error::FeedError;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type Outbox = Arc<Mutex<mpsc::Receiver<Bytes>>>;

#[derive(Debug)]
pub struct Publisher {
    queue: mpsc::Sender<Bytes>,
    outbox: Outbox,
    peers: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl Publisher {
    pub fn new() -> Self {
        let (queue, outbox) = mpsc::channel(1);
        Self {
            queue,
            outbox: Arc::new(Mutex::new(outbox)),
            peers: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Bind `endpoint` and serve subscribers that connect to it.
    ///
    /// Returns the endpoint actually bound (port 0 is replaced by the port
    /// the kernel picked).
    pub async fn listen(&self, endpoint: &Endpoint) -> Result<Endpoint, FeedError> {
        let acceptor = Acceptor::bind(endpoint).await?;
        let bound = acceptor.local_endpoint()?;
        info!(endpoint = %bound, "Feed publisher listening");

        let outbox = Arc::clone(&self.outbox);
        let peers = Arc::clone(&self.peers);
        let shutdown = self.shutdown.clone();
        let label = bound.clone();
        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    res = acceptor.accept() => res,
                };
                match accepted {
                    Ok(conn) => {
                        tokio::spawn(serve_peer(
                            conn,
                            Arc::clone(&outbox),
                            Arc::clone(&peers),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(endpoint = %label, error = %e, "Feed accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
            debug!(endpoint = %label, "Feed listener stopped");
        });

        Ok(bound)
    }

    /// Queue one message. Waits until a connected peer takes the previous one.
    pub async fn send(&self, msg: Bytes) -> Result<(), FeedError> {
        if self.shutdown.is_cancelled() {
            return Err(FeedError::Closed);
        }
        self.queue.send(msg).await.map_err(|_| FeedError::Closed)
    }

    /// Subscribers currently connected
    pub fn peer_count(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }

    /// Stop listening and disconnect every subscriber.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve_peer(
    mut conn: BoxConn,
    outbox: Outbox,
    peers: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    let handshake = tokio::select! {
        _ = shutdown.cancelled() => return,
        res = wire::handshake(&mut conn, PROTO_PUSH, PROTO_PULL) => res,
    };
    if let Err(e) = handshake {
        warn!(error = %e, "Rejected feed peer");
        return;
    }

    peers.fetch_add(1, Ordering::Relaxed);
    debug!("Feed subscriber connected");

    let (mut reader, writer) = tokio::io::split(conn);
    let mut sink = FramedWrite::new(writer, wire::codec());
    let mut probe = [0u8; 1];

    loop {
        let msg = {
            let mut outbox = tokio::select! {
                _ = shutdown.cancelled() => break,
                guard = outbox.lock() => guard,
            };
            // Pull peers never write, so any read completion means the peer is gone.
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = reader.read(&mut probe) => {
                    debug!("Feed subscriber disconnected");
                    break;
                }
                msg = outbox.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            }
        };

        if let Err(e) = sink.send(msg).await {
            warn!(error = %e, "Feed subscriber lost, one message dropped");
            break;
        }
    }

    peers.fetch_sub(1, Ordering::Relaxed);
}
