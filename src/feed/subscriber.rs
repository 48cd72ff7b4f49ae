//! Pull side of the feed
//!
//! Each dialed endpoint gets a background task that connects, pumps
//! messages into a small shared inbox, and reconnects on a fixed interval
//! after the connection drops or cannot be made.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::endpoint::Endpoint;
use super::transport::{self, BoxConn};
use super::wire::{self, PROTO_PULL, PROTO_PUSH};
use crate::error::FeedError;

/// Delay between two connection attempts to the same publisher
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

// Frames are read from the socket only as fast as `recv` drains the inbox;
// a small read buffer keeps the rest waiting in the kernel.
const READ_BUFFER_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct Subscriber {
    inbox_tx: mpsc::Sender<Bytes>,
    inbox: Mutex<mpsc::Receiver<Bytes>>,
    peers: Arc<watch::Sender<usize>>,
    shutdown: CancellationToken,
}

impl Subscriber {
    pub fn new() -> Self {
        let (inbox_tx, inbox) = mpsc::channel(1);
        let (peers, _) = watch::channel(0);
        Self {
            inbox_tx,
            inbox: Mutex::new(inbox),
            peers: Arc::new(peers),
            shutdown: CancellationToken::new(),
        }
    }

    /// Connect to a publisher in the background. Never fails; an
    /// unreachable publisher is retried until the subscriber closes.
    pub fn dial(&self, endpoint: &Endpoint) {
        tokio::spawn(dial_loop(
            endpoint.clone(),
            self.inbox_tx.clone(),
            Arc::clone(&self.peers),
            self.shutdown.clone(),
        ));
    }

    /// Publishers currently connected
    pub fn peer_count(&self) -> usize {
        *self.peers.borrow()
    }

    /// Next message from any publisher.
    ///
    /// Blocks while at least one publisher is connected. Fails with
    /// [`FeedError::NoPeer`] when none is and nothing is buffered.
    pub async fn recv(&self) -> Result<Bytes, FeedError> {
        let mut inbox = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(FeedError::Closed),
            guard = self.inbox.lock() => guard,
        };
        let mut peers = self.peers.subscribe();

        loop {
            if self.shutdown.is_cancelled() {
                return Err(FeedError::Closed);
            }
            if let Ok(msg) = inbox.try_recv() {
                return Ok(msg);
            }
            if *peers.borrow_and_update() == 0 {
                return Err(FeedError::NoPeer);
            }
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(FeedError::Closed),
                msg = inbox.recv() => return msg.ok_or(FeedError::Closed),
                changed = peers.changed() => {
                    if changed.is_err() {
                        return Err(FeedError::Closed);
                    }
                }
            }
        }
    }

    /// Disconnect from every publisher and stop reconnecting.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn dial_loop(
    endpoint: Endpoint,
    inbox: mpsc::Sender<Bytes>,
    peers: Arc<watch::Sender<usize>>,
    shutdown: CancellationToken,
) {
    let mut reported = false;

    loop {
        let attempt = async {
            let mut conn = transport::dial(&endpoint).await?;
            wire::handshake(&mut conn, PROTO_PULL, PROTO_PUSH).await?;
            Ok::<_, FeedError>(conn)
        };
        let attempt = tokio::select! {
            _ = shutdown.cancelled() => return,
            res = attempt => res,
        };

        match attempt {
            Ok(conn) => {
                info!(endpoint = %endpoint, "Connected to feed publisher");
                reported = false;
                peers.send_modify(|n| *n += 1);
                let outcome = tokio::select! {
                    _ = shutdown.cancelled() => None,
                    res = pump(conn, &inbox) => Some(res),
                };
                peers.send_modify(|n| *n -= 1);
                match outcome {
                    None => return,
                    Some(Ok(())) => info!(endpoint = %endpoint, "Feed publisher went away"),
                    Some(Err(e)) => warn!(endpoint = %endpoint, error = %e, "Feed connection lost"),
                }
            }
            Err(e) if !reported => {
                warn!(endpoint = %endpoint, error = %e, "Feed publisher unreachable, retrying");
                reported = true;
            }
            Err(e) => debug!(endpoint = %endpoint, error = %e, "Feed dial failed"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_INTERVAL) => {}
        }
    }
}

async fn pump(conn: BoxConn, inbox: &mpsc::Sender<Bytes>) -> Result<(), FeedError> {
    let mut frames = FramedRead::with_capacity(conn, wire::codec(), READ_BUFFER_CAPACITY);
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        inbox
            .send(frame.freeze())
            .await
            .map_err(|_| FeedError::Closed)?;
    }
    Ok(())
}
