//! Address distributor
//!
//! Two duties run side by side:
//!
//! - the **loader** reads address batches from a line-oriented input and
//!   stores each completed batch in a single-slot cell (a `watch` channel:
//!   the newest batch replaces the previous one, nothing queues up);
//! - the **selector** takes the newest batch, picks one address with its
//!   [`Policy`] and hands it to the feed [`Publisher`], which only accepts it
//!   once a subscriber connection has room for it.
//!
//! A reload that lands while an address is waiting for a subscriber does not
//! touch that address; the next selection uses the new batch. End of input
//! stops the loader and with it the distributor.

pub mod batch;
pub mod select;

use tokio::io::AsyncBufRead;
use tokio::sync::watch;
use tracing::info;

use crate::error::FeedError;
use crate::feed::Publisher;

pub use batch::{Batch, BatchBuilder, load_batches};
pub use select::Policy;

pub struct Distributor {
    publisher: Publisher,
    policy: Policy,
}

impl Distributor {
    pub fn new(publisher: Publisher, policy: Policy) -> Self {
        Self { publisher, policy }
    }

    /// Run until `input` is exhausted. Returns the number of batches read.
    pub async fn run<R>(self, input: R) -> Result<usize, FeedError>
    where
        R: AsyncBufRead + Unpin,
    {
        let (slot, batches) = watch::channel(Batch::from(Vec::new()));
        let Distributor { publisher, policy } = self;

        tokio::select! {
            delivered = load_batches(input, slot) => {
                info!(batches = delivered, "Input exhausted, distributor stopping");
                publisher.close();
                Ok(delivered)
            }
            res = publish(batches, policy, &publisher) => {
                res?;
                Ok(0)
            }
        }
    }
}

/// Selector loop: one selected address per unit of subscriber demand.
pub async fn publish(
    mut batches: watch::Receiver<Batch>,
    mut policy: Policy,
    publisher: &Publisher,
) -> Result<(), FeedError> {
    let mut batch = batches.borrow_and_update().clone();
    let mut next: Option<String> = None;

    loop {
        if next.is_none() {
            next = policy.select(&batch).map(str::to_owned);
        }

        let Some(addr) = next.clone() else {
            if batches.changed().await.is_err() {
                return Ok(());
            }
            batch = batches.borrow_and_update().clone();
            info!(items = batch.len(), "Batch reloaded");
            continue;
        };

        tokio::select! {
            sent = publisher.send(addr.into()) => {
                sent?;
                next = None;
            }
            changed = batches.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                batch = batches.borrow_and_update().clone();
                info!(items = batch.len(), "Batch reloaded");
            }
        }
    }
}
