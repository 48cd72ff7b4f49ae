//! Batch loading
//!
//! Input is line oriented. Non-blank lines accumulate into the pending
//! batch; a blank line closes it. Lines are taken verbatim after trimming,
//! no address validation happens here.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Ordered backend addresses, shared read-only once complete
pub type Batch = Arc<[String]>;

/// Accumulates lines into batches
#[derive(Debug, Default)]
pub struct BatchBuilder {
    pending: Vec<String>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one input line. Returns the finished batch when the line is blank.
    pub fn push_line(&mut self, line: &str) -> Option<Batch> {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c.is_control());
        if line.is_empty() {
            Some(std::mem::take(&mut self.pending).into())
        } else {
            self.pending.push(line.to_string());
            None
        }
    }

    /// Lines seen since the last blank line
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Close the input. An unterminated, non-empty batch is still delivered.
    pub fn finish(self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.into())
        }
    }
}

/// Read batches from `input` into `slot` until end of input.
///
/// Every completed batch replaces the slot's content. Returns the number of
/// batches delivered.
pub async fn load_batches<R>(input: R, slot: watch::Sender<Batch>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut builder = BatchBuilder::new();
    let mut delivered = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(batch) = builder.push_line(&line) {
                    debug!(items = batch.len(), "Batch complete");
                    slot.send_replace(batch);
                    delivered += 1;
                }
            }
            Ok(None) => {
                info!("Address input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Address input error");
                break;
            }
        }
    }

    if let Some(batch) = builder.finish() {
        debug!(items = batch.len(), "Unterminated batch delivered at end of input");
        slot.send_replace(batch);
        delivered += 1;
    }
    delivered
}
